//! Supported upstream platform families.

use serde::{Deserialize, Serialize};

/// Upstream platform family with its own quota semantics.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Platform {
    /// X (Twitter) posting API: 15-minute windows
    Twitter,
    /// Meta Graph API (Facebook, Instagram): hourly windows
    Meta,
}
