//! Data models for remote track metadata

use serde::{Deserialize, Serialize};

/// One rendition of a remote track, as reported by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    /// Source-assigned rendition tag, where the source provides one
    #[serde(default)]
    pub tag: Option<u32>,
    pub codec: String,
    pub container: String,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    /// Fixed bitrate in bits/s; absent for variable-bitrate renditions
    #[serde(default)]
    pub bitrate: Option<u64>,
    /// Average bitrate in bits/s, where the source reports one
    #[serde(default)]
    pub average_bitrate: Option<u64>,
    pub url: String,
}

/// Resolved metadata for a remote track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTrackInfo {
    pub identifier: String,
    #[serde(default)]
    pub title: Option<String>,
    /// True for unbounded/real-time content; live tracks are never cached
    #[serde(default)]
    pub is_live: bool,
    pub encodings: Vec<Encoding>,
}
