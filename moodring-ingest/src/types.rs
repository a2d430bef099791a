use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Mock,
    Device,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Mock => "mock",
            SourceKind::Device => "device",
        })
    }
}

/// What a source hands to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalEvent {
    /// A reading already scaled and clamped to 0..=100.
    Reading(f64),
    /// The source stopped (device closed, EOF, read error).
    Disconnected,
}
