//! Error type for kart setup and configuration.
//!
//! The per-step solver never fails: degenerate geometry falls back to defaults. Only setup
//! paths (loading config, placing checkpoints, looking up karts) return `KartError`.

use std::{fmt, path::PathBuf};

use crate::{collision::KartId, race::CheckpointId};

#[derive(Debug)]
pub enum KartError {
    /// A config file could not be read or written.
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A config file is not valid TOML for [`KartConfig`](crate::config::KartConfig).
    ConfigParse { source: toml::de::Error },
    /// A config could not be rendered to TOML.
    ConfigSerialize { source: toml::ser::Error },
    /// A config value is out of range.
    InvalidConfiguration { reason: String },
    /// No ground was found below a checkpoint, so it has no reset pose.
    CheckpointWithoutGround { checkpoint: CheckpointId },
    /// The kart id is not part of the simulation.
    UnknownKart { kart: KartId },
}

impl fmt::Display for KartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigIo { path, source } => {
                write!(f, "config I/O error at {}: {source}", path.display())
            }
            Self::ConfigParse { source } => write!(f, "invalid config: {source}"),
            Self::ConfigSerialize { source } => write!(f, "config serialization failed: {source}"),
            Self::InvalidConfiguration { reason } => write!(f, "invalid configuration: {reason}"),
            Self::CheckpointWithoutGround { checkpoint } => write!(
                f,
                "checkpoint {} has no ground below it; move it so the track is under it",
                checkpoint.0
            ),
            Self::UnknownKart { kart } => write!(f, "unknown kart {}", kart.0),
        }
    }
}

impl std::error::Error for KartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigIo { source, .. } => Some(source),
            Self::ConfigParse { source } => Some(source),
            Self::ConfigSerialize { source } => Some(source),
            _ => None,
        }
    }
}

pub type KartResult<T> = Result<T, KartError>;
