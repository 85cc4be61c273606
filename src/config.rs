//! Run parameters: defaults, TOML file loading, and validation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::protocol::Protocol;

pub const DEFAULT_PHILOSOPHERS: usize = 10;
pub const DEFAULT_BITES: u32 = 10;
pub const DEFAULT_BITE_MILLIS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("a dining table needs at least two philosophers, got {0}")]
    TooFewPhilosophers(usize),

    #[error("bite duration must be greater than zero")]
    ZeroBiteDuration,

    #[error("unknown protocol '{0}', expected one of: backoff, ordered, both")]
    UnknownProtocol(String),
}

/// Which protocols one invocation exercises. `Both` runs backoff first and
/// ordered second on the same table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolChoice {
    Backoff,
    Ordered,
    Both,
}

impl ProtocolChoice {
    pub fn runs(self) -> Vec<Protocol> {
        match self {
            ProtocolChoice::Backoff => vec![Protocol::Backoff],
            ProtocolChoice::Ordered => vec![Protocol::Ordered],
            ProtocolChoice::Both => vec![Protocol::Backoff, Protocol::Ordered],
        }
    }
}

impl FromStr for ProtocolChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backoff" => Ok(ProtocolChoice::Backoff),
            "ordered" => Ok(ProtocolChoice::Ordered),
            "both" => Ok(ProtocolChoice::Both),
            other => Err(ConfigError::UnknownProtocol(other.to_string())),
        }
    }
}

/// Parameters of one bite loop, handed to every worker of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub bites: u32,
    pub bite_duration: Duration,
    pub protocol: Protocol,
}

/// The user-facing knobs: seat count, bites per philosopher, bite duration,
/// and protocol selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub philosophers: usize,
    pub bites: u32,
    pub bite_millis: u64,
    pub protocol: ProtocolChoice,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            philosophers: DEFAULT_PHILOSOPHERS,
            bites: DEFAULT_BITES,
            bite_millis: DEFAULT_BITE_MILLIS,
            protocol: ProtocolChoice::Both,
        }
    }
}

impl SimConfig {
    /// Loads and validates a TOML config file. Unknown keys are rejected so
    /// a typo does not silently fall back to a default.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SimConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.philosophers < 2 {
            return Err(ConfigError::TooFewPhilosophers(self.philosophers));
        }
        if self.bite_millis == 0 {
            return Err(ConfigError::ZeroBiteDuration);
        }
        Ok(())
    }

    pub fn bite_duration(&self) -> Duration {
        Duration::from_millis(self.bite_millis)
    }

    /// The per-run options for one of this config's selected protocols.
    pub fn options(&self, protocol: Protocol) -> RunOptions {
        RunOptions {
            bites: self.bites,
            bite_duration: self.bite_duration(),
            protocol,
        }
    }
}
