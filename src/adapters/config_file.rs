//! JSON file config adapter.
//!
//! Implements [`ConfigPort`] over a single JSON document on disk.  A
//! missing file is not an error: the defaults are used and a warning is
//! logged, matching a first run with no provisioning.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::StreamConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<StreamConfig, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "JsonConfigFile: {} not found, using defaults",
                    self.path.display()
                );
                return Ok(StreamConfig::default());
            }
            Err(e) => {
                warn!("JsonConfigFile: reading {} failed: {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };
        let config = StreamConfig::from_json(&text)?;
        info!("JsonConfigFile: loaded {}", self.path.display());
        Ok(config)
    }
}
