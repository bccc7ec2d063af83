//! Optional TOML defaults for the CLI.
//!
//! ```toml
//! hash = "blake3"
//! cache_dir = "cache"
//! cache_heights = [0, 4, 8]
//! ```
//!
//! Command-line flags win over file values; missing keys fall back to the
//! built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mstream_merkle::HashKind;
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Parent hash.
    pub hash: HashKind,
    /// Directory receiving `layer-<h>.bin` node caches.
    pub cache_dir: Option<PathBuf>,
    /// Heights to cache; empty means every height the tree reaches.
    pub cache_heights: Vec<u32>,
}

impl Config {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let src = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&src).with_context(|| format!("parse config {}", path.display()))
    }
}
