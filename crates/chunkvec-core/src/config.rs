//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys come from env with a double underscore, e.g.
//! `APP_CHUNKING__CHUNK_SIZE=500`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

/// `[chunking]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Option<Vec<String>>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, separators: None }
    }
}

impl ChunkingConfig {
    /// Replaces the sizes given on the command line. The pair is only checked
    /// once a splitter is built from it.
    #[must_use]
    pub fn with_overrides(mut self, chunk_size: Option<usize>, chunk_overlap: Option<usize>) -> Self {
        if let Some(size) = chunk_size {
            self.chunk_size = size;
        }
        if let Some(overlap) = chunk_overlap {
            self.chunk_overlap = overlap;
        }
        self
    }
}

/// `[embedding]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Output size of the hashing embedder; a model reports its own.
    pub dim: usize,
    /// Local sentence-transformer directory. Unset selects the hashing embedder.
    pub model_dir: Option<String>,
    /// Token limit per input for the model backend.
    pub max_length: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self { dim: 384, model_dir: None, max_length: 256 }
    }
}

/// `[data]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub raw_txt_dir: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingConfig,
    pub embedding: EmbedConfig,
    pub data: DataConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            other => tracing::warn!(env = other, "unknown RUST_ENV, skipping env-specific config"),
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        tracing::debug!(env = %env_name, "configuration loaded");
        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// All typed sections; absent sections and keys fall back to defaults.
    /// Chunk sizes are validated by the splitter constructors, after any
    /// command-line overrides.
    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::config(format!("Failed to read settings: {e}")))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
