use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunk::ChunkParams;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    /// Optional SQLite backend location; absent means the caller wires
    /// its own backend (typically the in-memory one).
    #[serde(default)]
    pub db: Option<DbConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl ChunkingConfig {
    /// Validated chunking parameters.
    pub fn params(&self) -> crate::error::Result<ChunkParams> {
        ChunkParams::new(self.chunk_size, self.overlap)
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_n_results")]
    pub n_results: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            n_results: default_n_results(),
        }
    }
}

fn default_n_results() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            model: None,
            dims: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "hash".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct TasksConfig {
    /// Seconds a finished task's status stays pollable before eviction.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.overlap ({}) must be strictly less than chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }

    // Validate query
    if config.query.n_results == 0 {
        anyhow::bail!("query.n_results must be >= 1");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "hash" => {
            if config.embedding.dims == Some(0) {
                anyhow::bail!("embedding.dims must be > 0");
            }
        }
        "openai" => {
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!("embedding.dims must be > 0 when provider is 'openai'");
            }
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified when provider is 'openai'");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hash or openai.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("indexer.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_defaults() {
        let (_tmp, path) = write_config("");
        let config = load_config(&path).unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.query.n_results, 5);
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.tasks.ttl_secs, 3600);
        assert!(config.db.is_none());
        assert!(config.chunking.params().is_ok());
    }

    #[test]
    fn test_rejects_overlap_not_below_chunk_size() {
        let (_tmp, path) = write_config("[chunking]\nchunk_size = 100\noverlap = 100\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_rejects_zero_n_results() {
        let (_tmp, path) = write_config("[query]\nn_results = 0\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_openai_requires_model_and_dims() {
        let (_tmp, path) = write_config("[embedding]\nprovider = \"openai\"\n");
        assert!(load_config(&path).is_err());

        let (_tmp, path) = write_config(
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536\n",
        );
        assert!(load_config(&path).is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let (_tmp, path) = write_config("[embedding]\nprovider = \"quantum\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_db_path_parsed() {
        let (_tmp, path) = write_config("[db]\npath = \"/tmp/idx.sqlite\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.db.unwrap().path, PathBuf::from("/tmp/idx.sqlite"));
    }
}
