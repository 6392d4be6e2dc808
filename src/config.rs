use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::embedding::HnswParams;
use crate::query::images::DEFAULT_TOP_K;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EdutrackConfig {
    pub database: Option<String>,
    #[serde(default)]
    pub search: SearchConfig,
}

/// `[search]` table: HNSW parameters and similarity defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub top_k: usize,
    pub min_similarity: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let params = HnswParams::default();
        Self {
            m: params.m,
            ef_construction: params.ef_construction,
            ef_search: params.ef_search,
            top_k: DEFAULT_TOP_K,
            min_similarity: 0.0,
        }
    }
}

impl SearchConfig {
    pub fn hnsw_params(&self) -> HnswParams {
        HnswParams {
            m: self.m,
            ef_construction: self.ef_construction,
            ef_search: self.ef_search,
            ..HnswParams::default()
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("edutrack.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".edutrack").join("edutrack.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<EdutrackConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: EdutrackConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &EdutrackConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
