use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory: `NOSH_DATA_DIR` wins (scripting, tests),
    /// otherwise the platform data dir.
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os("NOSH_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("", "", "nosh")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        Self::with_data_dir(data_dir)
    }

    pub fn with_data_dir(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("nosh.db");

        Ok(Config { db_path, data_dir })
    }
}
