use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::data::{self, Dataset};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// CSV with one row per (target, entity, year).
    pub data_path: PathBuf,
    pub bind_addr: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_path: std::env::var("DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data_out.csv")),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(9999),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Everything a request handler may read. Built once at startup, never mutated.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub dataset: Dataset,
}

impl AppState {
    pub fn new(config: Config, dataset: Dataset) -> Arc<Self> {
        Arc::new(Self { config, dataset })
    }

    /// Load the dataset named by `config`. Any failure here should stop the process.
    pub fn load(config: Config) -> Result<Arc<Self>> {
        let dataset = data::load_csv(&config.data_path)
            .with_context(|| format!("loading dataset {}", config.data_path.display()))?;
        Ok(Self::new(config, dataset))
    }
}
