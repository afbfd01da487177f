//! Service configuration loaded from an optional `config` file and
//! `STATEMENTS__`-prefixed environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Environment variable prefix, e.g. `STATEMENTS__SERVER__PORT=5001`
const ENV_PREFIX: &str = "STATEMENTS";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_storage")]
    pub storage: StorageConfig,

    #[serde(default = "default_limits")]
    pub limits: LimitsConfig,

    #[serde(default = "default_extraction")]
    pub extraction: ExtractionConfig,

    #[serde(default = "default_retention")]
    pub retention: RetentionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Locale used for error messages when `Accept-Language` names nothing we have.
    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// Optional directory with a pre-built frontend, served for unmatched paths.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("statements.db")
    }

    pub fn batches_dir(&self) -> PathBuf {
        self.data_dir.join("batches")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_dir.join(crate::export::ARTIFACTS_PREFIX)
    }
}

/// Upload and processing limits
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_document_size")]
    pub max_document_size_bytes: u64,

    #[serde(default = "default_max_files_per_batch")]
    pub max_files_per_batch: usize,

    #[serde(default = "default_max_parallel_extractions")]
    pub max_parallel_extractions: usize,

    #[serde(default = "default_ingestion_timeout_secs")]
    pub ingestion_timeout_secs: u64,

    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
}

impl LimitsConfig {
    /// Request body limit for `/upload`: every file at max size plus multipart overhead.
    pub fn max_upload_body_bytes(&self) -> usize {
        let files = self.max_files_per_batch.max(1) as u64;
        let total = self
            .max_document_size_bytes
            .saturating_mul(files)
            .saturating_add(1024 * 1024);
        usize::try_from(total).unwrap_or(usize::MAX)
    }

    pub fn ingestion_timeout(&self) -> Duration {
        Duration::from_secs(self.ingestion_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

/// Statement extraction tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Year applied to `DD MON` dates when the statement itself never states one.
    /// Falls back to the current year when unset.
    #[serde(default)]
    pub default_year: Option<i32>,

    /// Description keywords that mark a movement as a deposit when the running
    /// balance cannot decide.
    #[serde(default = "default_deposit_keywords")]
    pub deposit_keywords: Vec<String>,
}

/// Batch retention
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// How long a batch (documents, records and artifacts) is kept
    #[serde(default = "default_batch_ttl_secs")]
    pub batch_ttl_secs: u64,

    /// Run cleanup every N seconds
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl RetentionConfig {
    pub fn batch_ttl(&self) -> Duration {
        Duration::from_secs(self.batch_ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl AppConfig {
    /// Load configuration from `config.{toml,yaml,json}` (optional) and env vars
    pub fn load() -> ServiceResult<Self> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("config").required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .prefix_separator("__")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> ServiceResult<Self> {
        builder
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            limits: default_limits(),
            extraction: default_extraction(),
            retention: default_retention(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        default_limits()
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        default_extraction()
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        default_retention()
    }
}

// ==================== Default Value Functions ====================

fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
        default_locale: default_locale(),
        static_dir: None,
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_locale() -> String {
    "es".to_string()
}

fn default_storage() -> StorageConfig {
    StorageConfig {
        data_dir: default_data_dir(),
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_limits() -> LimitsConfig {
    LimitsConfig {
        max_document_size_bytes: default_max_document_size(),
        max_files_per_batch: default_max_files_per_batch(),
        max_parallel_extractions: default_max_parallel_extractions(),
        ingestion_timeout_secs: default_ingestion_timeout_secs(),
        generation_timeout_secs: default_generation_timeout_secs(),
    }
}

fn default_max_document_size() -> u64 {
    25 * 1024 * 1024
}

fn default_max_files_per_batch() -> usize {
    50
}

fn default_max_parallel_extractions() -> usize {
    4
}

fn default_ingestion_timeout_secs() -> u64 {
    120
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_extraction() -> ExtractionConfig {
    ExtractionConfig {
        default_year: None,
        deposit_keywords: default_deposit_keywords(),
    }
}

fn default_deposit_keywords() -> Vec<String> {
    ["abono", "depósito", "deposito", "traspaso", "recibidos", "recibido"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_retention() -> RetentionConfig {
    RetentionConfig {
        batch_ttl_secs: default_batch_ttl_secs(),
        cleanup_interval_secs: default_cleanup_interval_secs(),
    }
}

fn default_batch_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_cleanup_interval_secs() -> u64 {
    60 * 60
}
