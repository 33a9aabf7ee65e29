// rams-document-service/src/config.rs

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::pipeline::{PipelineConfig, ProgressConfig, RetryPolicy};
use crate::preview::Capabilities;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub templates: TemplateConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    pub generation: GenerationConfig,
    pub preview: PreviewConfig,
    pub output: OutputConfig,
    pub input: InputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub attempt_timeout_secs: u64,
    pub progress_tick_ms: u64,
    pub progress_ceiling: u8,
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    pub prefer_native: bool,
    pub embedded_max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: String,
    /// Also submit the PDF to the system spooler
    pub print: bool,
    #[serde(default)]
    pub printer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub session: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            // Start with default values
            .set_default("service.name", "rams-document-service")?
            .set_default("service.log_level", "info")?
            .set_default("templates.path", "./templates")?
            .set_default("generation.max_retries", 3)?
            .set_default("generation.base_backoff_ms", 1000)?
            .set_default("generation.attempt_timeout_secs", 120)?
            .set_default("generation.progress_tick_ms", 200)?
            .set_default("generation.progress_ceiling", 90)?
            .set_default("generation.cache_capacity", 8)?
            .set_default("preview.prefer_native", false)?
            .set_default("preview.embedded_max_bytes", 20 * 1024 * 1024)?
            .set_default("output.dir", "./output")?
            .set_default("output.print", false)?
            .set_default("input.session", "./demos/session.json")?
            // Load from config file if it exists
            .add_source(File::with_name("config").required(false))
            // Override with environment variables (e.g., RAMS__GENERATION__MAX_RETRIES)
            .add_source(Environment::with_prefix("RAMS").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            retry: RetryPolicy {
                max_retries: self.generation.max_retries,
                base_delay: Duration::from_millis(self.generation.base_backoff_ms),
            },
            attempt_timeout: Duration::from_secs(self.generation.attempt_timeout_secs),
            progress: ProgressConfig {
                tick: Duration::from_millis(self.generation.progress_tick_ms),
                ceiling: self.generation.progress_ceiling.min(99),
            },
            cache_capacity: self.generation.cache_capacity,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            embedded_viewer: !self.preview.prefer_native,
            embedded_max_bytes: self.preview.embedded_max_bytes,
        }
    }
}
