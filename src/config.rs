//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `CLEARANCE_WORK_DIR` and `CLEARANCE_LOG_LEVEL` env overrides.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// Upload ingestion configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks, in characters. Must be < chunk_size.
    pub chunk_overlap: usize,
}

/// Secure-retrieval configuration.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Results requested by the primary (filtered) query.
    pub top_k: usize,
    /// Results requested by the unrestricted probe. Must be ≥ 1.
    pub probe_k: usize,
}

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Request incremental SSE output instead of one completed body.
    pub stream: bool,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (e.g. `"dummy"`, `"openai"`).
    /// Maps to `default` in `[llm]` TOML — named `default` there to signal
    /// that other provider sections can coexist without being loaded.
    pub provider: String,
    /// Config for the OpenAI / OpenAI-compatible provider (`[llm.openai]`).
    pub openai: OpenAiConfig,
}

/// Fully-resolved portal configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub portal_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalSettings,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY` env var — `None` for keyless local models.
    /// Never sourced from TOML.
    pub llm_api_key: Option<String>,
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    portal: RawPortal,
    #[serde(default)]
    ingest: RawIngest,
    #[serde(default)]
    retrieval: RawRetrieval,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawPortal {
    name: String,
    work_dir: String,
    log_level: String,
}

#[derive(Deserialize)]
struct RawIngest {
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    chunk_overlap: usize,
}

impl Default for RawIngest {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize { 3000 }
fn default_chunk_overlap() -> usize { 500 }

#[derive(Deserialize)]
struct RawRetrieval {
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default = "default_probe_k")]
    probe_k: usize,
}

impl Default for RawRetrieval {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            probe_k: default_probe_k(),
        }
    }
}

fn default_top_k() -> usize { 3 }
fn default_probe_k() -> usize { 1 }

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_true")]
    stream: bool,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_openai_timeout_seconds(),
            stream: true,
        }
    }
}

fn default_llm_provider() -> String { "dummy".to_string() }
fn default_openai_api_base_url() -> String { "http://localhost:11434/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "llama3.2".to_string() }
fn default_openai_temperature() -> f32 { 0.2 }
fn default_openai_timeout_seconds() -> u64 { 60 }

fn default_true() -> bool {
    true
}

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let work_dir_override = env::var("CLEARANCE_WORK_DIR").ok();
    let log_level_override = env::var("CLEARANCE_LOG_LEVEL").ok();
    load_from(
        Path::new("config/default.toml"),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if parsed.ingest.chunk_size == 0 {
        return Err(AppError::Config("ingest.chunk_size must be greater than zero".into()));
    }
    if parsed.ingest.chunk_overlap >= parsed.ingest.chunk_size {
        return Err(AppError::Config(format!(
            "ingest.chunk_overlap ({}) must be smaller than ingest.chunk_size ({})",
            parsed.ingest.chunk_overlap, parsed.ingest.chunk_size
        )));
    }
    if parsed.retrieval.top_k == 0 || parsed.retrieval.probe_k == 0 {
        return Err(AppError::Config("retrieval.top_k and retrieval.probe_k must be ≥ 1".into()));
    }

    let p = parsed.portal;
    let work_dir_str = work_dir_override.unwrap_or(&p.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&p.log_level).to_string();

    Ok(Config {
        portal_name: p.name,
        work_dir,
        log_level,
        ingest: IngestConfig {
            chunk_size: parsed.ingest.chunk_size,
            chunk_overlap: parsed.ingest.chunk_overlap,
        },
        retrieval: RetrievalSettings {
            top_k: parsed.retrieval.top_k,
            probe_k: parsed.retrieval.probe_k,
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
                stream: parsed.llm.openai.stream,
            },
        },
        llm_api_key: env::var("LLM_API_KEY").ok(),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests — dummy LLM, no API keys, no external calls.
impl Config {
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            portal_name: "test-portal".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            ingest: IngestConfig {
                chunk_size: 3000,
                chunk_overlap: 500,
            },
            retrieval: RetrievalSettings { top_k: 3, probe_k: 1 },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                    stream: false,
                },
            },
            llm_api_key: None,
        }
    }
}
