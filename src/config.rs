use crate::error::{RagError, Result};
use crate::prompt::PromptStyle;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub type Number = f32;

pub const DEFAULT_CHUNK_SIZE: usize = 300;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Deserialize, Default)]
pub struct SecragConfig {
    pub docs_dir: Option<String>,
    pub index_path: Option<String>,
    pub metadata_path: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub top_k: Option<usize>,
    pub embedding_model: Option<String>,
    pub chat_model: Option<String>,
    pub max_tokens: Option<u32>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub embed_concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub prompt_style: Option<String>,
    pub backup_on_rebuild: Option<bool>,
}

impl SecragConfig {
    pub fn try_from(config: &Config) -> std::result::Result<Self, ConfigError> {
        Ok(SecragConfig {
            docs_dir: config.get("docs_dir").ok(),
            index_path: config.get("index_path").ok(),
            metadata_path: config.get("metadata_path").ok(),
            chunk_size: config.get("chunk_size").ok(),
            chunk_overlap: config.get("chunk_overlap").ok(),
            top_k: config.get("top_k").ok(),
            embedding_model: config.get("embedding_model").ok(),
            chat_model: config.get("chat_model").ok(),
            max_tokens: config.get("max_tokens").ok(),
            api_base: config.get("api_base").ok(),
            api_key: config.get("api_key").ok(),
            embed_concurrency: config.get("embed_concurrency").ok(),
            max_retries: config.get("max_retries").ok(),
            request_timeout_secs: config.get("request_timeout_secs").ok(),
            prompt_style: config.get("prompt_style").ok(),
            backup_on_rebuild: config.get("backup_on_rebuild").ok(),
        })
    }
}

/// Effective settings after the config file, environment and defaults
/// have been layered.
#[derive(Debug, Clone)]
pub struct State {
    pub docs_dir: PathBuf,
    pub index_path: PathBuf,
    pub metadata_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embedding_model: String,
    pub chat_model: String,
    pub max_tokens: u32,
    pub api_base: String,
    pub api_key: Option<String>,
    pub embed_concurrency: usize,
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub prompt_style: PromptStyle,
    pub backup_on_rebuild: bool,
}

impl State {
    pub fn new() -> Result<Self> {
        let config = Config::builder()
            .add_source(ConfigFile::with_name("secrag_config").required(false))
            .add_source(Environment::with_prefix("SECRAG"))
            .build()?;

        let secrag_config = SecragConfig::try_from(&config)?;
        Self::from_config(secrag_config)
    }

    pub fn from_config(secrag_config: SecragConfig) -> Result<Self> {
        let chunk_size = secrag_config.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        let chunk_overlap = secrag_config.chunk_overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP);
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(RagError::InvalidChunking {
                chunk_size,
                overlap: chunk_overlap,
            });
        }

        let prompt_style = match secrag_config.prompt_style {
            Some(raw) => raw.parse::<PromptStyle>().map_err(|e| {
                RagError::Config(ConfigError::Message(format!("prompt_style: {}", e)))
            })?,
            None => PromptStyle::default(),
        };

        let api_key = secrag_config
            .api_key
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            docs_dir: PathBuf::from(secrag_config.docs_dir.unwrap_or_else(|| "docs".to_string())),
            index_path: PathBuf::from(
                secrag_config
                    .index_path
                    .unwrap_or_else(|| "secrag_index.bin".to_string()),
            ),
            metadata_path: PathBuf::from(
                secrag_config
                    .metadata_path
                    .unwrap_or_else(|| "secrag_metadata.bin".to_string()),
            ),
            chunk_size,
            chunk_overlap,
            top_k: secrag_config.top_k.unwrap_or(DEFAULT_TOP_K),
            embedding_model: secrag_config
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            chat_model: secrag_config
                .chat_model
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            max_tokens: secrag_config.max_tokens.unwrap_or(600),
            api_base: secrag_config
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key,
            embed_concurrency: secrag_config.embed_concurrency.unwrap_or(4).max(1),
            max_retries: secrag_config.max_retries.unwrap_or(2),
            request_timeout: Duration::from_secs(secrag_config.request_timeout_secs.unwrap_or(60)),
            prompt_style,
            backup_on_rebuild: secrag_config.backup_on_rebuild.unwrap_or(true),
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            RagError::Config(ConfigError::Message(
                "API key not set: provide SECRAG_API_KEY or OPENAI_API_KEY".to_string(),
            ))
        })
    }

    pub fn print_config(&self) {
        println!("docs_dir={}", self.docs_dir.display());
        println!("index_path={}", self.index_path.display());
        println!("metadata_path={}", self.metadata_path.display());
        println!("chunk_size={}", self.chunk_size);
        println!("chunk_overlap={}", self.chunk_overlap);
        println!("top_k={}", self.top_k);
        println!("embedding_model={}", self.embedding_model);
        println!("chat_model={}", self.chat_model);
        println!("max_tokens={}", self.max_tokens);
        println!("api_base={}", self.api_base);
        println!("api_key={}", mask_key(self.api_key.as_deref()));
        println!("embed_concurrency={}", self.embed_concurrency);
        println!("max_retries={}", self.max_retries);
        println!("request_timeout_secs={}", self.request_timeout.as_secs());
        println!("prompt_style={}", self.prompt_style);
        println!("backup_on_rebuild={}", self.backup_on_rebuild);
    }
}

fn mask_key(key: Option<&str>) -> String {
    match key {
        None => "<unset>".to_string(),
        Some(key) if key.chars().count() <= 8 => "****".to_string(),
        Some(key) => format!("{}****", key.chars().take(4).collect::<String>()),
    }
}
