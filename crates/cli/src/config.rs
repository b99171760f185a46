use anyhow::{Context as AnyhowContext, Result};
use clap::ValueEnum;
use ragline_chain::{HistoryPolicy, SamplingParams};
use ragline_protocol::{DEFAULT_REGION, DEFAULT_STUB_DIMENSION};
use ragline_text_chunker::ChunkerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelMode {
    /// Call hosted models over HTTPS
    #[default]
    Remote,
    /// Answer locally with deterministic stand-ins (no network)
    Stub,
}

impl ModelMode {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "stub" => Ok(Self::Stub),
            other => anyhow::bail!("RAGLINE_MODEL_MODE must be 'remote' or 'stub', got '{other}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaglineConfig {
    pub mode: ModelMode,
    pub endpoint: Option<String>,
    pub region: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    pub stub_dimension: usize,
    pub models: ModelsConfig,
    pub sampling: SamplingParams,
    pub retrieval: RetrievalConfig,
    pub chunking: ChunkerConfig,
    pub chat: ChatConfig,
    pub storage: StorageConfig,
}

impl Default for RaglineConfig {
    fn default() -> Self {
        Self {
            mode: ModelMode::Remote,
            endpoint: None,
            region: DEFAULT_REGION.to_string(),
            api_token: None,
            timeout_secs: 60,
            stub_dimension: DEFAULT_STUB_DIMENSION,
            models: ModelsConfig::default(),
            sampling: SamplingParams::default(),
            retrieval: RetrievalConfig::default(),
            chunking: ChunkerConfig::default(),
            chat: ChatConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub text_model: String,
    pub embedding_model: String,
    pub image_embedding_model: String,
    pub image_model: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            text_model: "amazon.titan-text-express-v1".to_string(),
            embedding_model: "amazon.titan-embed-text-v1".to_string(),
            image_embedding_model: "amazon.titan-embed-image-v1".to_string(),
            image_model: "amazon.titan-image-generator-v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub k: usize,
    pub concurrency: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 2,
            concurrency: ragline_vector_store::DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub max_turns: Option<usize>,
    pub max_chars: Option<usize>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        let policy = HistoryPolicy::default();
        Self {
            max_turns: policy.max_turns,
            max_chars: policy.max_chars,
        }
    }
}

impl ChatConfig {
    pub const fn policy(&self) -> HistoryPolicy {
        HistoryPolicy {
            max_turns: self.max_turns,
            max_chars: self.max_chars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
    pub root: PathBuf,
    pub url_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "ragline-images".to_string(),
            root: dirs::data_dir()
                .map(|dir| dir.join("ragline").join("objects"))
                .unwrap_or_else(|| PathBuf::from(".ragline/objects")),
            url_ttl_secs: 3600,
        }
    }
}

/// `$XDG_CONFIG_HOME/ragline/config.toml` (platform equivalent elsewhere)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ragline").join("config.toml"))
}

impl RaglineConfig {
    /// Load configuration: file (explicit path, else default location if it
    /// exists), then environment overrides. CLI flags are applied by the caller.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_with_env(explicit, &env)
    }

    pub fn load_with_env(explicit: Option<&Path>, env: &HashMap<String, String>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(mode) = get("RAGLINE_MODEL_MODE") {
            self.mode = ModelMode::parse(mode)?;
        }
        if let Some(endpoint) = get("RAGLINE_ENDPOINT") {
            self.endpoint = Some(endpoint.to_string());
        }
        if let Some(region) = get("RAGLINE_REGION") {
            self.region = region.to_string();
        }
        if let Some(token) = get("RAGLINE_API_TOKEN").or_else(|| get("AWS_BEARER_TOKEN_BEDROCK")) {
            self.api_token = Some(token.to_string());
        }
        if let Some(secs) = get("RAGLINE_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .parse()
                .with_context(|| format!("RAGLINE_TIMEOUT_SECS must be an integer, got '{secs}'"))?;
        }
        if let Some(bucket) = get("RAGLINE_BUCKET") {
            self.storage.bucket = bucket.to_string();
        }
        if let Some(root) = get("RAGLINE_OBJECT_ROOT") {
            self.storage.root = PathBuf::from(root);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be positive");
        }
        if self.retrieval.k == 0 {
            anyhow::bail!("retrieval.k must be at least 1");
        }
        if self.stub_dimension == 0 {
            anyhow::bail!("stub_dimension must be positive");
        }
        self.chunking
            .validate()
            .context("Invalid [chunking] section")?;
        Ok(())
    }

    /// Endpoint to call in remote mode
    pub fn resolved_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", self.region))
    }
}

/// Separator presets selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChunkPreset {
    /// `". \n"`, kept at the end of each chunk
    Default,
    Sentences,
    Paragraphs,
}

impl ChunkPreset {
    pub fn config(self) -> ChunkerConfig {
        match self {
            Self::Default => ChunkerConfig::default(),
            Self::Sentences => ChunkerConfig::sentences(),
            Self::Paragraphs => ChunkerConfig::paragraphs(),
        }
    }
}
