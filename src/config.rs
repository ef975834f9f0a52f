use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

const DEFAULT_OPENAI_API_VERSION: &str = "2024-02-01";
const DEFAULT_SEARCH_API_VERSION: &str = "2024-07-01";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_SEMANTIC_CONFIG: &str = "azureml-default";

/// Runtime configuration shared by the ingestion and answer pipelines.
///
/// Built once at process start and handed to component constructors; nothing in the crate
/// reads the environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the OpenAI-compatible deployment host.
    pub openai_endpoint: String,
    /// API key sent with every model request.
    pub openai_api_key: String,
    /// `api-version` query parameter for model requests.
    pub openai_api_version: String,
    /// Embedding deployment name.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Chat deployment used for grounded completions.
    pub chat_model: String,
    /// Sampling temperature for chat completions.
    pub chat_temperature: f32,
    /// Base URL of the search service holding the index.
    pub search_endpoint: String,
    /// Admin key for the search service.
    pub search_api_key: String,
    /// `api-version` query parameter for search requests.
    pub search_api_version: String,
    /// Name of the single target index.
    pub index_name: String,
    /// Semantic ranking configuration used by semantic queries.
    pub semantic_config: String,
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
    /// Texts sent per embedding request.
    pub embedding_batch_size: usize,
    /// Documents sent per index upload request.
    pub upload_batch_size: usize,
    /// Chunks retrieved to ground an interactive answer.
    pub answer_top_k: usize,
    /// Directory receiving run statistics, the answer log and comparison reports.
    pub results_dir: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let config = Self {
            openai_endpoint: vars.required("OPENAI_ENDPOINT")?,
            openai_api_key: vars.required("OPENAI_API_KEY")?,
            openai_api_version: vars
                .optional("OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_VERSION.to_string()),
            embedding_model: vars
                .optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: vars.parsed("EMBEDDING_DIMENSION", 1536)?,
            chat_model: vars.required("CHAT_MODEL")?,
            chat_temperature: vars.parsed("CHAT_TEMPERATURE", 0.7)?,
            search_endpoint: vars.required("SEARCH_ENDPOINT")?,
            search_api_key: vars.required("SEARCH_KEY")?,
            search_api_version: vars
                .optional("SEARCH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_SEARCH_API_VERSION.to_string()),
            index_name: vars.required("INDEX_NAME")?,
            semantic_config: vars
                .optional("SEMANTIC_CONFIG")
                .unwrap_or_else(|| DEFAULT_SEMANTIC_CONFIG.to_string()),
            chunk_size: vars.parsed("TEXT_SPLITTER_CHUNK_SIZE", 1000)?,
            chunk_overlap: vars.parsed("TEXT_SPLITTER_CHUNK_OVERLAP", 200)?,
            embedding_batch_size: vars.parsed("EMBEDDING_BATCH_SIZE", 50)?,
            upload_batch_size: vars.parsed("UPLOAD_BATCH_SIZE", 100)?,
            answer_top_k: vars.parsed("ANSWER_TOP_K", 3)?,
            results_dir: vars
                .optional("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("results")),
            server_port: vars
                .optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("EMBEDDING_DIMENSION", self.embedding_dimension),
            ("TEXT_SPLITTER_CHUNK_SIZE", self.chunk_size),
            ("EMBEDDING_BATCH_SIZE", self.embedding_batch_size),
            ("UPLOAD_BATCH_SIZE", self.upload_batch_size),
            ("ANSWER_TOP_K", self.answer_top_k),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::InvalidValue((*key).to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_OVERLAP".to_string(),
            ));
        }
        Ok(())
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.trim().is_empty())
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string())),
            None => Ok(default),
        }
    }
}

/// Read `.env` (when present) and load the configuration from the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        openai_endpoint = %config.openai_endpoint,
        search_endpoint = %config.search_endpoint,
        index = %config.index_name,
        embedding_model = %config.embedding_model,
        chat_model = %config.chat_model,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        "Loaded configuration"
    );
    Ok(config)
}
