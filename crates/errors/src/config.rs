/// Fatal configuration errors, surfaced before any task is spawned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration field: {0}")]
    Missing(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
