use mpe_engine::db::sqlite::SqliteDatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(#[from] SqliteDatabaseError),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No chains are configured. Set MPE_CHAINS to at least one currency code.")]
    NoChains,
    #[error("{0} is configured more than once in MPE_CHAINS")]
    DuplicateChain(String),
    #[error("Could not create the HTTP client for the {currency} node. {reason}")]
    RpcClient { currency: String, reason: String },
    #[error("Could not create the purchase webhook client. {0}")]
    WebhookClient(String),
}
