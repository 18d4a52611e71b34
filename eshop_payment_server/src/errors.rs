use eshop_payment_engine::{ReconciliationError, SqliteDatabaseError};
use thiserror::Error;
use ylt_client::YltApiError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize the service. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the service. {0}")]
    BackendError(String),
    #[error("Invalid service configuration. {0}")]
    ConfigurationError(String),
    #[error("Could not set up the gateway client. {0}")]
    GatewayClientError(#[from] YltApiError),
    #[error("An I/O error happened in the service. {0}")]
    IOError(#[from] std::io::Error),
}

impl From<SqliteDatabaseError> for ServerError {
    fn from(e: SqliteDatabaseError) -> Self {
        Self::InitializeError(format!("Database error: {e}"))
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        Self::BackendError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AlarmError {
    #[error("The alarm webhook could not be reached. {0}")]
    Transport(String),
    #[error("The alarm webhook rejected the message with status {0}")]
    Rejected(u16),
    #[error("The alarm could not be delivered after {0} attempts")]
    GaveUp(usize),
}
