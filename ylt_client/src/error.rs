use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum YltApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Login failed: {0}")]
    AuthError(String),
    #[error("Could not create remote order: {0}")]
    OrderError(String),
    #[error("Could not query remote order: {0}")]
    QueryError(String),
}
