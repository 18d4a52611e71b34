use thiserror::Error;

use crate::traits::GatewayError;

#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("No gateway accounts have been configured")]
    NoAgentsConfigured,
    #[error("Unknown gateway account: {0}")]
    UnknownAgent(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
