use definitions::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
