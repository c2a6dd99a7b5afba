use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid service config: {0}")]
    Config(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    pub fn storage(err: impl std::fmt::Display) -> Self { Self::Storage(err.to_string()) }

    /// HTTP-style status for transports mapping service errors onto responses
    pub fn code(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::InvalidQuery(_) | ServiceError::InvalidData(_) => 400,
            ServiceError::MethodNotAllowed(_) => 405,
            ServiceError::Storage(_) | ServiceError::Config(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool { matches!(self, ServiceError::NotFound(_)) }
}

impl From<models::errors::ModelError> for ServiceError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Validation(msg) => ServiceError::InvalidData(msg),
            models::errors::ModelError::Db(msg) => ServiceError::Storage(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
