pub type OnionResult<T> = Result<T, OnionError>;

#[derive(thiserror::Error, Debug)]
pub enum OnionError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("host error: {0}")]
    Host(String),

    #[error("bake error: {0}")]
    Bake(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OnionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    pub fn bake(msg: impl Into<String>) -> Self {
        Self::Bake(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for OnionError {
    fn from(e: serde_json::Error) -> Self {
        Self::serde(e.to_string())
    }
}
