pub type Result<T, E = SignerError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("No key loaded: {0}")]
    KeyNotLoaded(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    #[error("Failed to encode key material: {0}")]
    KeyEncoding(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SignerError {
    pub(crate) fn key_not_loaded(reason: impl Into<String>) -> Self {
        Self::KeyNotLoaded(reason.into())
    }

    pub(crate) fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken(reason.into())
    }

    /// Whether the caller can fix this error by changing its request.
    ///
    /// Transports map caller errors to 4xx responses and everything else
    /// to 5xx.
    pub fn is_caller_error(&self) -> bool {
        match self {
            SignerError::KeyNotLoaded(_)
            | SignerError::InvalidInput(_)
            | SignerError::InvalidSignature
            | SignerError::InvalidToken(_) => true,
            SignerError::SigningFailed(_) | SignerError::KeyEncoding(_) | SignerError::Io(_) => {
                false
            }
        }
    }
}
