use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid certificate subject: {0}")]
    InvalidSubject(String),

    #[error("Invalid password for PKCS#12 container")]
    InvalidPassword,

    #[error("Malformed PKCS#12 container: {0}")]
    MalformedContainer(String),

    #[error("DER encoding error: {0}")]
    Encoding(#[from] der::Error),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Signature verification failed: {0}")]
    Verification(String),
}

impl CryptoError {
    /// Whether the error means the caller's stored credentials cannot be opened.
    pub fn is_credentials_error(&self) -> bool {
        matches!(
            self,
            CryptoError::InvalidPassword | CryptoError::MalformedContainer(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;
