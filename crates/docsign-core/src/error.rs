use shared_crypto::CryptoError;
use shared_pdf::PdfError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignError {
    /// The PKCS#12 container could not be opened with the given password
    #[error("Cannot access signing credentials: {0}")]
    Credentials(#[source] CryptoError),

    #[error("Document {index} failed: {source}")]
    Document {
        index: usize,
        #[source]
        source: PdfError,
    },

    #[error("Invalid signature request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Certificate issuance failed: {0}")]
    Issuance(#[from] CryptoError),
}

impl SignError {
    /// Index of the document the error belongs to, if any
    pub fn document_index(&self) -> Option<usize> {
        match self {
            SignError::Document { index, .. } => Some(*index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SignError>;
