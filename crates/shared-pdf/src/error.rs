use shared_crypto::CryptoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Malformed PDF document: {0}")]
    MalformedDocument(String),

    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: usize },

    #[error("Signature placeholder of {capacity} bytes is below the minimum of {minimum} bytes")]
    PlaceholderTooSmall { capacity: usize, minimum: usize },

    #[error("Signature of {required} bytes does not fit the {available}-byte placeholder")]
    SignatureTooLarge { required: usize, available: usize },

    #[error("Invalid byte range: {0}")]
    InvalidByteRange(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<lopdf::Error> for PdfError {
    fn from(err: lopdf::Error) -> Self {
        PdfError::MalformedDocument(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;
