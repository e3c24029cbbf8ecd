//! Document signing core logic
//!
//! Ties the credential, PDF and signature crates into the operations a
//! service exposes: provisioning a user's PKCS#12 container, signing a
//! batch of uploaded documents with visual marks, and verifying the
//! signatures of a signed document.

pub mod config;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod provision;
pub mod types;

pub use config::SignerConfig;
pub use error::{Result, SignError};
pub use naming::output_name;
pub use pipeline::{sign_documents, SigningPipeline};
pub use provision::{describe_container, issue_and_package};
pub use types::{DocumentInput, DocumentOutcome, Placement, SignatureRequest, SignedDocument};

pub use shared_crypto::{CertificateInfo, SubjectAttributes};
pub use shared_pdf::verifier::{verify as verify_document, SignatureReport};
pub use shared_pdf::SigningContext;
