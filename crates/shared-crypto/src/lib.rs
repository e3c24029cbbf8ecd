//! Shared cryptography utilities
//!
//! This crate provides the cryptographic primitives behind document signing:
//! RSA identities, self-signed certificates, PKCS#12 credential containers
//! and detached CMS signatures.

pub mod cert;
pub mod cms;
pub mod error;
pub mod keys;
pub mod pkcs12;

pub use cert::{CertificateInfo, SubjectAttributes};
pub use error::{CryptoError, Result};
pub use keys::{RsaIdentity, SigningIdentity};
pub use pkcs12::{Pkcs12Builder, Pkcs12Credentials};
pub use x509_cert::Certificate;
