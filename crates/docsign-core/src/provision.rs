//! Per-user credential provisioning
//!
//! Key generation is CPU-bound (tens to hundreds of milliseconds for a
//! 2048-bit modulus); callers on an async runtime should run these
//! functions on a blocking thread.

use crate::error::{Result, SignError};
use shared_crypto::cert::issue;
use shared_crypto::pkcs12::{self, DEFAULT_ITERATIONS};
use shared_crypto::{CertificateInfo, Pkcs12Builder, SubjectAttributes};

/// Issue a fresh key and self-signed certificate and package both into a
/// password-protected PKCS#12 container.
pub fn issue_and_package(subject: &SubjectAttributes, password: &str) -> Result<Vec<u8>> {
    issue_and_package_with(subject, password, DEFAULT_ITERATIONS)
}

/// [`issue_and_package`] with an explicit PBKDF2/MAC iteration count
pub fn issue_and_package_with(
    subject: &SubjectAttributes,
    password: &str,
    iterations: u32,
) -> Result<Vec<u8>> {
    let (identity, certificate) = issue(subject)?;
    let container = Pkcs12Builder::new(&identity, &certificate)
        .iterations(iterations)
        .build(password)?;

    tracing::info!(
        common_name = %subject.common_name,
        container_len = container.len(),
        "provisioned signing credentials"
    );
    Ok(container)
}

/// Summary of the signing certificate inside a container
pub fn describe_container(container: &[u8], password: &str) -> Result<CertificateInfo> {
    let credentials = pkcs12::parse(container, password).map_err(SignError::Credentials)?;
    Ok(CertificateInfo::from_certificate(credentials.certificate()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared_crypto::CryptoError;

    fn subject() -> SubjectAttributes {
        SubjectAttributes {
            common_name: "Provisioned User".to_string(),
            country: "SI".to_string(),
            locality: "Ljubljana".to_string(),
            organization: "Example d.o.o.".to_string(),
            uri: "https://example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_issue_and_describe() {
        let container = issue_and_package_with(&subject(), "user-42", 16).unwrap();
        let info = describe_container(&container, "user-42").unwrap();

        assert_eq!(info.common_name.as_deref(), Some("Provisioned User"));
        assert_eq!(info.subject, info.issuer);
        assert!(info.is_valid());
    }

    #[test]
    fn test_wrong_password_is_credentials_error() {
        let container = issue_and_package_with(&subject(), "user-42", 16).unwrap();
        let err = describe_container(&container, "user-43").unwrap_err();
        assert!(matches!(
            err,
            SignError::Credentials(CryptoError::InvalidPassword)
        ));
    }

    #[test]
    fn test_invalid_subject_fails_issuance() {
        let err = issue_and_package(&SubjectAttributes::default(), "pw").unwrap_err();
        assert!(matches!(
            err,
            SignError::Issuance(CryptoError::InvalidSubject(_))
        ));
    }
}
