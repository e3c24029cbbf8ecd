//! Signer configuration
//!
//! Certificate subject attributes come from `CERT_*` variables; a `.env`
//! file in the working directory is honoured. Only provisioning needs a
//! subject; signing with existing credentials uses it for /Location alone.

use crate::error::{Result, SignError};
use serde::{Deserialize, Serialize};
use shared_crypto::pkcs12::DEFAULT_ITERATIONS;
use shared_crypto::SubjectAttributes;
use shared_pdf::placeholder::MIN_SIGNATURE_CAPACITY;
use shared_pdf::SigningContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Subject and issuer of every certificate issued at provisioning
    pub subject: SubjectAttributes,
    /// Fixed /Contents capacity in DER bytes; sized from the credentials when unset
    pub signature_capacity: Option<usize>,
    /// PBKDF2 and MAC iterations for new PKCS#12 containers
    pub pkcs12_iterations: u32,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            subject: SubjectAttributes::default(),
            signature_capacity: None,
            pkcs12_iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl SignerConfig {
    /// Load from the process environment, after reading `.env` if present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).unwrap_or_default();

        let subject = SubjectAttributes {
            common_name: var("CERT_COMMON_NAME"),
            country: var("CERT_COUNTRY"),
            state: var("CERT_STATE"),
            locality: var("CERT_LOCALITY"),
            organization: var("CERT_ORGANIZATION"),
            organizational_unit: var("CERT_ORGANIZATION_UNIT"),
            uri: var("CERT_URI"),
        };

        let signature_capacity = lookup("DOCSIGN_SIGNATURE_CAPACITY")
            .map(|v| parse_number("DOCSIGN_SIGNATURE_CAPACITY", &v))
            .transpose()?;
        let pkcs12_iterations = lookup("DOCSIGN_PKCS12_ITERATIONS")
            .map(|v| parse_number("DOCSIGN_PKCS12_ITERATIONS", &v))
            .transpose()?
            .unwrap_or(DEFAULT_ITERATIONS);

        let config = Self {
            subject,
            signature_capacity,
            pkcs12_iterations,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(capacity) = self.signature_capacity {
            if capacity < MIN_SIGNATURE_CAPACITY {
                return Err(SignError::Config(format!(
                    "signature capacity {} is below the minimum of {}",
                    capacity, MIN_SIGNATURE_CAPACITY
                )));
            }
        }
        if self.pkcs12_iterations == 0 {
            return Err(SignError::Config(
                "PKCS#12 iteration count must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The subject for issuing new certificates
    pub fn require_subject(&self) -> Result<&SubjectAttributes> {
        if self.subject.common_name.trim().is_empty() {
            return Err(SignError::Config("CERT_COMMON_NAME is not set".to_string()));
        }
        Ok(&self.subject)
    }

    /// Signature metadata for a user, located by this configuration's subject
    pub fn signing_context(&self, name: Option<&str>, email: Option<&str>) -> SigningContext {
        SigningContext::for_signer(name, email, &self.subject)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SignError::Config(format!("{} is not a valid number: {:?}", key, value)))
}
