//! RSA key generation and management

use crate::error::{CryptoError, Result};
use der::asn1::AnyRef;
use der::oid::ObjectIdentifier;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

/// Modulus size for every key issued by this crate.
pub const RSA_KEY_BITS: usize = 2048;

/// OID for sha256WithRSAEncryption: 1.2.840.113549.1.1.11
pub const OID_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");

/// Trait for any identity that can sign documents
pub trait SigningIdentity {
    /// Get the SubjectPublicKeyInfo as DER-encoded bytes
    fn public_key_der(&self) -> Result<Vec<u8>>;

    /// Get the public key as hex string
    fn public_key_hex(&self) -> Result<String> {
        Ok(hex::encode(self.public_key_der()?))
    }

    /// Algorithm identifier placed next to signatures produced by [`SigningIdentity::sign`]
    fn signature_algorithm(&self) -> AlgorithmIdentifierOwned;

    /// Sign raw data (hashing is part of the signature scheme)
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Verify a signature
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;

    /// Upper bound on the size of one raw signature value
    fn signature_len(&self) -> usize;
}

/// An RSA identity backed by a private key.
///
/// The key is zeroized when the identity is dropped.
#[derive(Clone)]
pub struct RsaIdentity {
    private_key: RsaPrivateKey,
}

impl RsaIdentity {
    /// Generate a new random 2048-bit identity from the OS random source
    pub fn generate() -> Result<Self> {
        Self::generate_with_bits(RSA_KEY_BITS)
    }

    pub fn generate_with_bits(bits: usize) -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut rand_core::OsRng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        tracing::debug!(bits, "generated RSA key pair");
        Ok(Self { private_key })
    }

    /// Import from a PKCS#8 `PrivateKeyInfo` document
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::MalformedContainer(format!("Invalid private key: {}", e)))?;
        Ok(Self { private_key })
    }

    /// Export the private key as PKCS#8 DER.
    /// WARNING: Handle with care - this exposes the private key
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let document = self
            .private_key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::Signing(format!("Cannot encode private key: {}", e)))?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.to_public_key()
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// Modulus length in bytes (also the length of one signature)
    pub fn modulus_len(&self) -> usize {
        self.private_key.size()
    }
}

impl std::fmt::Debug for RsaIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaIdentity")
            .field("bits", &(self.modulus_len() * 8))
            .finish_non_exhaustive()
    }
}

impl SigningIdentity for RsaIdentity {
    fn public_key_der(&self) -> Result<Vec<u8>> {
        let document = self
            .public_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::Signing(format!("Cannot encode public key: {}", e)))?;
        Ok(document.as_bytes().to_vec())
    }

    fn signature_algorithm(&self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: OID_SHA256_WITH_RSA,
            parameters: Some(AnyRef::NULL.into()),
        }
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signing_key = SigningKey::<Sha256>::new(self.private_key.clone());
        let signature = signing_key
            .try_sign(data)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(signature.to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        verify_rsa_sha256(&self.public_key(), data, signature)
    }

    fn signature_len(&self) -> usize {
        self.modulus_len()
    }
}

/// Verify an RSASSA-PKCS1-v1_5 / SHA-256 signature
pub fn verify_rsa_sha256(public_key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> bool {
    let verifying_key = VerifyingKey::<Sha256>::new(public_key.clone());
    match Signature::try_from(signature) {
        Ok(sig) => verifying_key.verify(data, &sig).is_ok(),
        Err(_) => false,
    }
}

/// Hash data using SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash data and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Fill a fresh buffer from the OS random source
pub fn random_bytes<const N: usize>() -> [u8; N] {
    use rand_core::RngCore;

    let mut buf = [0u8; N];
    rand_core::OsRng.fill_bytes(&mut buf);
    buf
}
