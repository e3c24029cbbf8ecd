//! Password-protected PKCS#12 containers
//!
//! A container holds one RSA private key and its certificate chain, linked
//! through a random `localKeyId`. Keys are shrouded with PBES2
//! (PBKDF2-HMAC-SHA256 + AES-256-CBC), the certificate SafeContents is
//! encrypted with the same scheme, and the whole AuthenticatedSafe is
//! protected by an HMAC-SHA256 integrity MAC.
//!
//! Parsing also accepts containers from other tools: SHA-1, SHA-384 and
//! SHA-512 MACs, and bags encrypted with the PKCS#12 3DES and RC2 schemes.

pub mod asn1;
pub mod kdf;
pub mod pbe;

use crate::error::{CryptoError, Result};
use crate::keys::{random_bytes, RsaIdentity};
use asn1::{
    decode_any, digest_algorithm, encode_any, octets_any, AuthenticatedSafe, CertBag, DigestInfo,
    EncryptedKeyInfo, MacData, Pfx, SafeBag, SafeContents, OID_CERT_BAG, OID_DATA,
    OID_ENCRYPTED_DATA, OID_KEY_BAG, OID_LOCAL_KEY_ID, OID_SHA1, OID_SHA256, OID_SHA384,
    OID_SHA512, OID_SHROUDED_KEY_BAG, OID_X509_CERTIFICATE,
};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::encrypted_data::EncryptedData;
use cms::enveloped_data::EncryptedContentInfo;
use der::asn1::{OctetString, SetOfVec};
use der::{Decode, Encode};
use hmac::{Mac, SimpleHmac};
use pkcs8::pkcs5::{pbes2, EncryptionScheme};
use pkcs8::PrivateKeyInfo;
use sha1::Sha1;
use sha2::digest::core_api::BlockSizeUser;
use sha2::{Digest, Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attribute;
use x509_cert::Certificate;
use zeroize::Zeroizing;

/// PBKDF2 and MAC iteration count used unless overridden
pub const DEFAULT_ITERATIONS: u32 = 2048;

const MAC_SALT_LEN: usize = 16;
const PBKDF2_SALT_LEN: usize = 16;
const LOCAL_KEY_ID_LEN: usize = 20;

/// Key material recovered from a container
#[derive(Debug, Clone)]
pub struct Pkcs12Credentials {
    pub identity: RsaIdentity,
    /// Leaf certificate first, followed by any further certificates
    pub chain: Vec<Certificate>,
}

impl Pkcs12Credentials {
    /// The certificate matching [`Pkcs12Credentials::identity`]
    pub fn certificate(&self) -> &Certificate {
        &self.chain[0]
    }
}

/// Build a container for one key and its certificate with default settings.
pub fn build(identity: &RsaIdentity, certificate: &Certificate, password: &str) -> Result<Vec<u8>> {
    Pkcs12Builder::new(identity, certificate).build(password)
}

/// Open a container and recover its key and certificates.
///
/// The integrity MAC is checked before anything is decrypted.
pub fn parse(data: &[u8], password: &str) -> Result<Pkcs12Credentials> {
    parse_container(data, password).map_err(|e| match e {
        CryptoError::Encoding(e) => CryptoError::MalformedContainer(e.to_string()),
        other => other,
    })
}

/// Builder for PKCS#12 containers
pub struct Pkcs12Builder<'a> {
    identity: &'a RsaIdentity,
    certificate: &'a Certificate,
    extra_certificates: Vec<&'a Certificate>,
    iterations: u32,
}

impl<'a> Pkcs12Builder<'a> {
    pub fn new(identity: &'a RsaIdentity, certificate: &'a Certificate) -> Self {
        Self {
            identity,
            certificate,
            extra_certificates: Vec::new(),
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Add a further (e.g. CA) certificate to the certificate bag
    pub fn add_certificate(mut self, certificate: &'a Certificate) -> Self {
        self.extra_certificates.push(certificate);
        self
    }

    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    pub fn build(self, password: &str) -> Result<Vec<u8>> {
        if !crate::cert::matches_identity(self.certificate, self.identity) {
            return Err(CryptoError::MalformedContainer(
                "certificate does not belong to the private key".to_string(),
            ));
        }

        let local_key_id = random_bytes::<LOCAL_KEY_ID_LEN>();

        let key_bag = self.key_bag(password, Some(local_key_id.as_slice()))?;
        let key_contents = plain_contents(&[key_bag])?;

        let mut cert_bags = vec![cert_bag(self.certificate, Some(local_key_id.as_slice()))?];
        for extra in &self.extra_certificates {
            cert_bags.push(cert_bag(extra, None)?);
        }
        let cert_contents = self.encrypt_contents(&cert_bags, password)?;

        let der = seal(vec![key_contents, cert_contents], password, self.iterations)?;
        tracing::debug!(
            size = der.len(),
            certificates = 1 + self.extra_certificates.len(),
            "built PKCS#12 container"
        );
        Ok(der)
    }

    fn key_bag(&self, password: &str, local_key_id: Option<&[u8]>) -> Result<SafeBag> {
        let pkcs8_der = self.identity.to_pkcs8_der()?;
        let key_info = PrivateKeyInfo::try_from(pkcs8_der.as_slice())
            .map_err(|e| CryptoError::Signing(format!("Invalid private key: {}", e)))?;

        let salt = random_bytes::<PBKDF2_SALT_LEN>();
        let iv = random_bytes::<16>();
        let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(self.iterations, &salt, &iv)
            .map_err(|e| CryptoError::Signing(format!("PBES2 parameters: {}", e)))?;
        let encrypted = key_info
            .encrypt_with_params(params, password)
            .map_err(|e| CryptoError::Signing(format!("Cannot encrypt private key: {}", e)))?;

        Ok(SafeBag {
            bag_id: OID_SHROUDED_KEY_BAG,
            bag_value: der::Any::from_der(encrypted.as_bytes())?,
            bag_attributes: local_key_id.map(local_key_id_attributes).transpose()?,
        })
    }

    fn encrypt_contents(&self, bags: &[SafeBag], password: &str) -> Result<ContentInfo> {
        let plaintext = Zeroizing::new(bags.to_vec().to_der()?);

        let salt = random_bytes::<PBKDF2_SALT_LEN>();
        let iv = random_bytes::<16>();
        let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(self.iterations, &salt, &iv)
            .map_err(|e| CryptoError::Signing(format!("PBES2 parameters: {}", e)))?;
        let ciphertext = params
            .encrypt(password, &plaintext)
            .map_err(|e| CryptoError::Signing(format!("Cannot encrypt certificates: {}", e)))?;

        let scheme = EncryptionScheme::from(params);
        let encrypted_data = EncryptedData {
            version: CmsVersion::V0,
            enc_content_info: EncryptedContentInfo {
                content_type: OID_DATA,
                content_enc_alg: AlgorithmIdentifierOwned::from_der(&scheme.to_der()?)?,
                encrypted_content: Some(OctetString::new(ciphertext)?),
            },
            unprotected_attrs: None,
        };

        Ok(ContentInfo {
            content_type: OID_ENCRYPTED_DATA,
            content: encode_any(&encrypted_data)?,
        })
    }
}

/// Wrap the AuthenticatedSafe into a PFX with a SHA-256 integrity MAC
fn seal(auth_safe: AuthenticatedSafe, password: &str, iterations: u32) -> Result<Vec<u8>> {
    let auth_safe_der = auth_safe.to_der()?;

    let mac_salt = random_bytes::<MAC_SALT_LEN>();
    let mac = keyed_mac::<Sha256>(password, &mac_salt, iterations, &auth_safe_der)?
        .finalize()
        .into_bytes()
        .to_vec();

    let pfx = Pfx {
        version: 3,
        auth_safe: ContentInfo {
            content_type: OID_DATA,
            content: octets_any(auth_safe_der)?,
        },
        mac_data: Some(MacData {
            mac: DigestInfo {
                digest_algorithm: digest_algorithm(OID_SHA256),
                digest: OctetString::new(mac)?,
            },
            mac_salt: OctetString::new(mac_salt.to_vec())?,
            iterations: Some(iterations),
        }),
    };
    Ok(pfx.to_der()?)
}

/// Unencrypted `id-data` SafeContents
fn plain_contents(bags: &[SafeBag]) -> Result<ContentInfo> {
    Ok(ContentInfo {
        content_type: OID_DATA,
        content: octets_any(bags.to_vec().to_der()?)?,
    })
}

fn cert_bag(certificate: &Certificate, local_key_id: Option<&[u8]>) -> Result<SafeBag> {
    let bag = CertBag {
        cert_id: OID_X509_CERTIFICATE,
        cert_value: octets_any(certificate.to_der()?)?,
    };
    Ok(SafeBag {
        bag_id: OID_CERT_BAG,
        bag_value: encode_any(&bag)?,
        bag_attributes: local_key_id.map(local_key_id_attributes).transpose()?,
    })
}

fn local_key_id_attributes(id: &[u8]) -> Result<SetOfVec<Attribute>> {
    let attribute = Attribute {
        oid: OID_LOCAL_KEY_ID,
        values: SetOfVec::try_from(vec![octets_any(id.to_vec())?])?,
    };
    Ok(SetOfVec::try_from(vec![attribute])?)
}

/// HMAC over `data` keyed by the App. B KDF with the same digest
fn keyed_mac<D>(password: &str, salt: &[u8], iterations: u32, data: &[u8]) -> Result<SimpleHmac<D>>
where
    D: Digest + BlockSizeUser,
{
    let key = kdf::derive::<D>(
        kdf::ID_MAC,
        password,
        salt,
        iterations,
        <D as Digest>::output_size(),
    );
    let mut mac = SimpleHmac::<D>::new_from_slice(&key)
        .map_err(|e| CryptoError::MalformedContainer(format!("HMAC key: {}", e)))?;
    mac.update(data);
    Ok(mac)
}

fn verify_mac(mac_data: &MacData, password: &str, data: &[u8]) -> Result<()> {
    let salt = mac_data.mac_salt.as_bytes();
    let iterations = mac_data.iterations.unwrap_or(1);
    let expected = mac_data.mac.digest.as_bytes();

    let verified = match mac_data.mac.digest_algorithm.oid {
        OID_SHA1 => keyed_mac::<Sha1>(password, salt, iterations, data)?.verify_slice(expected),
        OID_SHA256 => keyed_mac::<Sha256>(password, salt, iterations, data)?.verify_slice(expected),
        OID_SHA384 => keyed_mac::<Sha384>(password, salt, iterations, data)?.verify_slice(expected),
        OID_SHA512 => keyed_mac::<Sha512>(password, salt, iterations, data)?.verify_slice(expected),
        other => {
            return Err(CryptoError::MalformedContainer(format!(
                "unsupported MAC digest algorithm {}",
                other
            )))
        }
    };
    verified.map_err(|_| CryptoError::InvalidPassword)
}

/// A bag's payload paired with its `localKeyId`
struct Tagged<T> {
    local_key_id: Option<Vec<u8>>,
    value: T,
}

fn parse_container(data: &[u8], password: &str) -> Result<Pkcs12Credentials> {
    let pfx = Pfx::from_der(data)?;
    if pfx.version != 3 {
        return Err(CryptoError::MalformedContainer(format!(
            "unsupported PFX version {}",
            pfx.version
        )));
    }
    if pfx.auth_safe.content_type != OID_DATA {
        return Err(CryptoError::MalformedContainer(
            "public-key integrity mode is not supported".to_string(),
        ));
    }

    let auth_safe_der = decode_any::<OctetString>(&pfx.auth_safe.content)?;
    match &pfx.mac_data {
        Some(mac_data) => verify_mac(mac_data, password, auth_safe_der.as_bytes())?,
        None => tracing::warn!("PKCS#12 container has no integrity MAC"),
    }

    let auth_safe = AuthenticatedSafe::from_der(auth_safe_der.as_bytes())?;

    let mut keys: Vec<Tagged<RsaIdentity>> = Vec::new();
    let mut certificates: Vec<Tagged<Certificate>> = Vec::new();

    for content_info in &auth_safe {
        let bags = match content_info.content_type {
            OID_DATA => {
                let octets = decode_any::<OctetString>(&content_info.content)?;
                SafeContents::from_der(octets.as_bytes())?
            }
            OID_ENCRYPTED_DATA => decrypt_contents(content_info, password)?,
            other => {
                tracing::warn!(content_type = %other, "skipping unsupported PKCS#12 content");
                continue;
            }
        };

        for bag in bags {
            let local_key_id = bag.local_key_id();
            match bag.bag_id {
                OID_SHROUDED_KEY_BAG => {
                    let encrypted = decode_any::<EncryptedKeyInfo>(&bag.bag_value)?;
                    let decrypted = pbe::decrypt(
                        &encrypted.encryption_algorithm,
                        password,
                        encrypted.encrypted_data.as_bytes(),
                    )?;
                    keys.push(Tagged {
                        local_key_id,
                        value: RsaIdentity::from_pkcs8_der(&decrypted)?,
                    });
                }
                OID_KEY_BAG => {
                    let plain = Zeroizing::new(bag.bag_value.to_der()?);
                    keys.push(Tagged {
                        local_key_id,
                        value: RsaIdentity::from_pkcs8_der(&plain)?,
                    });
                }
                OID_CERT_BAG => {
                    let cert_bag = decode_any::<CertBag>(&bag.bag_value)?;
                    if cert_bag.cert_id != OID_X509_CERTIFICATE {
                        tracing::debug!(cert_type = %cert_bag.cert_id, "skipping non-X.509 certificate bag");
                        continue;
                    }
                    let cert_der = decode_any::<OctetString>(&cert_bag.cert_value)?;
                    certificates.push(Tagged {
                        local_key_id,
                        value: Certificate::from_der(cert_der.as_bytes())?,
                    });
                }
                other => {
                    tracing::debug!(bag_type = %other, "skipping unsupported safe bag");
                }
            }
        }
    }

    if keys.len() != 1 {
        return Err(CryptoError::MalformedContainer(format!(
            "expected exactly one private key, found {}",
            keys.len()
        )));
    }
    let key = keys.remove(0);

    let leaf_index = key
        .local_key_id
        .as_ref()
        .and_then(|id| {
            certificates
                .iter()
                .position(|c| c.local_key_id.as_ref() == Some(id))
        })
        .or_else(|| {
            certificates
                .iter()
                .position(|c| crate::cert::matches_identity(&c.value, &key.value))
        })
        .ok_or_else(|| {
            CryptoError::MalformedContainer("no certificate for the private key".to_string())
        })?;

    let leaf = certificates.remove(leaf_index);
    if !crate::cert::matches_identity(&leaf.value, &key.value) {
        return Err(CryptoError::MalformedContainer(
            "leaf certificate does not match the private key".to_string(),
        ));
    }

    let mut chain = vec![leaf.value];
    chain.extend(certificates.into_iter().map(|c| c.value));

    tracing::debug!(certificates = chain.len(), "opened PKCS#12 container");

    Ok(Pkcs12Credentials {
        identity: key.value,
        chain,
    })
}

fn decrypt_contents(content_info: &ContentInfo, password: &str) -> Result<SafeContents> {
    let encrypted_data = decode_any::<EncryptedData>(&content_info.content)?;
    let info = encrypted_data.enc_content_info;

    let ciphertext = info.encrypted_content.ok_or_else(|| {
        CryptoError::MalformedContainer("encrypted content is missing".to_string())
    })?;

    let plaintext = pbe::decrypt(&info.content_enc_alg, password, ciphertext.as_bytes())?;
    Ok(SafeContents::from_der(&plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::{self_signed, test_subject};
    use crate::keys::{test_support, SigningIdentity};
    use pretty_assertions::assert_eq;

    fn credentials() -> (RsaIdentity, Certificate) {
        let identity = test_support::identity();
        let certificate = self_signed(&identity, &test_subject()).unwrap();
        (identity, certificate)
    }

    #[test]
    fn test_roundtrip_recovers_key_and_certificate() {
        let (identity, certificate) = credentials();
        let container = build(&identity, &certificate, "correct horse").unwrap();

        let parsed = parse(&container, "correct horse").unwrap();
        assert_eq!(parsed.chain.len(), 1);
        assert_eq!(parsed.certificate(), &certificate);
        assert_eq!(
            parsed.identity.public_key_der().unwrap(),
            identity.public_key_der().unwrap()
        );

        // Signatures made with the recovered key verify against the certificate
        let signature = parsed.identity.sign(b"payload").unwrap();
        let public_key = crate::cert::certificate_public_key(parsed.certificate()).unwrap();
        assert!(crate::keys::verify_rsa_sha256(&public_key, b"payload", &signature));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let (identity, certificate) = credentials();
        let container = build(&identity, &certificate, "right").unwrap();

        let err = parse(&container, "wrong").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidPassword));
        assert!(err.is_credentials_error());
    }

    #[test]
    fn test_empty_password_roundtrip() {
        let (identity, certificate) = credentials();
        let container = build(&identity, &certificate, "").unwrap();
        assert!(parse(&container, "").is_ok());
        assert!(matches!(
            parse(&container, "x"),
            Err(CryptoError::InvalidPassword)
        ));
    }

    #[test]
    fn test_extra_certificates_follow_leaf() {
        let (identity, certificate) = credentials();
        let other_identity = RsaIdentity::generate_with_bits(1024).unwrap();
        let other = self_signed(&other_identity, &test_subject()).unwrap();

        let container = Pkcs12Builder::new(&identity, &certificate)
            .add_certificate(&other)
            .iterations(100)
            .build("pw")
            .unwrap();

        let parsed = parse(&container, "pw").unwrap();
        assert_eq!(parsed.chain, vec![certificate, other]);
    }

    #[test]
    fn test_mismatched_certificate_rejected_at_build() {
        let (identity, _) = credentials();
        let other_identity = RsaIdentity::generate_with_bits(1024).unwrap();
        let other = self_signed(&other_identity, &test_subject()).unwrap();

        assert!(matches!(
            build(&identity, &other, "pw"),
            Err(CryptoError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse(b"definitely not DER", "pw"),
            Err(CryptoError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_tampered_container_fails_mac() {
        let (identity, certificate) = credentials();
        let mut container = build(&identity, &certificate, "pw").unwrap();
        // Flip a byte well inside the authenticated content
        let middle = container.len() / 2;
        container[middle] ^= 0x01;

        let err = parse(&container, "pw").unwrap_err();
        assert!(err.is_credentials_error());
    }

    #[test]
    fn test_two_builds_differ() {
        let (identity, certificate) = credentials();
        let a = build(&identity, &certificate, "pw").unwrap();
        let b = build(&identity, &certificate, "pw").unwrap();
        assert_ne!(a, b);
    }

    const KEY_ID: [u8; 4] = [0xA0, 0xDB, 0xB1, 0x00];

    fn other_certificate() -> Certificate {
        let other_identity = RsaIdentity::generate_with_bits(1024).unwrap();
        self_signed(&other_identity, &test_subject()).unwrap()
    }

    #[test]
    fn test_leaf_listed_after_other_certificates() {
        let (identity, certificate) = credentials();
        let other = other_certificate();
        let builder = Pkcs12Builder::new(&identity, &certificate).iterations(16);

        let key = builder.key_bag("pw", Some(KEY_ID.as_slice())).unwrap();
        let certs = builder
            .encrypt_contents(
                &[
                    cert_bag(&other, None).unwrap(),
                    cert_bag(&certificate, Some(KEY_ID.as_slice())).unwrap(),
                ],
                "pw",
            )
            .unwrap();
        let container = seal(vec![certs, plain_contents(&[key]).unwrap()], "pw", 16).unwrap();

        let parsed = parse(&container, "pw").unwrap();
        assert_eq!(parsed.chain, vec![certificate, other]);
    }

    #[test]
    fn test_certificates_in_plain_safe_contents() {
        let (identity, certificate) = credentials();
        let builder = Pkcs12Builder::new(&identity, &certificate).iterations(16);

        let key = builder.key_bag("pw", Some(KEY_ID.as_slice())).unwrap();
        let certs = plain_contents(&[cert_bag(&certificate, Some(KEY_ID.as_slice())).unwrap()]).unwrap();
        let container = seal(vec![plain_contents(&[key]).unwrap(), certs], "pw", 16).unwrap();

        let parsed = parse(&container, "pw").unwrap();
        assert_eq!(parsed.chain, vec![certificate]);
    }

    #[test]
    fn test_key_and_certificates_in_one_safe_contents() {
        let (identity, certificate) = credentials();
        let other = other_certificate();
        let builder = Pkcs12Builder::new(&identity, &certificate).iterations(16);

        let bags = [
            cert_bag(&other, None).unwrap(),
            builder.key_bag("pw", Some(KEY_ID.as_slice())).unwrap(),
            cert_bag(&certificate, Some(KEY_ID.as_slice())).unwrap(),
        ];
        let contents = builder.encrypt_contents(&bags, "pw").unwrap();
        let container = seal(vec![contents], "pw", 16).unwrap();

        let parsed = parse(&container, "pw").unwrap();
        assert_eq!(parsed.chain, vec![certificate, other]);
    }

    #[test]
    fn test_leaf_matched_by_public_key_without_local_key_id() {
        let (identity, certificate) = credentials();
        let other = other_certificate();
        let builder = Pkcs12Builder::new(&identity, &certificate).iterations(16);

        let key = builder.key_bag("pw", None).unwrap();
        let certs = builder
            .encrypt_contents(
                &[cert_bag(&other, None).unwrap(), cert_bag(&certificate, None).unwrap()],
                "pw",
            )
            .unwrap();
        let container = seal(vec![plain_contents(&[key]).unwrap(), certs], "pw", 16).unwrap();

        let parsed = parse(&container, "pw").unwrap();
        assert_eq!(parsed.chain, vec![certificate, other]);
        assert!(crate::cert::matches_identity(parsed.certificate(), &parsed.identity));
    }

    #[test]
    fn test_unshrouded_key_bag() {
        let (identity, certificate) = credentials();
        let key = SafeBag {
            bag_id: OID_KEY_BAG,
            bag_value: der::Any::from_der(&identity.to_pkcs8_der().unwrap()).unwrap(),
            bag_attributes: None,
        };
        let certs = plain_contents(&[cert_bag(&certificate, None).unwrap()]).unwrap();
        let container = seal(vec![plain_contents(&[key]).unwrap(), certs], "pw", 16).unwrap();

        let parsed = parse(&container, "pw").unwrap();
        assert_eq!(parsed.certificate(), &certificate);
    }

    #[test]
    fn test_missing_leaf_certificate_is_malformed() {
        let (identity, certificate) = credentials();
        let builder = Pkcs12Builder::new(&identity, &certificate).iterations(16);

        let key = builder.key_bag("pw", Some(KEY_ID.as_slice())).unwrap();
        let certs = plain_contents(&[cert_bag(&other_certificate(), None).unwrap()]).unwrap();
        let container = seal(vec![plain_contents(&[key]).unwrap(), certs], "pw", 16).unwrap();

        assert!(matches!(
            parse(&container, "pw"),
            Err(CryptoError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_two_private_keys_are_malformed() {
        let (identity, certificate) = credentials();
        let builder = Pkcs12Builder::new(&identity, &certificate).iterations(16);

        let keys = [
            builder.key_bag("pw", Some(KEY_ID.as_slice())).unwrap(),
            builder.key_bag("pw", None).unwrap(),
        ];
        let certs = plain_contents(&[cert_bag(&certificate, Some(KEY_ID.as_slice())).unwrap()]).unwrap();
        let container = seal(vec![plain_contents(&keys).unwrap(), certs], "pw", 16).unwrap();

        assert!(matches!(
            parse(&container, "pw"),
            Err(CryptoError::MalformedContainer(_))
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::cert::{self_signed, test_subject};
    use crate::keys::test_support;
    use proptest::prelude::*;
    use std::sync::OnceLock;

    fn credentials() -> &'static (RsaIdentity, Certificate) {
        static CREDENTIALS: OnceLock<(RsaIdentity, Certificate)> = OnceLock::new();
        CREDENTIALS.get_or_init(|| {
            let identity = test_support::identity();
            let certificate = self_signed(&identity, &test_subject()).unwrap();
            (identity, certificate)
        })
    }

    fn password() -> impl Strategy<Value = String> {
        prop::collection::vec(any::<char>(), 0..24).prop_map(String::from_iter)
    }

    fn container(password: &str) -> Vec<u8> {
        let (identity, certificate) = credentials();
        Pkcs12Builder::new(identity, certificate)
            .iterations(4)
            .build(password)
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Property: a container opens with the password it was built with
        #[test]
        fn roundtrip_any_password(password in password()) {
            let parsed = parse(&container(&password), &password).unwrap();
            prop_assert_eq!(parsed.certificate(), &credentials().1);
        }

        /// Property: every other password is rejected as a wrong password
        #[test]
        fn other_password_rejected(password in password(), other in password()) {
            prop_assume!(password != other);
            prop_assert!(matches!(
                parse(&container(&password), &other),
                Err(CryptoError::InvalidPassword)
            ));
        }
    }
}
