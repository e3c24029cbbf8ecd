//! Containers written by OpenSSL 3.0
//!
//! All fixtures hold the same "Legacy Fixture Signer" key and certificate;
//! most also carry a "Fixture CA" certificate without a localKeyId.
//!
//! Regenerate with:
//!
//! ```text
//! openssl pkcs12 -export -inkey leaf.key -in leaf.pem -certfile ca.pem -passout pass:fixture -out openssl-default.p12
//! openssl pkcs12 -export -inkey leaf.key -in leaf.pem -certfile ca.pem -passout pass:fixture -macalg sha1 -out openssl-sha1-mac.p12
//! openssl pkcs12 -export -legacy -inkey leaf.key -in leaf.pem -certfile ca.pem -passout pass:fixture -out openssl-legacy.p12
//! openssl pkcs12 -export -legacy -descert -inkey leaf.key -in leaf.pem -passout pass:fixture -out openssl-legacy-3des.p12
//! openssl pkcs12 -export -inkey leaf.key -in leaf.pem -certpbe NONE -passout pass:fixture -out openssl-plain-certs.p12
//! openssl pkcs12 -export -legacy -macalg sha1 -inkey leaf.key -in leaf.pem -passout 'pass:žabji krak' -out openssl-legacy-unicode.p12
//! ```

use pretty_assertions::assert_eq;
use shared_crypto::cert::{certificate_public_key, matches_identity};
use shared_crypto::keys::verify_rsa_sha256;
use shared_crypto::pkcs12::{self, Pkcs12Credentials};
use shared_crypto::{CertificateInfo, CryptoError, SigningIdentity};

const PASSWORD: &str = "fixture";

/// PBES2 bags, HMAC-SHA256 MAC
const DEFAULT: &[u8] = include_bytes!("fixtures/openssl-default.p12");
/// PBES2 bags, HMAC-SHA1 MAC
const SHA1_MAC: &[u8] = include_bytes!("fixtures/openssl-sha1-mac.p12");
/// 3DES shrouded key, RC2-40 certificates, HMAC-SHA1 MAC
const LEGACY: &[u8] = include_bytes!("fixtures/openssl-legacy.p12");
/// 3DES shrouded key and certificates, HMAC-SHA1 MAC
const LEGACY_3DES: &[u8] = include_bytes!("fixtures/openssl-legacy-3des.p12");
/// Certificates in an unencrypted id-data SafeContents
const PLAIN_CERTS: &[u8] = include_bytes!("fixtures/openssl-plain-certs.p12");
/// Legacy container with a non-ASCII password
const LEGACY_UNICODE: &[u8] = include_bytes!("fixtures/openssl-legacy-unicode.p12");

fn common_names(credentials: &Pkcs12Credentials) -> Vec<String> {
    credentials
        .chain
        .iter()
        .map(|c| CertificateInfo::from_certificate(c).common_name.unwrap_or_default())
        .collect()
}

fn assert_usable(credentials: &Pkcs12Credentials) {
    assert!(matches_identity(credentials.certificate(), &credentials.identity));

    let signature = credentials.identity.sign(b"fixture payload").unwrap();
    let public_key = certificate_public_key(credentials.certificate()).unwrap();
    assert!(verify_rsa_sha256(&public_key, b"fixture payload", &signature));
}

#[test]
fn opens_default_container() {
    let credentials = pkcs12::parse(DEFAULT, PASSWORD).unwrap();
    assert_eq!(
        common_names(&credentials),
        vec!["Legacy Fixture Signer", "Fixture CA"]
    );
    assert_usable(&credentials);
}

#[test]
fn opens_container_with_sha1_mac() {
    let credentials = pkcs12::parse(SHA1_MAC, PASSWORD).unwrap();
    assert_eq!(
        common_names(&credentials),
        vec!["Legacy Fixture Signer", "Fixture CA"]
    );
    assert_usable(&credentials);
}

#[test]
fn opens_legacy_rc2_and_3des_container() {
    let credentials = pkcs12::parse(LEGACY, PASSWORD).unwrap();
    assert_eq!(
        common_names(&credentials),
        vec!["Legacy Fixture Signer", "Fixture CA"]
    );
    assert_usable(&credentials);
}

#[test]
fn opens_legacy_3des_container() {
    let credentials = pkcs12::parse(LEGACY_3DES, PASSWORD).unwrap();
    assert_eq!(common_names(&credentials), vec!["Legacy Fixture Signer"]);
    assert_usable(&credentials);
}

#[test]
fn opens_container_with_plain_certificates() {
    let credentials = pkcs12::parse(PLAIN_CERTS, PASSWORD).unwrap();
    assert_eq!(common_names(&credentials), vec!["Legacy Fixture Signer"]);
    assert_usable(&credentials);
}

#[test]
fn opens_legacy_container_with_unicode_password() {
    let credentials = pkcs12::parse(LEGACY_UNICODE, "žabji krak").unwrap();
    assert_usable(&credentials);

    assert!(matches!(
        pkcs12::parse(LEGACY_UNICODE, "zabji krak"),
        Err(CryptoError::InvalidPassword)
    ));
}

#[test]
fn every_fixture_key_is_the_same() {
    let reference = pkcs12::parse(DEFAULT, PASSWORD).unwrap();
    for (container, password) in [
        (SHA1_MAC, PASSWORD),
        (LEGACY, PASSWORD),
        (LEGACY_3DES, PASSWORD),
        (PLAIN_CERTS, PASSWORD),
        (LEGACY_UNICODE, "žabji krak"),
    ] {
        let credentials = pkcs12::parse(container, password).unwrap();
        assert_eq!(credentials.certificate(), reference.certificate());
    }
}

#[test]
fn wrong_password_is_rejected_for_every_mac() {
    for container in [DEFAULT, SHA1_MAC, LEGACY, LEGACY_3DES, PLAIN_CERTS] {
        let err = pkcs12::parse(container, "not the fixture password").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidPassword), "{:?}", err);
    }
}
