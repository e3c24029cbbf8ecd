//! CMS (Cryptographic Message Syntax) SignedData for PDF signatures
//!
//! Builds the detached `adbe.pkcs7.detached` structure embedded in a
//! signature dictionary's `/Contents`, with the signed attributes
//! - content-type
//! - signing-time
//! - message-digest
//!
//! and decodes/verifies the same structure when reading signed PDFs.

use crate::cert::certificate_public_key;
use crate::error::{CryptoError, Result};
use crate::keys::{verify_rsa_sha256, SigningIdentity};
use crate::pkcs12::asn1::{decode_any, digest_algorithm, encode_any, OID_DATA, OID_SHA256};
use chrono::{DateTime, Utc};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedAttributes, SignedData, SignerIdentifier,
    SignerInfo, SignerInfos,
};
use der::asn1::{ObjectIdentifier, OctetString, SetOfVec, UtcTime};
use der::{Decode, Encode, SliceReader};
use std::time::Duration;
use x509_cert::attr::Attribute;
use x509_cert::time::Time;
use x509_cert::Certificate;

/// OID for id-signedData (PKCS#7): 1.2.840.113549.1.7.2
pub const OID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

/// OID for content-type attribute: 1.2.840.113549.1.9.3
const OID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");

/// OID for message-digest attribute: 1.2.840.113549.1.9.4
const OID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// OID for signing-time attribute: 1.2.840.113549.1.9.5
const OID_SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");

/// Room for the SignedData framing, algorithm identifiers and signed attributes
const STRUCTURE_OVERHEAD: usize = 1024;

/// Build a detached CMS SignedData structure for PDF embedding
///
/// # Arguments
/// * `content_digest` - SHA-256 hash of the PDF byte range being signed
/// * `identity` - key that produces the signature
/// * `chain` - signer certificate first; every entry is embedded
/// * `signing_time` - value of the signing-time attribute
pub fn build_detached_signature<I: SigningIdentity>(
    content_digest: &[u8],
    identity: &I,
    chain: &[Certificate],
    signing_time: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let signer = chain
        .first()
        .ok_or_else(|| CryptoError::Signing("certificate chain is empty".to_string()))?;

    let signed_attrs = build_signed_attributes(content_digest, signing_time)?;
    let signature = identity.sign(&signed_attrs.to_der()?)?;

    let signer_info = SignerInfo {
        version: CmsVersion::V1,
        sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: signer.tbs_certificate.issuer.clone(),
            serial_number: signer.tbs_certificate.serial_number.clone(),
        }),
        digest_alg: digest_algorithm(OID_SHA256),
        signed_attrs: Some(signed_attrs),
        signature_algorithm: identity.signature_algorithm(),
        signature: OctetString::new(signature)?,
        unsigned_attrs: None,
    };

    let certificates = chain
        .iter()
        .cloned()
        .map(CertificateChoices::Certificate)
        .collect::<Vec<_>>();

    let signed_data = SignedData {
        version: CmsVersion::V1,
        digest_algorithms: SetOfVec::try_from(vec![digest_algorithm(OID_SHA256)])?,
        encap_content_info: EncapsulatedContentInfo {
            econtent_type: OID_DATA,
            econtent: None,
        },
        certificates: Some(CertificateSet(SetOfVec::try_from(certificates)?)),
        crls: None,
        signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info])?),
    };

    let content_info = ContentInfo {
        content_type: OID_SIGNED_DATA,
        content: encode_any(&signed_data)?,
    };

    Ok(content_info.to_der()?)
}

/// Signed attributes: content-type, signing-time and message-digest
fn build_signed_attributes(
    content_digest: &[u8],
    signing_time: DateTime<Utc>,
) -> Result<SignedAttributes> {
    let since_epoch = Duration::from_secs(signing_time.timestamp().max(0) as u64);
    let time = Time::UtcTime(UtcTime::from_unix_duration(since_epoch)?);

    let attributes = vec![
        attribute(OID_CONTENT_TYPE, encode_any(&OID_DATA)?)?,
        attribute(OID_SIGNING_TIME, encode_any(&time)?)?,
        attribute(
            OID_MESSAGE_DIGEST,
            encode_any(&OctetString::new(content_digest)?)?,
        )?,
    ];

    Ok(SetOfVec::try_from(attributes)?)
}

fn attribute(oid: ObjectIdentifier, value: der::Any) -> Result<Attribute> {
    Ok(Attribute {
        oid,
        values: SetOfVec::try_from(vec![value])?,
    })
}

/// Upper bound on the DER size of a signature built over `chain` by a key
/// whose raw signatures are `signature_len` bytes.
pub fn max_signature_len(chain: &[Certificate], signature_len: usize) -> Result<usize> {
    let mut total = STRUCTURE_OVERHEAD + signature_len;
    for certificate in chain {
        total += usize::try_from(certificate.encoded_len()?)?;
        // issuer name and serial are repeated in the signer identifier
        total += usize::try_from(certificate.tbs_certificate.issuer.encoded_len()?)?;
    }
    Ok(total)
}

/// Result of checking a detached signature against a content digest
#[derive(Debug, Clone)]
pub struct DetachedSignature {
    /// Certificate named by the signer identifier, when embedded
    pub signer: Option<Certificate>,
    pub signing_time: Option<DateTime<Utc>>,
    /// The message-digest attribute equals the recomputed digest
    pub digest_matches: bool,
    /// The RSA signature over the signed attributes verifies
    pub signature_valid: bool,
}

/// Decode a SignedData `ContentInfo`; trailing bytes (slot padding) are ignored
pub fn decode_signed_data(bytes: &[u8]) -> Result<SignedData> {
    let mut reader = SliceReader::new(bytes)?;
    let content_info = ContentInfo::decode(&mut reader)?;
    if content_info.content_type != OID_SIGNED_DATA {
        return Err(CryptoError::Verification(format!(
            "unexpected content type {}",
            content_info.content_type
        )));
    }
    Ok(decode_any::<SignedData>(&content_info.content)?)
}

/// Verify a detached signature against the SHA-256 digest of the signed content
pub fn verify_detached(bytes: &[u8], content_digest: &[u8]) -> Result<DetachedSignature> {
    let signed_data = decode_signed_data(bytes)?;

    let signer_info = signed_data
        .signer_infos
        .0
        .iter()
        .next()
        .ok_or_else(|| CryptoError::Verification("no signer info".to_string()))?;

    if signer_info.digest_alg.oid != OID_SHA256 {
        return Err(CryptoError::Verification(format!(
            "unsupported digest algorithm {}",
            signer_info.digest_alg.oid
        )));
    }

    let signed_attrs = signer_info
        .signed_attrs
        .as_ref()
        .ok_or_else(|| CryptoError::Verification("signed attributes missing".to_string()))?;

    let message_digest = find_attribute(signed_attrs, OID_MESSAGE_DIGEST)
        .map(decode_any::<OctetString>)
        .transpose()?;
    let digest_matches = message_digest
        .map(|digest| digest.as_bytes() == content_digest)
        .unwrap_or(false);

    let signing_time = find_attribute(signed_attrs, OID_SIGNING_TIME)
        .and_then(|value| decode_any::<Time>(value).ok())
        .and_then(|time| DateTime::from_timestamp(time.to_unix_duration().as_secs() as i64, 0));

    let signer = find_signer(&signed_data, &signer_info.sid);

    let signature_valid = match &signer {
        Some(certificate) => {
            let public_key = certificate_public_key(certificate)?;
            verify_rsa_sha256(
                &public_key,
                &signed_attrs.to_der()?,
                signer_info.signature.as_bytes(),
            )
        }
        None => false,
    };

    tracing::debug!(digest_matches, signature_valid, "checked detached signature");

    Ok(DetachedSignature {
        signer,
        signing_time,
        digest_matches,
        signature_valid,
    })
}

fn find_attribute(attributes: &SignedAttributes, oid: ObjectIdentifier) -> Option<&der::Any> {
    attributes
        .iter()
        .find(|attribute| attribute.oid == oid)
        .and_then(|attribute| attribute.values.iter().next())
}

fn find_signer(signed_data: &SignedData, sid: &SignerIdentifier) -> Option<Certificate> {
    let SignerIdentifier::IssuerAndSerialNumber(id) = sid else {
        return None;
    };
    signed_data
        .certificates
        .as_ref()?
        .0
        .iter()
        .find_map(|choice| match choice {
            CertificateChoices::Certificate(cert)
                if cert.tbs_certificate.issuer == id.issuer
                    && cert.tbs_certificate.serial_number == id.serial_number =>
            {
                Some(cert.clone())
            }
            _ => None,
        })
}
