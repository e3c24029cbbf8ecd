//! Self-signed certificate issuance
//!
//! Every user gets one RSA key and one self-signed X.509 v3 certificate at
//! provisioning time. The subject (and issuer) attribute set is fixed:
//! CN, C, ST, L, O, OU plus a single URI subjectAltName.

use crate::error::{CryptoError, Result};
use crate::keys::{RsaIdentity, SigningIdentity};
use chrono::{DateTime, Months, Timelike, Utc};
use der::asn1::{BitString, GeneralizedTime, Ia5String, PrintableString, SetOfVec, UtcTime};
use der::oid::{AssociatedOid, ObjectIdentifier};
use der::{Any, Decode, Encode, Tag};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use spki::SubjectPublicKeyInfoOwned;
use std::time::Duration;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{BasicConstraints, KeyUsage, KeyUsages, SubjectAltName};
use x509_cert::ext::Extension;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::{Certificate, TbsCertificate, Version};

/// OID for commonName: 2.5.4.3
const OID_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
/// OID for countryName: 2.5.4.6
const OID_COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
/// OID for localityName: 2.5.4.7
const OID_LOCALITY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
/// OID for stateOrProvinceName: 2.5.4.8
const OID_STATE_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
/// OID for organizationName: 2.5.4.10
const OID_ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
/// OID for organizationalUnitName: 2.5.4.11
const OID_ORGANIZATIONAL_UNIT: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

/// Subject attributes written into every issued certificate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAttributes {
    pub common_name: String,
    pub country: String,
    pub state: String,
    pub locality: String,
    pub organization: String,
    pub organizational_unit: String,
    /// Single URI placed in the subjectAltName extension
    pub uri: String,
}

impl SubjectAttributes {
    /// Build the X.500 name; empty optional attributes are left out
    pub fn to_name(&self) -> Result<Name> {
        if self.common_name.trim().is_empty() {
            return Err(CryptoError::InvalidSubject(
                "common name must not be empty".to_string(),
            ));
        }

        let mut rdns = vec![utf8_rdn(OID_COMMON_NAME, &self.common_name)?];

        if !self.country.is_empty() {
            if self.country.len() != 2 {
                return Err(CryptoError::InvalidSubject(format!(
                    "country must be a two-letter code, got {:?}",
                    self.country
                )));
            }
            let country = PrintableString::new(&self.country)
                .map_err(|e| CryptoError::InvalidSubject(format!("country: {}", e)))?;
            rdns.push(rdn(OID_COUNTRY_NAME, Any::from_der(&country.to_der()?)?)?);
        }

        for (oid, value) in [
            (OID_STATE_NAME, &self.state),
            (OID_LOCALITY_NAME, &self.locality),
            (OID_ORGANIZATION_NAME, &self.organization),
            (OID_ORGANIZATIONAL_UNIT, &self.organizational_unit),
        ] {
            if !value.is_empty() {
                rdns.push(utf8_rdn(oid, value)?);
            }
        }

        Ok(RdnSequence(rdns))
    }
}

fn utf8_rdn(oid: ObjectIdentifier, value: &str) -> Result<RelativeDistinguishedName> {
    rdn(oid, Any::new(Tag::Utf8String, value.as_bytes())?)
}

fn rdn(oid: ObjectIdentifier, value: Any) -> Result<RelativeDistinguishedName> {
    let atv = AttributeTypeAndValue { oid, value };
    Ok(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?))
}

/// Generate a fresh 2048-bit key and a self-signed certificate for it
pub fn issue(subject: &SubjectAttributes) -> Result<(RsaIdentity, Certificate)> {
    // Reject a bad subject before paying for key generation
    subject.to_name()?;
    let identity = RsaIdentity::generate()?;
    let certificate = self_signed(&identity, subject)?;
    Ok((identity, certificate))
}

/// Build and self-sign a certificate for an existing identity.
///
/// Validity starts now (second precision) and ends exactly one calendar
/// year later.
pub fn self_signed(identity: &RsaIdentity, subject: &SubjectAttributes) -> Result<Certificate> {
    let name = subject.to_name()?;

    let not_before = Utc::now().with_nanosecond(0).unwrap_or_else(Utc::now);
    let not_after = one_year_after(not_before)?;
    let validity = Validity {
        not_before: to_x509_time(not_before)?,
        not_after: to_x509_time(not_after)?,
    };

    let spki = SubjectPublicKeyInfoOwned::from_der(&identity.public_key_der()?)?;

    let uri = Ia5String::new(&subject.uri)
        .map_err(|e| CryptoError::InvalidSubject(format!("subjectAltName URI: {}", e)))?;

    let extensions = vec![
        extension(&BasicConstraints {
            ca: true,
            path_len_constraint: None,
        })?,
        extension(&KeyUsage(
            KeyUsages::KeyCertSign
                | KeyUsages::DigitalSignature
                | KeyUsages::NonRepudiation
                | KeyUsages::KeyEncipherment
                | KeyUsages::DataEncipherment,
        ))?,
        extension(&SubjectAltName(vec![GeneralName::UniformResourceIdentifier(
            uri,
        )]))?,
    ];

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: random_serial()?,
        signature: identity.signature_algorithm(),
        issuer: name.clone(),
        validity,
        subject: name,
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(extensions),
    };

    let signature = identity.sign(&tbs_certificate.to_der()?)?;

    let certificate = Certificate {
        tbs_certificate,
        signature_algorithm: identity.signature_algorithm(),
        signature: BitString::from_bytes(&signature)?,
    };

    tracing::info!(
        subject = %certificate.tbs_certificate.subject,
        not_after = %not_after,
        "issued self-signed certificate"
    );

    Ok(certificate)
}

fn extension<E: Encode + AssociatedOid>(value: &E) -> Result<Extension> {
    Ok(Extension {
        extn_id: E::OID,
        critical: E::OID == BasicConstraints::OID || E::OID == KeyUsage::OID,
        extn_value: der::asn1::OctetString::new(value.to_der()?)?,
    })
}

/// Positive 16-byte serial without a leading zero octet
fn random_serial() -> Result<SerialNumber> {
    let mut bytes = crate::keys::random_bytes::<16>();
    bytes[0] = (bytes[0] & 0x7F) | 0x40;
    Ok(SerialNumber::new(&bytes)?)
}

/// Same month and day one year later (Feb 29 clamps to Feb 28)
pub fn one_year_after(start: DateTime<Utc>) -> Result<DateTime<Utc>> {
    start
        .checked_add_months(Months::new(12))
        .ok_or_else(|| CryptoError::InvalidSubject("validity end out of range".to_string()))
}

fn to_x509_time(at: DateTime<Utc>) -> Result<Time> {
    let since_epoch = Duration::from_secs(at.timestamp().max(0) as u64);
    // RFC 5280: UTCTime through 2049, GeneralizedTime afterwards
    if at.timestamp() < 2_524_608_000 {
        Ok(Time::UtcTime(UtcTime::from_unix_duration(since_epoch)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_unix_duration(
            since_epoch,
        )?))
    }
}

fn from_x509_time(time: &Time) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.to_unix_duration().as_secs() as i64, 0)
}

/// Extract the RSA public key of a certificate
pub fn certificate_public_key(certificate: &Certificate) -> Result<RsaPublicKey> {
    let spki_der = certificate.tbs_certificate.subject_public_key_info.to_der()?;
    RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|e| CryptoError::Verification(format!("Unsupported public key: {}", e)))
}

/// Whether the certificate carries the public half of `identity`
pub fn matches_identity(certificate: &Certificate, identity: &RsaIdentity) -> bool {
    match (
        certificate.tbs_certificate.subject_public_key_info.to_der(),
        identity.public_key_der(),
    ) {
        (Ok(cert_key), Ok(own_key)) => cert_key == own_key,
        _ => false,
    }
}

/// Human-readable summary of a certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub common_name: Option<String>,
    pub serial_number: String,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

impl CertificateInfo {
    pub fn from_certificate(certificate: &Certificate) -> Self {
        let tbs = &certificate.tbs_certificate;
        Self {
            subject: tbs.subject.to_string(),
            issuer: tbs.issuer.to_string(),
            common_name: common_name(&tbs.subject),
            serial_number: hex::encode(tbs.serial_number.as_bytes()),
            not_before: from_x509_time(&tbs.validity.not_before),
            not_after: from_x509_time(&tbs.validity.not_after),
        }
    }

    /// Check if certificate is currently valid
    pub fn is_valid(&self) -> bool {
        let now = Utc::now();
        match (self.not_before, self.not_after) {
            (Some(start), Some(end)) => start <= now && now <= end,
            _ => false,
        }
    }
}

fn common_name(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == OID_COMMON_NAME)
        .and_then(|atv| String::from_utf8(atv.value.value().to_vec()).ok())
}

#[cfg(test)]
pub(crate) fn test_subject() -> SubjectAttributes {
    SubjectAttributes {
        common_name: "PDF Signer".to_string(),
        country: "SI".to_string(),
        state: "Osrednjeslovenska".to_string(),
        locality: "Ljubljana".to_string(),
        organization: "Example d.o.o.".to_string(),
        organizational_unit: "Signing".to_string(),
        uri: "https://signer.example.com".to_string(),
    }
}
