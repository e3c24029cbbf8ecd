//! ASN.1 structures from RFC 7292 not covered by the `cms`/`pkcs8` crates

use cms::content_info::ContentInfo;
use der::asn1::{AnyRef, ObjectIdentifier, OctetString};
use der::{Any, Decode, DecodeOwned, Encode, Sequence};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attributes;

pub const OID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
pub const OID_ENCRYPTED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.6");

pub const OID_KEY_BAG: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.1");
pub const OID_SHROUDED_KEY_BAG: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.2");
pub const OID_CERT_BAG: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.10.1.3");

/// certType x509Certificate: 1.2.840.113549.1.9.22.1
pub const OID_X509_CERTIFICATE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.22.1");
/// Bag attribute pkcs-9 localKeyId: 1.2.840.113549.1.9.21
pub const OID_LOCAL_KEY_ID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.21");
/// id-sha1: 1.3.14.3.2.26
pub const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
/// id-sha256: 2.16.840.1.101.3.4.2.1
pub const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
pub const OID_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
pub const OID_SHA512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

// PKCS#12 PBE schemes (RFC 7292, Appendix C)
pub const OID_PBE_SHA1_3DES: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.3");
pub const OID_PBE_SHA1_2DES: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.4");
pub const OID_PBE_SHA1_RC2_128: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.5");
pub const OID_PBE_SHA1_RC2_40: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.6");

/// PFX ::= SEQUENCE { version, authSafe, macData OPTIONAL }
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Pfx {
    pub version: u8,
    pub auth_safe: ContentInfo,
    #[asn1(optional = "true")]
    pub mac_data: Option<MacData>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct MacData {
    pub mac: DigestInfo,
    pub mac_salt: OctetString,
    #[asn1(optional = "true")]
    pub iterations: Option<u32>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct DigestInfo {
    pub digest_algorithm: AlgorithmIdentifierOwned,
    pub digest: OctetString,
}

/// SafeContents ::= SEQUENCE OF SafeBag
pub type SafeContents = Vec<SafeBag>;

/// AuthenticatedSafe ::= SEQUENCE OF ContentInfo
pub type AuthenticatedSafe = Vec<ContentInfo>;

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SafeBag {
    pub bag_id: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
    pub bag_value: Any,
    #[asn1(optional = "true")]
    pub bag_attributes: Option<Attributes>,
}

impl SafeBag {
    /// Value of the first localKeyId attribute, if present
    pub fn local_key_id(&self) -> Option<Vec<u8>> {
        let attributes = self.bag_attributes.as_ref()?;
        let attribute = attributes.iter().find(|a| a.oid == OID_LOCAL_KEY_ID)?;
        let value = attribute.values.iter().next()?;
        decode_any::<OctetString>(value)
            .ok()
            .map(|id| id.as_bytes().to_vec())
    }
}

/// EncryptedPrivateKeyInfo with an open algorithm identifier, so the
/// PKCS#12 PBE schemes decode as well as PBES2
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct EncryptedKeyInfo {
    pub encryption_algorithm: AlgorithmIdentifierOwned,
    pub encrypted_data: OctetString,
}

/// pkcs-12PbeParams ::= SEQUENCE { salt OCTET STRING, iterations INTEGER }
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Pkcs12PbeParams {
    pub salt: OctetString,
    pub iterations: u32,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CertBag {
    pub cert_id: ObjectIdentifier,
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
    pub cert_value: Any,
}

/// Re-encode a typed value as an open `ANY`
pub fn encode_any<T: Encode>(value: &T) -> der::Result<Any> {
    Any::from_der(&value.to_der()?)
}

/// Decode the typed value carried by an `ANY`
pub fn decode_any<T: DecodeOwned>(any: &Any) -> der::Result<T> {
    T::from_der(&any.to_der()?)
}

/// `OCTET STRING` wrapper used for `id-data` content and bag values
pub fn octets_any(bytes: Vec<u8>) -> der::Result<Any> {
    encode_any(&OctetString::new(bytes)?)
}

pub fn digest_algorithm(oid: ObjectIdentifier) -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid,
        parameters: Some(AnyRef::NULL.into()),
    }
}
