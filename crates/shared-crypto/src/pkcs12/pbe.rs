//! Password-based decryption of shrouded keys and encrypted SafeContents
//!
//! PBES2 is handled by `pkcs5`. The PKCS#12 PBE schemes written by older
//! OpenSSL, Windows, Java keystores and node-forge derive key and IV with
//! the Appendix B KDF over SHA-1 and run 3DES or RC2 in CBC mode.

use super::asn1::{
    decode_any, Pkcs12PbeParams, OID_PBE_SHA1_2DES, OID_PBE_SHA1_3DES, OID_PBE_SHA1_RC2_128,
    OID_PBE_SHA1_RC2_40,
};
use super::kdf;
use crate::error::{CryptoError, Result};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockCipher, BlockDecryptMut, InnerIvInit, KeyInit};
use der::asn1::ObjectIdentifier;
use der::{Decode, Encode};
use des::{TdesEde2, TdesEde3};
use pkcs8::pkcs5::EncryptionScheme;
use rc2::Rc2;
use sha1::Sha1;
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

/// Block size of DES and RC2
const LEGACY_IV_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegacyCipher {
    TripleDes,
    TwoKeyTripleDes,
    Rc2 { key_len: usize },
}

impl LegacyCipher {
    fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        match oid {
            OID_PBE_SHA1_3DES => Some(Self::TripleDes),
            OID_PBE_SHA1_2DES => Some(Self::TwoKeyTripleDes),
            OID_PBE_SHA1_RC2_128 => Some(Self::Rc2 { key_len: 16 }),
            OID_PBE_SHA1_RC2_40 => Some(Self::Rc2 { key_len: 5 }),
            _ => None,
        }
    }

    fn key_len(self) -> usize {
        match self {
            Self::TripleDes => 24,
            Self::TwoKeyTripleDes => 16,
            Self::Rc2 { key_len } => key_len,
        }
    }
}

/// Decrypt `ciphertext` with the scheme named by `algorithm`.
///
/// A padding failure is reported as a wrong password.
pub fn decrypt(
    algorithm: &AlgorithmIdentifierOwned,
    password: &str,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if let Some(cipher) = LegacyCipher::from_oid(algorithm.oid) {
        return decrypt_legacy(cipher, algorithm, password, ciphertext);
    }

    let alg_der = algorithm.to_der()?;
    let scheme = EncryptionScheme::from_der(&alg_der).map_err(|e| {
        CryptoError::MalformedContainer(format!(
            "unsupported encryption scheme {}: {}",
            algorithm.oid, e
        ))
    })?;
    if scheme.pbes2().is_none() {
        return Err(CryptoError::MalformedContainer(format!(
            "unsupported encryption scheme {}",
            scheme.oid()
        )));
    }

    scheme
        .decrypt(password, ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::InvalidPassword)
}

fn decrypt_legacy(
    cipher: LegacyCipher,
    algorithm: &AlgorithmIdentifierOwned,
    password: &str,
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let params = algorithm.parameters.as_ref().ok_or_else(|| {
        CryptoError::MalformedContainer("PBE parameters are missing".to_string())
    })?;
    let params = decode_any::<Pkcs12PbeParams>(params)?;
    let salt = params.salt.as_bytes();

    let key = kdf::derive::<Sha1>(kdf::ID_KEY, password, salt, params.iterations, cipher.key_len());
    let iv = kdf::derive::<Sha1>(kdf::ID_IV, password, salt, params.iterations, LEGACY_IV_LEN);

    let invalid_key = |_| CryptoError::MalformedContainer("invalid PBE key length".to_string());
    match cipher {
        LegacyCipher::TripleDes => {
            cbc_decrypt(TdesEde3::new_from_slice(&key).map_err(invalid_key)?, &iv, ciphertext)
        }
        LegacyCipher::TwoKeyTripleDes => {
            cbc_decrypt(TdesEde2::new_from_slice(&key).map_err(invalid_key)?, &iv, ciphertext)
        }
        LegacyCipher::Rc2 { key_len } => {
            cbc_decrypt(Rc2::new_with_eff_key_len(&key, key_len * 8), &iv, ciphertext)
        }
    }
}

fn cbc_decrypt<C>(cipher: C, iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>
where
    C: BlockCipher + BlockDecryptMut,
{
    let decryptor = cbc::Decryptor::<C>::inner_iv_slice_init(cipher, iv)
        .map_err(|_| CryptoError::MalformedContainer("invalid PBE IV length".to_string()))?;

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    let len = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| CryptoError::InvalidPassword)?
        .len();
    buffer.truncate(len);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkcs12::asn1::encode_any;
    use cbc::cipher::BlockEncryptMut;
    use der::asn1::OctetString;
    use pretty_assertions::assert_eq;

    const SALT: [u8; 8] = [0x0A, 0x58, 0xCF, 0x64, 0x53, 0x0D, 0x82, 0x3F];

    fn algorithm(oid: ObjectIdentifier) -> AlgorithmIdentifierOwned {
        let params = Pkcs12PbeParams {
            salt: OctetString::new(SALT.to_vec()).unwrap(),
            iterations: 64,
        };
        AlgorithmIdentifierOwned {
            oid,
            parameters: Some(encode_any(&params).unwrap()),
        }
    }

    fn encrypt<C>(cipher: C, iv: &[u8], plaintext: &[u8]) -> Vec<u8>
    where
        C: BlockCipher + BlockEncryptMut,
    {
        let encryptor = cbc::Encryptor::<C>::inner_iv_slice_init(cipher, iv).unwrap();
        let mut buffer = vec![0u8; plaintext.len() + LEGACY_IV_LEN];
        buffer[..plaintext.len()].copy_from_slice(plaintext);
        encryptor
            .encrypt_padded_mut::<Pkcs7>(&mut buffer, plaintext.len())
            .unwrap()
            .to_vec()
    }

    fn derived(password: &str, key_len: usize) -> (Zeroizing<Vec<u8>>, Zeroizing<Vec<u8>>) {
        (
            kdf::derive::<Sha1>(kdf::ID_KEY, password, &SALT, 64, key_len),
            kdf::derive::<Sha1>(kdf::ID_IV, password, &SALT, 64, LEGACY_IV_LEN),
        )
    }

    #[test]
    fn test_triple_des_decrypts() {
        let plaintext = b"certificate bag contents".to_vec();
        let (key, iv) = derived("secret", 24);
        let ciphertext = encrypt(TdesEde3::new_from_slice(&key).unwrap(), &iv, &plaintext);

        let decrypted = decrypt(&algorithm(OID_PBE_SHA1_3DES), "secret", &ciphertext).unwrap();
        assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn test_rc2_40_decrypts() {
        let plaintext = vec![0x30u8; 37];
        let (key, iv) = derived("pässword", 5);
        let ciphertext = encrypt(Rc2::new_with_eff_key_len(&key, 40), &iv, &plaintext);

        let decrypted = decrypt(&algorithm(OID_PBE_SHA1_RC2_40), "pässword", &ciphertext).unwrap();
        assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn test_truncated_ciphertext_is_rejected() {
        let (key, iv) = derived("secret", 24);
        let ciphertext = encrypt(TdesEde3::new_from_slice(&key).unwrap(), &iv, b"0123456789");

        assert!(decrypt(
            &algorithm(OID_PBE_SHA1_3DES),
            "secret",
            &ciphertext[..ciphertext.len() - 3]
        )
        .is_err());
    }

    #[test]
    fn test_missing_parameters_are_malformed() {
        let algorithm = AlgorithmIdentifierOwned {
            oid: OID_PBE_SHA1_3DES,
            parameters: None,
        };
        assert!(matches!(
            decrypt(&algorithm, "pw", &[0; 16]),
            Err(CryptoError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_rc4_scheme_is_unsupported() {
        // pbeWithSHAAnd128BitRC4
        let rc4 = ObjectIdentifier::new_unwrap("1.2.840.113549.1.12.1.1");
        match decrypt(&algorithm(rc4), "pw", &[0; 16]) {
            Err(CryptoError::MalformedContainer(message)) => {
                assert!(message.contains("1.2.840.113549.1.12.1.1"), "{}", message)
            }
            other => panic!("expected an unsupported scheme, got {:?}", other.map(|p| p.len())),
        }
    }
}
