//! PKCS#12 key derivation (RFC 7292, Appendix B.2)
//!
//! Containers written here only need the integrity key (ID 3) over SHA-256.
//! Containers from other tools also use SHA-1 and the cipher key (ID 1) and
//! IV (ID 2) diversifiers of the legacy PBE schemes.

use sha2::digest::core_api::BlockSizeUser;
use sha2::Digest;
use zeroize::Zeroizing;

/// Diversifier for cipher keys
pub const ID_KEY: u8 = 1;
/// Diversifier for cipher IVs
pub const ID_IV: u8 = 2;
/// Diversifier for MAC keys
pub const ID_MAC: u8 = 3;

/// Encode a password as a NUL-terminated BMPString (UTF-16BE).
pub fn bmp_password(password: &str) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(password.len() * 2 + 2));
    for unit in password.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out.extend_from_slice(&[0, 0]);
    out
}

/// Derive `len` bytes of key material for the given purpose with digest `D`.
pub fn derive<D>(
    id: u8,
    password: &str,
    salt: &[u8],
    iterations: u32,
    len: usize,
) -> Zeroizing<Vec<u8>>
where
    D: Digest + BlockSizeUser,
{
    let u = <D as Digest>::output_size();
    let v = D::block_size();

    let password = bmp_password(password);
    let d = vec![id; v];

    let mut i = Zeroizing::new(Vec::new());
    i.extend_from_slice(&repeat_to_block(salt, v));
    i.extend_from_slice(&repeat_to_block(&password, v));

    let mut out = Zeroizing::new(Vec::with_capacity(len));
    let rounds = iterations.max(1);

    while out.len() < len {
        let mut a = Zeroizing::new(
            D::new()
                .chain_update(&d)
                .chain_update(i.as_slice())
                .finalize()
                .to_vec(),
        );
        for _ in 1..rounds {
            *a = D::digest(a.as_slice()).to_vec();
        }

        let take = (len - out.len()).min(u);
        out.extend_from_slice(&a[..take]);
        if out.len() >= len {
            break;
        }

        // B = A repeated to one block; every I_j += B + 1 (mod 2^(8v))
        let b: Vec<u8> = a.iter().cycle().take(v).copied().collect();
        for block in i.chunks_mut(v) {
            let mut carry: u16 = 1;
            for k in (0..v).rev() {
                let sum = block[k] as u16 + b[k] as u16 + carry;
                block[k] = sum as u8;
                carry = sum >> 8;
            }
        }
    }

    out
}

/// Concatenate copies of `data` up to the next multiple of the block size `v`
fn repeat_to_block(data: &[u8], v: usize) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let len = v * data.len().div_ceil(v);
    data.iter().cycle().take(len).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sha1::Sha1;
    use sha2::Sha256;

    #[test]
    fn test_bmp_password() {
        assert_eq!(
            bmp_password("ab").as_slice(),
            &[0x00, b'a', 0x00, b'b', 0x00, 0x00]
        );
        assert_eq!(bmp_password("").as_slice(), &[0x00, 0x00]);
        assert_eq!(bmp_password("č").as_slice(), &[0x01, 0x0D, 0x00, 0x00]);
    }

    #[test]
    fn test_repeat_to_block() {
        assert!(repeat_to_block(&[], 64).is_empty());
        let out = repeat_to_block(&[1, 2, 3], 64);
        assert_eq!(out.len(), 64);
        assert_eq!(&out[..6], &[1, 2, 3, 1, 2, 3]);
        assert_eq!(repeat_to_block(&[7u8; 65], 64).len(), 128);
        assert_eq!(repeat_to_block(&[7u8; 65], 128).len(), 128);
    }

    #[test]
    fn test_derive_depends_on_every_input() {
        let base = derive::<Sha256>(ID_MAC, "secret", b"saltsaltsaltsalt", 16, 32);
        assert_eq!(base.len(), 32);
        assert_ne!(base, derive::<Sha256>(1, "secret", b"saltsaltsaltsalt", 16, 32));
        assert_ne!(base, derive::<Sha256>(ID_MAC, "Secret", b"saltsaltsaltsalt", 16, 32));
        assert_ne!(base, derive::<Sha256>(ID_MAC, "secret", b"saltsaltsaltsalT", 16, 32));
        assert_ne!(base, derive::<Sha256>(ID_MAC, "secret", b"saltsaltsaltsalt", 17, 32));
    }

    #[test]
    fn test_derive_sha1_known_answers() {
        let salt = [0x0A, 0x58, 0xCF, 0x64, 0x53, 0x0D, 0x82, 0x3F];
        assert_eq!(
            hex::encode(derive::<Sha1>(ID_KEY, "smeg", &salt, 1, 24).as_slice()),
            "8aaae6297b6cb04642ab5b077851284eb7128f1a2a7fbca3"
        );
        assert_eq!(
            hex::encode(derive::<Sha1>(ID_IV, "smeg", &salt, 1, 8).as_slice()),
            "79993dfe048d3b76"
        );

        let salt = [0x16, 0x82, 0xC0, 0xFC, 0x5B, 0x3F, 0x7E, 0xC5];
        assert_eq!(
            hex::encode(derive::<Sha1>(ID_KEY, "queeg", &salt, 1000, 24).as_slice()),
            "483dd6e919d7de2e8e648ba8f862f3fbfbdc2bcb2c02957f"
        );
        assert_eq!(
            hex::encode(derive::<Sha1>(ID_IV, "queeg", &salt, 1000, 8).as_slice()),
            "9d461d1b00355c50"
        );
    }

    #[test]
    fn test_derive_longer_output_extends_prefix() {
        let short = derive::<Sha256>(ID_MAC, "pw", b"0123456789abcdef", 4, 32);
        let long = derive::<Sha256>(ID_MAC, "pw", b"0123456789abcdef", 4, 80);
        assert_eq!(long.len(), 80);
        assert_eq!(&long[..32], short.as_slice());
    }
}
