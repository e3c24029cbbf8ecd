use shared_crypto::cert::issue;
use shared_crypto::{Certificate, RsaIdentity, SubjectAttributes};
use std::sync::OnceLock;

/// One signer for the whole test binary; generating 2048-bit keys is slow.
pub fn test_signer() -> (RsaIdentity, Vec<Certificate>) {
    static SIGNER: OnceLock<(RsaIdentity, Vec<Certificate>)> = OnceLock::new();
    SIGNER
        .get_or_init(|| {
            let subject = SubjectAttributes {
                common_name: "PDF Test Signer".to_string(),
                country: "SI".to_string(),
                organization: "Example d.o.o.".to_string(),
                locality: "Ljubljana".to_string(),
                uri: "https://signer.example.com".to_string(),
                ..Default::default()
            };
            let (identity, certificate) = issue(&subject).expect("issue test certificate");
            (identity, vec![certificate])
        })
        .clone()
}
