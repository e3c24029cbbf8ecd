//! Descriptive metadata written into the signature dictionary

use serde::{Deserialize, Serialize};
use shared_crypto::SubjectAttributes;

/// Stand-in for a missing signer name or contact
pub const UNAUTHORIZED_USER: &str = "Unauthorized User";

/// Values of /Name, /ContactInfo, /Reason and /Location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningContext {
    pub signer_name: String,
    pub contact_info: String,
    pub reason: String,
    pub location: String,
}

impl SigningContext {
    /// Context for a signer, with reason and location derived from the
    /// certificate subject.
    pub fn for_signer(
        name: Option<&str>,
        email: Option<&str>,
        subject: &SubjectAttributes,
    ) -> Self {
        let signer_name = non_empty(name).unwrap_or(UNAUTHORIZED_USER).to_string();
        let contact_info = non_empty(email).unwrap_or(UNAUTHORIZED_USER).to_string();

        Self {
            reason: format!("Document was signed by {}", signer_name),
            location: location(subject),
            signer_name,
            contact_info,
        }
    }
}

/// "Organization, Locality." with missing parts left out
fn location(subject: &SubjectAttributes) -> String {
    let parts: Vec<&str> = [subject.organization.as_str(), subject.locality.as_str()]
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!("{}.", parts.join(", "))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
