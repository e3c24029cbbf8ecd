//! Request and result types of the signing pipeline

use crate::error::{Result, SignError};
use serde::{Deserialize, Deserializer, Serialize};
use shared_pdf::PagePlacement;

/// One visual signature on one page of one uploaded document.
///
/// Geometry is normalized to the page size with a top-left origin. Numeric
/// fields accept JSON numbers or numeric strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// 0-based index into the uploaded documents
    #[serde(deserialize_with = "lenient_integer")]
    pub document: usize,
    /// 1-based page number
    #[serde(deserialize_with = "lenient_integer")]
    pub page: u32,
    #[serde(deserialize_with = "lenient_float")]
    pub x: f64,
    #[serde(deserialize_with = "lenient_float")]
    pub y: f64,
    #[serde(deserialize_with = "lenient_float")]
    pub width: f64,
    #[serde(deserialize_with = "lenient_float")]
    pub height: f64,
}

impl Placement {
    pub fn page_placement(&self) -> PagePlacement {
        PagePlacement {
            page: self.page,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    fn validate(&self, position: usize) -> Result<()> {
        let invalid =
            |what: &str| Err(SignError::InvalidRequest(format!("placement {}: {}", position, what)));

        if self.page == 0 {
            return invalid("pages are numbered from 1");
        }
        for (name, value) in [("x", self.x), ("y", self.y)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return invalid(&format!("{} = {} is outside [0, 1]", name, value));
            }
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return invalid(&format!("{} = {} is outside (0, 1]", name, value));
            }
        }
        Ok(())
    }
}

/// Ordered placements of one signing request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureRequest {
    pub placements: Vec<Placement>,
}

impl SignatureRequest {
    pub fn new(placements: Vec<Placement>) -> Self {
        Self { placements }
    }

    /// Parse the JSON array sent by clients
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SignError::InvalidRequest(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Placements targeting one document, in request order
    pub fn for_document(&self, index: usize) -> impl Iterator<Item = &Placement> {
        self.placements.iter().filter(move |p| p.document == index)
    }

    /// Check geometry and that every placement targets an uploaded document
    pub fn validate(&self, document_count: usize) -> Result<()> {
        for (position, placement) in self.placements.iter().enumerate() {
            placement.validate(position)?;
            if placement.document >= document_count {
                return Err(SignError::InvalidRequest(format!(
                    "placement {} targets document {} but only {} were uploaded",
                    position, placement.document, document_count
                )));
            }
        }
        Ok(())
    }
}

/// An uploaded document
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DocumentInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// A successfully signed document
#[derive(Debug, Clone)]
pub struct SignedDocument {
    pub pdf: Vec<u8>,
    pub original_name: String,
    pub output_name: String,
}

/// Per-document result; a failure affects only its own document
pub type DocumentOutcome = std::result::Result<SignedDocument, SignError>;

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Integer(u64),
    Float(f64),
    Text(String),
}

fn lenient_float<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    use serde::de::Error;

    match Lenient::deserialize(deserializer)? {
        Lenient::Integer(n) => Ok(n as f64),
        Lenient::Float(n) => Ok(n),
        Lenient::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected a number, got {:?}", s))),
    }
}

fn lenient_integer<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64> + std::str::FromStr,
{
    use serde::de::Error;

    let out_of_range = |n: u64| D::Error::custom(format!("{} is out of range", n));
    match Lenient::deserialize(deserializer)? {
        Lenient::Integer(n) => T::try_from(n).map_err(|_| out_of_range(n)),
        Lenient::Float(n) if n.fract() == 0.0 && n >= 0.0 => {
            T::try_from(n as u64).map_err(|_| out_of_range(n as u64))
        }
        Lenient::Float(n) => Err(D::Error::custom(format!("expected an integer, got {}", n))),
        Lenient::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected an integer, got {:?}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn placement(document: usize, page: u32) -> Placement {
        Placement {
            document,
            page,
            x: 0.1,
            y: 0.1,
            width: 0.2,
            height: 0.05,
        }
    }

    #[test]
    fn test_parse_numbers_and_strings() {
        let request = SignatureRequest::from_json(
            r#"[
                {"document": 0, "page": 1, "x": 0.1, "y": 0.1, "width": 0.2, "height": 0.05},
                {"document": "1", "page": "2", "x": "0.5", "y": " 0.25", "width": "0.2", "height": 1}
            ]"#,
        )
        .unwrap();

        assert_eq!(request.placements[0], placement(0, 1));
        assert_eq!(
            request.placements[1],
            Placement {
                document: 1,
                page: 2,
                x: 0.5,
                y: 0.25,
                width: 0.2,
                height: 1.0,
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for json in [
            r#"[{"document": 0, "page": "one", "x": 0, "y": 0, "width": 1, "height": 1}]"#,
            r#"[{"document": 0, "page": 1.5, "x": 0, "y": 0, "width": 1, "height": 1}]"#,
            r#"[{"document": 0, "page": 1, "x": "left", "y": 0, "width": 1, "height": 1}]"#,
            r#"[{"document": 0, "page": 1}]"#,
            r#"{"document": 0}"#,
        ] {
            assert!(
                matches!(SignatureRequest::from_json(json), Err(SignError::InvalidRequest(_))),
                "{}",
                json
            );
        }
    }

    #[test]
    fn test_for_document_keeps_order() {
        let request = SignatureRequest::new(vec![
            placement(0, 1),
            placement(1, 1),
            placement(0, 3),
            placement(0, 2),
        ]);
        let pages: Vec<u32> = request.for_document(0).map(|p| p.page).collect();
        assert_eq!(pages, vec![1, 3, 2]);
        assert_eq!(request.for_document(2).count(), 0);
    }

    #[test]
    fn test_validate() {
        let ok = SignatureRequest::new(vec![placement(0, 1), placement(1, 4)]);
        ok.validate(2).unwrap();

        assert!(ok.validate(1).is_err());

        let mut zero_page = placement(0, 1);
        zero_page.page = 0;
        let mut wide = placement(0, 1);
        wide.width = 1.5;
        let mut negative = placement(0, 1);
        negative.y = -0.1;
        let mut nan = placement(0, 1);
        nan.x = f64::NAN;

        for bad in [zero_page, wide, negative, nan] {
            let request = SignatureRequest::new(vec![bad]);
            assert!(matches!(
                request.validate(1),
                Err(SignError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn test_page_placement() {
        let p = placement(3, 2).page_placement();
        assert_eq!(p.page, 2);
        assert_eq!(p.width, 0.2);
    }
}
