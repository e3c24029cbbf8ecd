//! PDF parsing using lopdf
//!
//! Parsing is read-only: lopdf resolves the object graph, while the raw
//! bytes are kept so incremental updates can be appended to them verbatim.

use crate::error::{PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Letter size, used when no MediaBox is found anywhere in the page tree
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Guard against cyclic /Parent chains
const MAX_TREE_DEPTH: usize = 64;

/// Readers accept the header anywhere in the first 1024 bytes
const HEADER_SEARCH_LEN: usize = 1024;

/// Parsed view of a PDF together with its original bytes
pub struct PdfDocument {
    pub(crate) doc: Document,
    pub(crate) bytes: Vec<u8>,
    /// Bytes before `%PDF-`; xref offsets count from the header
    pub(crate) header_offset: usize,
}

impl PdfDocument {
    /// Load a PDF from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header_offset = find_header(bytes).ok_or_else(|| {
            PdfError::MalformedDocument("missing %PDF- header".to_string())
        })?;

        let doc = Document::load_mem(&bytes[header_offset..])
            .map_err(|e| PdfError::MalformedDocument(format!("PDF parse error: {}", e)))?;
        if doc.is_encrypted() {
            return Err(PdfError::MalformedDocument(
                "encrypted documents cannot be signed".to_string(),
            ));
        }
        if header_offset > 0 {
            tracing::debug!(header_offset, "PDF header follows leading bytes");
        }

        let pdf = Self {
            doc,
            bytes: bytes.to_vec(),
            header_offset,
        };
        // Fail early on documents we could never append to
        pdf.startxref()?;
        pdf.catalog_id()?;
        Ok(pdf)
    }

    /// Get the raw bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn header_offset(&self) -> usize {
        self.header_offset
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Get the number of pages
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Get page object ID for a given page number (1-indexed)
    pub fn page_id(&self, page_num: u32) -> Result<ObjectId> {
        self.doc
            .get_pages()
            .get(&page_num)
            .copied()
            .ok_or(PdfError::PageOutOfRange {
                page: page_num,
                page_count: self.page_count(),
            })
    }

    /// Page dictionary for a page object ID
    pub fn page_dict(&self, page_id: ObjectId) -> Result<&Dictionary> {
        self.dict(page_id)
    }

    /// Get page dimensions (MediaBox) as [x, y, width, height]
    pub fn page_dimensions(&self, page_num: u32) -> Result<[f64; 4]> {
        let page_id = self.page_id(page_num)?;
        let mut dict = self.dict(page_id)?;

        // MediaBox is inheritable through the page tree
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(media_box) = dict.get(b"MediaBox") {
                return self.parse_rect(media_box);
            }
            match dict.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent_id) => dict = self.dict(parent_id)?,
                Err(_) => break,
            }
        }

        Ok(DEFAULT_MEDIA_BOX)
    }

    /// ID of the document catalog (trailer /Root)
    pub fn catalog_id(&self) -> Result<ObjectId> {
        self.doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|_| PdfError::MalformedDocument("trailer has no /Root".to_string()))
    }

    pub fn catalog(&self) -> Result<&Dictionary> {
        self.dict(self.catalog_id()?)
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.doc.trailer
    }

    /// Look up an object by ID
    pub fn object(&self, id: ObjectId) -> Result<&Object> {
        Ok(self.doc.get_object(id)?)
    }

    /// Look up a dictionary object by ID
    pub fn dict(&self, id: ObjectId) -> Result<&Dictionary> {
        self.object(id)?.as_dict().map_err(|_| {
            PdfError::MalformedDocument(format!("object {} {} R is not a dictionary", id.0, id.1))
        })
    }

    /// Follow a reference; direct objects are returned as-is
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> Result<&'a Object> {
        match obj {
            Object::Reference(id) => self.object(*id),
            other => Ok(other),
        }
    }

    /// First object number not used by any existing revision
    pub fn next_object_number(&self) -> u32 {
        let size = self
            .doc
            .trailer
            .get(b"Size")
            .and_then(Object::as_i64)
            .ok()
            .and_then(|size| u32::try_from(size).ok())
            .unwrap_or(0);
        size.max(self.doc.max_id + 1)
    }

    /// Byte offset of the last cross-reference section
    pub fn startxref(&self) -> Result<usize> {
        let marker = find_last_occurrence(&self.bytes, b"startxref").ok_or_else(|| {
            PdfError::MalformedDocument("no startxref marker found".to_string())
        })?;

        let digits: String = self.bytes[marker + b"startxref".len()..]
            .iter()
            .skip_while(|b| b.is_ascii_whitespace())
            .take_while(|b| b.is_ascii_digit())
            .map(|&b| b as char)
            .collect();

        digits
            .parse()
            .map_err(|_| PdfError::MalformedDocument("startxref has no offset".to_string()))
    }

    /// Parse a PDF rectangle array into [x, y, width, height]
    pub(crate) fn parse_rect(&self, obj: &Object) -> Result<[f64; 4]> {
        let arr = self.resolve(obj)?.as_array().map_err(|_| {
            PdfError::MalformedDocument("rectangle is not an array".to_string())
        })?;

        if arr.len() != 4 {
            return Err(PdfError::MalformedDocument(format!(
                "rectangle has {} elements, expected 4",
                arr.len()
            )));
        }

        let mut values = [0.0f64; 4];
        for (i, obj) in arr.iter().enumerate() {
            values[i] = self.extract_number(obj)?;
        }

        // Normalize [x1, y1, x2, y2] into [x, y, width, height]
        let (x1, x2) = (values[0].min(values[2]), values[0].max(values[2]));
        let (y1, y2) = (values[1].min(values[3]), values[1].max(values[3]));
        Ok([x1, y1, x2 - x1, y2 - y1])
    }

    /// Extract a number from a PDF object
    pub(crate) fn extract_number(&self, obj: &Object) -> Result<f64> {
        match self.resolve(obj)? {
            Object::Integer(i) => Ok(*i as f64),
            Object::Real(r) => Ok(*r as f64),
            _ => Err(PdfError::MalformedDocument(
                "expected number".to_string(),
            )),
        }
    }
}

fn find_header(bytes: &[u8]) -> Option<usize> {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_LEN + b"%PDF-".len())];
    window.windows(b"%PDF-".len()).position(|w| w == b"%PDF-")
}

/// Find the last occurrence of a pattern in bytes
pub fn find_last_occurrence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let len = needle.len();
    if len == 0 || len > haystack.len() {
        return None;
    }

    (0..=(haystack.len() - len))
        .rev()
        .find(|&i| &haystack[i..i + len] == needle)
}
