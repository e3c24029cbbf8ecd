//! Incremental update serialization
//!
//! New and updated objects are appended after the existing bytes together
//! with a classic cross-reference section that covers only those objects.
//! The original bytes are never modified, so earlier signatures stay valid.

use crate::error::{PdfError, Result};
use crate::parser::PdfDocument;
use lopdf::{Dictionary, Object, ObjectId, StringFormat};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Trailer keys carried over from the previous revision
const CARRIED_TRAILER_KEYS: [&[u8]; 3] = [b"Root", b"Info", b"ID"];

/// One appended revision of a document
pub struct IncrementalUpdate {
    /// Absolute offset of the first appended byte
    base_offset: usize,
    /// Subtracted from absolute offsets in the xref and startxref
    header_offset: usize,
    separator: &'static [u8],
    prev_startxref: usize,
    trailer: Dictionary,
    next_number: u32,
    body: Vec<u8>,
    /// object number -> (generation, absolute offset)
    entries: BTreeMap<u32, (u16, usize)>,
}

impl IncrementalUpdate {
    pub fn new(pdf: &PdfDocument) -> Result<Self> {
        let bytes = pdf.bytes();
        let separator: &'static [u8] = match bytes.last() {
            Some(b'\n') | Some(b'\r') => b"",
            _ => b"\n",
        };

        let mut trailer = Dictionary::new();
        for key in CARRIED_TRAILER_KEYS {
            if let Ok(value) = pdf.trailer().get(key) {
                trailer.set(key.to_vec(), value.clone());
            }
        }

        Ok(Self {
            base_offset: bytes.len() + separator.len(),
            header_offset: pdf.header_offset(),
            separator,
            prev_startxref: pdf.startxref()?,
            trailer,
            next_number: pdf.next_object_number(),
            body: Vec::new(),
            entries: BTreeMap::new(),
        })
    }

    /// Reserve a fresh object ID
    pub fn allocate(&mut self) -> ObjectId {
        let id = (self.next_number, 0);
        self.next_number += 1;
        id
    }

    /// Absolute offset at which the next appended byte will land
    pub fn position(&self) -> usize {
        self.base_offset + self.body.len()
    }

    /// Append an object (new, or a new version of an existing one)
    pub fn write_object(&mut self, id: ObjectId, object: &Object) -> Result<usize> {
        let mut serialized = Vec::new();
        serialize_object(object, &mut serialized);
        self.write_raw(id, &serialized)
    }

    /// Append an object whose body is already serialized; returns the
    /// absolute offset of the body's first byte.
    pub fn write_raw(&mut self, id: ObjectId, body: &[u8]) -> Result<usize> {
        if self.entries.contains_key(&id.0) {
            return Err(PdfError::MalformedDocument(format!(
                "object {} written twice in one revision",
                id.0
            )));
        }
        self.entries.insert(id.0, (id.1, self.position()));

        self.body
            .extend_from_slice(format!("{} {} obj\n", id.0, id.1).as_bytes());
        let body_offset = self.position();
        self.body.extend_from_slice(body);
        self.body.extend_from_slice(b"\nendobj\n");
        Ok(body_offset)
    }

    /// Number of objects written so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append the revision to `base`, which must be the bytes the update was
    /// created from.
    pub fn finish(mut self, base: &[u8]) -> Vec<u8> {
        let xref_offset = self.position() - self.header_offset;

        let mut xref = String::from("xref\n");
        for (start, run) in subsections(&self.entries) {
            let _ = writeln!(xref, "{} {}", start, run.len());
            for (generation, offset) in run {
                let _ = write!(
                    xref,
                    "{:010} {:05} n \n",
                    offset - self.header_offset,
                    generation
                );
            }
        }

        self.trailer
            .set("Size", Object::Integer(self.next_number as i64));
        self.trailer
            .set("Prev", Object::Integer(self.prev_startxref as i64));

        let mut trailer = Vec::new();
        serialize_object(&Object::Dictionary(self.trailer), &mut trailer);

        let mut out = Vec::with_capacity(base.len() + self.body.len() + xref.len() + 256);
        out.extend_from_slice(base);
        out.extend_from_slice(self.separator);
        out.extend_from_slice(&self.body);
        out.extend_from_slice(xref.as_bytes());
        out.extend_from_slice(b"trailer\n");
        out.extend_from_slice(&trailer);
        out.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());

        tracing::debug!(
            objects = self.entries.len(),
            appended = out.len() - base.len(),
            "wrote incremental update"
        );
        out
    }
}

/// Group entries into runs of consecutive object numbers
fn subsections(entries: &BTreeMap<u32, (u16, usize)>) -> Vec<(u32, Vec<(u16, usize)>)> {
    let mut runs: Vec<(u32, Vec<(u16, usize)>)> = Vec::new();
    for (&number, &entry) in entries {
        match runs.last_mut() {
            Some((start, run)) if *start + run.len() as u32 == number => run.push(entry),
            _ => runs.push((number, vec![entry])),
        }
    }
    runs
}

/// Serialize a lopdf object in PDF syntax
pub fn serialize_object(object: &Object, out: &mut Vec<u8>) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(r) => out.extend_from_slice(format_number(*r as f64).as_bytes()),
        Object::Name(name) => write_name(name, out),
        Object::String(bytes, StringFormat::Literal) => write_literal_string(bytes, out),
        Object::String(bytes, StringFormat::Hexadecimal) => {
            out.push(b'<');
            out.extend_from_slice(hex::encode_upper(bytes).as_bytes());
            out.push(b'>');
        }
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                serialize_object(item, out);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(dict, out),
        Object::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.set("Length", Object::Integer(stream.content.len() as i64));
            write_dictionary(&dict, out);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference((number, generation)) => {
            out.extend_from_slice(format!("{} {} R", number, generation).as_bytes());
        }
    }
}

fn write_dictionary(dict: &Dictionary, out: &mut Vec<u8>) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b' ');
        write_name(key, out);
        out.push(b' ');
        serialize_object(value, out);
    }
    out.extend_from_slice(b" >>");
}

fn write_name(name: &[u8], out: &mut Vec<u8>) {
    out.push(b'/');
    for &b in name {
        let regular = b.is_ascii_graphic() && !b"()<>[]{}/%#".contains(&b);
        if regular {
            out.push(b);
        } else {
            out.extend_from_slice(format!("#{:02X}", b).as_bytes());
        }
    }
}

fn write_literal_string(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

/// Format a number the way PDF operands are usually written: at most four
/// decimals, no trailing zeros, no exponent.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{:.4}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Text string object: literal when ASCII, UTF-16BE with BOM otherwise
pub fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}
