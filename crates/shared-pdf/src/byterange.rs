//! ByteRange handling for PDF signatures.
//!
//! The ByteRange is an array of four integers
//! `[offset1, length1, offset2, length2]`:
//! - `offset1` = 0 (start of file)
//! - `length1` = byte offset of the `<` opening the signature value
//! - `offset2` = byte offset just past the closing `>`
//! - `length2` = remaining bytes to end of file
//!
//! Everything outside the gap is signed; the gap is exactly the hex slot.

use crate::error::{PdfError, Result};
use lopdf::Object;
use sha2::{Digest, Sha256};

/// Width every ByteRange placeholder number is reserved with
pub const BYTE_RANGE_DIGITS: usize = 10;

/// Format a ByteRange array as a PDF array string.
pub fn format_byte_range(byte_range: &[usize; 4]) -> String {
    format!(
        "[{} {} {} {}]",
        byte_range[0], byte_range[1], byte_range[2], byte_range[3]
    )
}

/// Placeholder written before the final layout is known
pub fn placeholder() -> String {
    let wide = "9".repeat(BYTE_RANGE_DIGITS);
    format!("[0 {} {} {}]", wide, wide, wide)
}

/// Overwrite the placeholder at `offset` with the real values, padding
/// with spaces so no byte moves.
pub fn patch_byte_range(pdf: &mut [u8], offset: usize, byte_range: &[usize; 4]) -> Result<()> {
    let width = placeholder().len();
    let formatted = format_byte_range(byte_range);

    if offset + width > pdf.len() || pdf[offset] != b'[' {
        return Err(PdfError::InvalidByteRange(
            "no ByteRange placeholder at the recorded offset".to_string(),
        ));
    }
    if formatted.len() > width {
        return Err(PdfError::InvalidByteRange(format!(
            "ByteRange {} does not fit the placeholder",
            formatted
        )));
    }

    let slot = &mut pdf[offset..offset + width];
    slot.fill(b' ');
    slot[..formatted.len()].copy_from_slice(formatted.as_bytes());
    Ok(())
}

/// ByteRange for a slot of `slot_len` bytes starting at `contents_offset`
pub fn calculate_byte_range(file_size: usize, contents_offset: usize, slot_len: usize) -> [usize; 4] {
    let after_slot = contents_offset + slot_len;
    [0, contents_offset, after_slot, file_size.saturating_sub(after_slot)]
}

/// Read a /ByteRange array
pub fn parse_byte_range(obj: &Object) -> Result<[usize; 4]> {
    let arr = obj
        .as_array()
        .map_err(|_| PdfError::InvalidByteRange("ByteRange is not an array".to_string()))?;
    if arr.len() != 4 {
        return Err(PdfError::InvalidByteRange(format!(
            "ByteRange has {} elements, expected 4",
            arr.len()
        )));
    }

    let mut values = [0usize; 4];
    for (i, item) in arr.iter().enumerate() {
        let value = item
            .as_i64()
            .map_err(|_| PdfError::InvalidByteRange("ByteRange entry is not an integer".to_string()))?;
        values[i] = usize::try_from(value)
            .map_err(|_| PdfError::InvalidByteRange(format!("negative ByteRange entry {}", value)))?;
    }
    Ok(values)
}

/// Check that a ByteRange covers the whole document except one hex slot.
///
/// A valid ByteRange starts at 0, ends at the file size, and leaves a gap
/// delimited by `<` and `>`.
pub fn validate_byte_range(pdf: &[u8], byte_range: &[usize; 4]) -> Result<()> {
    validate_prefix(pdf, byte_range)?;

    let end = byte_range[2] + byte_range[3];
    if end != pdf.len() {
        return Err(PdfError::InvalidByteRange(format!(
            "ByteRange must end at file size {}, got {}",
            pdf.len(),
            end
        )));
    }
    Ok(())
}

/// Like [`validate_byte_range`] but allows later revisions after the signed range
pub fn validate_prefix(pdf: &[u8], byte_range: &[usize; 4]) -> Result<()> {
    let [offset1, length1, offset2, length2] = *byte_range;

    if offset1 != 0 {
        return Err(PdfError::InvalidByteRange(format!(
            "ByteRange must start at 0, got {}",
            offset1
        )));
    }
    if length1 >= offset2 {
        return Err(PdfError::InvalidByteRange(format!(
            "first range ({}) overlaps the second range start ({})",
            length1, offset2
        )));
    }
    if offset2.checked_add(length2).map_or(true, |end| end > pdf.len()) {
        return Err(PdfError::InvalidByteRange(format!(
            "second range exceeds file size: {} + {} > {}",
            offset2,
            length2,
            pdf.len()
        )));
    }
    if pdf[length1] != b'<' || pdf[offset2 - 1] != b'>' {
        return Err(PdfError::InvalidByteRange(
            "gap is not a hex string slot".to_string(),
        ));
    }
    Ok(())
}

/// SHA-256 over the two signed ranges
pub fn digest(pdf: &[u8], byte_range: &[usize; 4]) -> Result<[u8; 32]> {
    validate_prefix(pdf, byte_range)?;
    let [offset1, length1, offset2, length2] = *byte_range;

    let mut hasher = Sha256::new();
    hasher.update(&pdf[offset1..offset1 + length1]);
    hasher.update(&pdf[offset2..offset2 + length2]);
    Ok(hasher.finalize().into())
}

/// Decode the signature bytes stored in the gap (padding included)
pub fn slot_contents(pdf: &[u8], byte_range: &[usize; 4]) -> Result<Vec<u8>> {
    validate_prefix(pdf, byte_range)?;
    let hex_digits = &pdf[byte_range[1] + 1..byte_range[2] - 1];
    let filtered: Vec<u8> = hex_digits
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    hex::decode(filtered)
        .map_err(|e| PdfError::InvalidByteRange(format!("slot is not hex: {}", e)))
}
