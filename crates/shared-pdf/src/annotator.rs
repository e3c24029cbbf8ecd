//! Visual signature marks
//!
//! Each placement becomes a print-flagged /Stamp annotation whose appearance
//! stream draws a bordered box with a two-line caption. The annotations are
//! appended as a further incremental update, so the signed revision stays
//! byte-identical and its signature keeps verifying.

use crate::coords::{normalized_to_pdf, PdfRect};
use crate::error::Result;
use crate::parser::PdfDocument;
use crate::placeholder::{append_page_annotations, rect_array};
use crate::writer::{format_number, text_string, IncrementalUpdate};
use chrono::{DateTime, Utc};
use lopdf::{dictionary, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Border colour, rgb(13, 110, 253)
const BORDER_RGB: [u8; 3] = [13, 110, 253];
/// Box fill, rgb(128, 128, 128)
const FILL_RGB: [u8; 3] = [128, 128, 128];
/// Caption colour, rgb(255, 110, 253)
const TEXT_RGB: [u8; 3] = [255, 110, 253];

const BORDER_WIDTH: f64 = 1.0;
const FONT_SIZE: f64 = 10.0;
const LINE_HEIGHT: f64 = 12.0;
const TEXT_INSET_X: f64 = 5.0;
const TEXT_INSET_TOP: f64 = 10.0;

const CAPTION_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Print flag
const STAMP_FLAGS: i64 = 4;

/// A mark on one page, in fractions of the page size (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePlacement {
    /// 1-based page number
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Text drawn inside every mark
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub signer_name: String,
    pub signed_at: DateTime<Utc>,
}

impl Caption {
    pub fn new(signer_name: impl Into<String>, signed_at: DateTime<Utc>) -> Self {
        Self {
            signer_name: signer_name.into(),
            signed_at,
        }
    }

    pub fn lines(&self) -> [String; 2] {
        [
            format!("Signed by {}", self.signer_name),
            format!("at {}", self.signed_at.format(CAPTION_TIME_FORMAT)),
        ]
    }
}

/// Draw one mark per placement onto a signed document.
///
/// All pages are resolved before anything is written: a placement on a
/// missing page fails the whole document.
pub fn annotate(signed: &[u8], placements: &[PagePlacement], caption: &Caption) -> Result<Vec<u8>> {
    if placements.is_empty() {
        return Ok(signed.to_vec());
    }

    let doc = PdfDocument::from_bytes(signed)?;

    let mut resolved = Vec::with_capacity(placements.len());
    for placement in placements {
        let page_id = doc.page_id(placement.page)?;
        let media_box = doc.page_dimensions(placement.page)?;
        let rect = normalized_to_pdf(
            placement.x,
            placement.y,
            placement.width,
            placement.height,
            media_box,
        );
        resolved.push((page_id, rect));
    }

    let mut update = IncrementalUpdate::new(&doc)?;
    let mut by_page: BTreeMap<ObjectId, Vec<ObjectId>> = BTreeMap::new();
    let lines = caption.lines();

    for (page_id, rect) in &resolved {
        let appearance_id = update.allocate();
        update.write_object(appearance_id, &appearance_stream(rect, &lines))?;

        let stamp_id = update.allocate();
        let stamp = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Stamp",
            "Rect" => rect_array(rect),
            "F" => STAMP_FLAGS,
            "P" => Object::Reference(*page_id),
            "Contents" => text_string(&lines.join(" ")),
            "AP" => dictionary! { "N" => Object::Reference(appearance_id) },
        };
        update.write_object(stamp_id, &Object::Dictionary(stamp))?;

        by_page.entry(*page_id).or_default().push(stamp_id);
    }

    for (page_id, stamps) in &by_page {
        append_page_annotations(&doc, &mut update, *page_id, stamps)?;
    }

    tracing::debug!(
        marks = resolved.len(),
        pages = by_page.len(),
        "appended visual signature marks"
    );

    Ok(update.finish(doc.bytes()))
}

/// Form XObject drawing the box and the caption
fn appearance_stream(rect: &PdfRect, lines: &[String; 2]) -> Object {
    let width = rect.width.abs();
    let height = rect.height.abs();
    let inset = BORDER_WIDTH / 2.0;

    let content = format!(
        "q\n\
{fill} rg\n\
{border} RG\n\
{bw} w\n\
{inset} {inset} {w} {h} re B\n\
Q\n\
q\n\
BT\n\
/F1 {fs} Tf\n\
{text} rg\n\
{lh} TL\n\
{tx} {ty} Td\n\
({line1}) Tj\n\
T*\n\
({line2}) Tj\n\
ET\n\
Q",
        fill = rgb_operands(FILL_RGB),
        border = rgb_operands(BORDER_RGB),
        bw = format_number(BORDER_WIDTH),
        inset = format_number(inset),
        w = format_number((width - BORDER_WIDTH).max(0.0)),
        h = format_number((height - BORDER_WIDTH).max(0.0)),
        fs = format_number(FONT_SIZE),
        text = rgb_operands(TEXT_RGB),
        lh = format_number(LINE_HEIGHT),
        tx = format_number(TEXT_INSET_X),
        ty = format_number(height - TEXT_INSET_TOP),
        line1 = escape_content_text(&lines[0]),
        line2 = escape_content_text(&lines[1]),
    );

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![
            0.into(),
            0.into(),
            Object::Real(width as f32),
            Object::Real(height as f32),
        ],
        "Resources" => dictionary! {
            "Font" => dictionary! {
                "F1" => dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica",
                    "Encoding" => "WinAnsiEncoding",
                },
            },
        },
    };

    Object::Stream(Stream::new(dict, content.into_bytes()))
}

/// `r g b` operands scaled to [0, 1]
fn rgb_operands(rgb: [u8; 3]) -> String {
    rgb.iter()
        .map(|&c| format_number(c as f64 / 255.0))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape text for a literal string in a content stream; characters outside
/// Latin-1 become `?`
fn escape_content_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c if (c as u32) >= 0xA0 && (c as u32) <= 0xFF => {
                out.push_str(&format!("\\{:03o}", c as u32));
            }
            _ => out.push('?'),
        }
    }
    out
}
