//! Signature placeholder injection
//!
//! Appends, as one incremental update:
//! - a signature dictionary with a fixed-width /ByteRange and a zeroed hex
//!   /Contents slot
//! - a merged signature field / widget annotation with an empty appearance
//! - a new version of the target page (or of its /Annots array)
//! - a new version of the AcroForm (or of the catalog)
//!
//! The /ByteRange is patched in place once the final layout is known.

use crate::byterange::{self, calculate_byte_range, patch_byte_range, validate_byte_range};
use crate::context::SigningContext;
use crate::coords::PdfRect;
use crate::error::{PdfError, Result};
use crate::parser::PdfDocument;
use crate::writer::{serialize_object, text_string, IncrementalUpdate};
use chrono::{DateTime, Utc};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream, StringFormat};
use shared_crypto::{Pkcs12Credentials, SigningIdentity};
use uuid::Uuid;

/// Bytes reserved for the DER signature unless the caller knows better
pub const DEFAULT_SIGNATURE_CAPACITY: usize = 8192;

/// Smallest slot that can hold any RSA-2048 SignedData with a certificate
pub const MIN_SIGNATURE_CAPACITY: usize = 1024;

const CAPACITY_STEP: usize = 1024;

/// Annotation flags: Print | Locked
const WIDGET_FLAGS: i64 = 132;

/// AcroForm /SigFlags: SignaturesExist | AppendOnly
const SIG_FLAGS: i64 = 3;

/// How much room to reserve for the signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderOptions {
    /// Capacity of the /Contents slot in bytes of DER (the slot holds twice
    /// as many hex digits)
    pub signature_capacity: usize,
}

impl Default for PlaceholderOptions {
    fn default() -> Self {
        Self {
            signature_capacity: DEFAULT_SIGNATURE_CAPACITY,
        }
    }
}

impl PlaceholderOptions {
    pub fn with_capacity(signature_capacity: usize) -> Self {
        Self { signature_capacity }
    }

    /// Capacity sized from the certificate chain and key that will sign
    pub fn for_credentials(credentials: &Pkcs12Credentials) -> Result<Self> {
        let bound = shared_crypto::cms::max_signature_len(
            &credentials.chain,
            credentials.identity.signature_len(),
        )?;
        let capacity = bound.div_ceil(CAPACITY_STEP) * CAPACITY_STEP;
        Ok(Self {
            signature_capacity: capacity.max(MIN_SIGNATURE_CAPACITY),
        })
    }
}

/// Where the signature widget goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetPlacement {
    /// 1-based page number
    pub page: u32,
    pub rect: PdfRect,
}

impl Default for WidgetPlacement {
    fn default() -> Self {
        Self {
            page: 1,
            rect: PdfRect::new(50.0, 50.0, 200.0, 50.0),
        }
    }
}

/// A document with an unsigned signature slot
#[derive(Debug, Clone)]
pub struct PlaceholderPdf {
    pub bytes: Vec<u8>,
    pub byte_range: [usize; 4],
    /// Offset of the `<` opening the slot
    pub contents_offset: usize,
    /// Slot length including `<` and `>`
    pub slot_len: usize,
    /// Value of the field's /T
    pub field_name: String,
}

impl PlaceholderPdf {
    /// Largest DER signature the slot can hold
    pub fn capacity(&self) -> usize {
        self.slot_len.saturating_sub(2) / 2
    }
}

/// Inject an empty signature field into `pdf`.
pub fn inject_placeholder(
    pdf: &[u8],
    ctx: &SigningContext,
    widget: &WidgetPlacement,
    options: &PlaceholderOptions,
) -> Result<PlaceholderPdf> {
    if options.signature_capacity < MIN_SIGNATURE_CAPACITY {
        return Err(PdfError::PlaceholderTooSmall {
            capacity: options.signature_capacity,
            minimum: MIN_SIGNATURE_CAPACITY,
        });
    }

    let doc = PdfDocument::from_bytes(pdf)?;
    let page_id = doc.page_id(widget.page)?;

    let mut update = IncrementalUpdate::new(&doc)?;
    let sig_id = update.allocate();
    let field_id = update.allocate();
    let appearance_id = update.allocate();

    let field_name = format!("Signature-{}", Uuid::new_v4().simple());

    // Signature dictionary, serialized by hand so the slot offsets are known
    let sig_dict = SignatureDictionary::new(ctx, options.signature_capacity, Utc::now());
    let body_offset = update.write_raw(sig_id, &sig_dict.bytes)?;
    let byte_range_offset = body_offset + sig_dict.byte_range_at;
    let contents_offset = body_offset + sig_dict.contents_at;

    update.write_object(appearance_id, &empty_appearance(&widget.rect))?;

    let field = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Sig",
        "Rect" => rect_array(&widget.rect),
        "V" => Object::Reference(sig_id),
        "T" => text_string(&field_name),
        "F" => WIDGET_FLAGS,
        "P" => Object::Reference(page_id),
        "AP" => dictionary! { "N" => Object::Reference(appearance_id) },
    };
    update.write_object(field_id, &Object::Dictionary(field))?;

    append_page_annotations(&doc, &mut update, page_id, &[field_id])?;
    add_to_acroform(&doc, &mut update, field_id)?;

    let mut bytes = update.finish(doc.bytes());

    let slot_len = sig_dict.slot_len;
    let byte_range = calculate_byte_range(bytes.len(), contents_offset, slot_len);
    patch_byte_range(&mut bytes, byte_range_offset, &byte_range)?;
    validate_byte_range(&bytes, &byte_range)?;

    tracing::debug!(
        page = widget.page,
        capacity = options.signature_capacity,
        size = bytes.len(),
        field = %field_name,
        "injected signature placeholder"
    );

    Ok(PlaceholderPdf {
        bytes,
        byte_range,
        contents_offset,
        slot_len,
        field_name,
    })
}

/// Serialized signature dictionary plus the positions patched later
struct SignatureDictionary {
    bytes: Vec<u8>,
    byte_range_at: usize,
    contents_at: usize,
    slot_len: usize,
}

impl SignatureDictionary {
    fn new(ctx: &SigningContext, capacity: usize, signing_time: DateTime<Utc>) -> Self {
        let mut bytes =
            b"<< /Type /Sig /Filter /Adobe.PPKLite /SubFilter /adbe.pkcs7.detached /ByteRange "
                .to_vec();

        let byte_range_at = bytes.len();
        bytes.extend_from_slice(byterange::placeholder().as_bytes());

        bytes.extend_from_slice(b" /Contents ");
        let contents_at = bytes.len();
        bytes.push(b'<');
        bytes.resize(bytes.len() + capacity * 2, b'0');
        bytes.push(b'>');
        let slot_len = bytes.len() - contents_at;

        for (key, value) in [
            ("Reason", &ctx.reason),
            ("Name", &ctx.signer_name),
            ("ContactInfo", &ctx.contact_info),
            ("Location", &ctx.location),
        ] {
            bytes.extend_from_slice(format!(" /{} ", key).as_bytes());
            serialize_object(&text_string(value), &mut bytes);
        }

        bytes.extend_from_slice(b" /M ");
        serialize_object(
            &Object::String(pdf_date(signing_time).into_bytes(), StringFormat::Literal),
            &mut bytes,
        );
        bytes.extend_from_slice(b" >>");

        Self {
            bytes,
            byte_range_at,
            contents_at,
            slot_len,
        }
    }
}

/// PDF date string, e.g. `D:20260301100000+00'00'`
pub fn pdf_date(at: DateTime<Utc>) -> String {
    at.format("D:%Y%m%d%H%M%S+00'00'").to_string()
}

pub(crate) fn rect_array(rect: &PdfRect) -> Object {
    Object::Array(
        rect.corners()
            .iter()
            .map(|&v| Object::Real(v as f32))
            .collect(),
    )
}

fn empty_appearance(rect: &PdfRect) -> Object {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![
            0.into(),
            0.into(),
            Object::Real(rect.width as f32),
            Object::Real(rect.height as f32),
        ],
    };
    Object::Stream(Stream::new(dict, Vec::new()))
}

/// Add annotation references to a page's /Annots.
///
/// An indirect /Annots array gets a new version of its own; otherwise the
/// page itself is rewritten.
pub(crate) fn append_page_annotations(
    doc: &PdfDocument,
    update: &mut IncrementalUpdate,
    page_id: ObjectId,
    annotations: &[ObjectId],
) -> Result<()> {
    let mut page = doc.page_dict(page_id)?.clone();
    let new_refs = annotations.iter().map(|&id| Object::Reference(id));

    match page.get(b"Annots") {
        Ok(Object::Reference(annots_id)) => {
            let annots_id = *annots_id;
            let mut annots = doc
                .object(annots_id)?
                .as_array()
                .map_err(|_| PdfError::MalformedDocument("/Annots is not an array".to_string()))?
                .clone();
            annots.extend(new_refs);
            update.write_object(annots_id, &Object::Array(annots))?;
        }
        Ok(Object::Array(existing)) => {
            let mut annots = existing.clone();
            annots.extend(new_refs);
            page.set("Annots", Object::Array(annots));
            update.write_object(page_id, &Object::Dictionary(page))?;
        }
        Ok(_) => {
            return Err(PdfError::MalformedDocument(
                "/Annots is not an array".to_string(),
            ))
        }
        Err(_) => {
            page.set("Annots", Object::Array(new_refs.collect()));
            update.write_object(page_id, &Object::Dictionary(page))?;
        }
    }
    Ok(())
}

/// Register the field in the interactive form, creating it if needed
fn add_to_acroform(doc: &PdfDocument, update: &mut IncrementalUpdate, field_id: ObjectId) -> Result<()> {
    let catalog_id = doc.catalog_id()?;
    let mut catalog = doc.catalog()?.clone();

    match catalog.get(b"AcroForm") {
        Ok(Object::Reference(acroform_id)) => {
            let acroform_id = *acroform_id;
            let mut acroform = doc.dict(acroform_id)?.clone();
            append_field(doc, update, &mut acroform, field_id)?;
            update.write_object(acroform_id, &Object::Dictionary(acroform))?;
        }
        Ok(Object::Dictionary(direct)) => {
            let mut acroform = direct.clone();
            append_field(doc, update, &mut acroform, field_id)?;
            catalog.set("AcroForm", Object::Dictionary(acroform));
            update.write_object(catalog_id, &Object::Dictionary(catalog))?;
        }
        Ok(_) => {
            return Err(PdfError::MalformedDocument(
                "/AcroForm is not a dictionary".to_string(),
            ))
        }
        Err(_) => {
            let acroform_id = update.allocate();
            let acroform = dictionary! {
                "Fields" => vec![Object::Reference(field_id)],
                "SigFlags" => SIG_FLAGS,
            };
            update.write_object(acroform_id, &Object::Dictionary(acroform))?;
            catalog.set("AcroForm", Object::Reference(acroform_id));
            update.write_object(catalog_id, &Object::Dictionary(catalog))?;
        }
    }
    Ok(())
}

fn append_field(
    doc: &PdfDocument,
    update: &mut IncrementalUpdate,
    acroform: &mut Dictionary,
    field_id: ObjectId,
) -> Result<()> {
    match acroform.get(b"Fields") {
        Ok(Object::Reference(fields_id)) => {
            let fields_id = *fields_id;
            let mut fields = doc
                .object(fields_id)?
                .as_array()
                .map_err(|_| PdfError::MalformedDocument("/Fields is not an array".to_string()))?
                .clone();
            fields.push(Object::Reference(field_id));
            update.write_object(fields_id, &Object::Array(fields))?;
        }
        Ok(Object::Array(existing)) => {
            let mut fields = existing.clone();
            fields.push(Object::Reference(field_id));
            acroform.set("Fields", Object::Array(fields));
        }
        _ => acroform.set("Fields", Object::Array(vec![Object::Reference(field_id)])),
    }
    acroform.set("SigFlags", Object::Integer(SIG_FLAGS));
    Ok(())
}
