//! Fixtures shared by the integration tests

#![allow(dead_code)]

use docsign_core::provision::issue_and_package_with;
use docsign_core::{DocumentInput, Placement, SigningContext, SubjectAttributes};
use lopdf::{dictionary, Document, Object, Stream};
use std::sync::OnceLock;

pub const PASSWORD: &str = "64f1c0ffee";

pub fn subject() -> SubjectAttributes {
    SubjectAttributes {
        common_name: "Integration Signer".to_string(),
        country: "SI".to_string(),
        state: "Osrednjeslovenska".to_string(),
        locality: "Ljubljana".to_string(),
        organization: "Example d.o.o.".to_string(),
        organizational_unit: "Legal".to_string(),
        uri: "https://sign.example.com".to_string(),
    }
}

/// One container per test binary
pub fn container() -> &'static [u8] {
    static CONTAINER: OnceLock<Vec<u8>> = OnceLock::new();
    CONTAINER.get_or_init(|| {
        issue_and_package_with(&subject(), PASSWORD, 64).expect("provision test credentials")
    })
}

pub fn context() -> SigningContext {
    SigningContext::for_signer(Some("Jane Doe"), Some("jane@example.com"), &subject())
}

/// Letter-size document with `pages` pages
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for n in 0..pages {
        let content = format!("BT /F1 18 Tf 72 720 Td (Contract page {}) Tj ET", n + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("save sample pdf");
    buffer
}

pub fn document(name: &str, pages: usize) -> DocumentInput {
    DocumentInput::new(name, sample_pdf(pages))
}

pub fn placement(document: usize, page: u32) -> Placement {
    Placement {
        document,
        page,
        x: 0.1,
        y: 0.1,
        width: 0.2,
        height: 0.05,
    }
}

pub fn number(obj: &Object) -> f64 {
    match obj {
        Object::Integer(i) => *i as f64,
        Object::Real(r) => *r as f64,
        other => panic!("not a number: {:?}", other),
    }
}

/// Dictionaries of the latest revision whose /Subtype is `subtype`
pub fn annotations(pdf: &[u8], subtype: &[u8]) -> Vec<lopdf::Dictionary> {
    let doc = Document::load_mem(pdf).expect("load signed pdf");
    doc.objects
        .values()
        .filter_map(|o| o.as_dict().ok())
        .filter(|d| {
            d.get(b"Subtype")
                .and_then(Object::as_name)
                .map(|n| n == subtype)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}
