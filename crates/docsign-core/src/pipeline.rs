//! The sign pipeline: placeholder, detached signature, visual marks
//!
//! Credentials are opened once per request. Documents are then processed
//! one after another, each with its own buffer; a failing document reports
//! its own error and never affects its siblings.

use crate::error::{Result, SignError};
use crate::naming::output_name;
use crate::types::{DocumentInput, DocumentOutcome, Placement, SignatureRequest, SignedDocument};
use shared_crypto::pkcs12::{self, Pkcs12Credentials};
use shared_pdf::coords::normalized_to_pdf;
use shared_pdf::{
    annotate, inject_placeholder, sign, Caption, PdfDocument, PdfError, PlaceholderOptions,
    SigningContext, WidgetPlacement,
};

/// Sign every document with the key inside `container`.
///
/// The outer error is returned only when the request itself is unusable:
/// the credentials cannot be opened or a placement targets a document that
/// was not uploaded. Everything else is reported per document.
pub fn sign_documents(
    documents: &[DocumentInput],
    container: &[u8],
    password: &str,
    ctx: &SigningContext,
    request: &SignatureRequest,
) -> Result<Vec<DocumentOutcome>> {
    let pipeline = SigningPipeline::open(container, password, ctx.clone())?;
    pipeline.sign_all(documents, request)
}

/// Opened credentials plus the metadata shared by every document of a request
pub struct SigningPipeline {
    credentials: Pkcs12Credentials,
    context: SigningContext,
    options: PlaceholderOptions,
}

impl SigningPipeline {
    pub fn open(container: &[u8], password: &str, context: SigningContext) -> Result<Self> {
        let credentials = pkcs12::parse(container, password).map_err(SignError::Credentials)?;
        let options = PlaceholderOptions::for_credentials(&credentials).map_err(|e| match e {
            PdfError::Crypto(e) => SignError::Credentials(e),
            other => SignError::Config(other.to_string()),
        })?;

        tracing::debug!(
            chain_len = credentials.chain.len(),
            signature_capacity = options.signature_capacity,
            "opened signing credentials"
        );

        Ok(Self {
            credentials,
            context,
            options,
        })
    }

    /// Reserve a fixed slot size instead of one sized from the credentials
    pub fn with_signature_capacity(mut self, capacity: usize) -> Self {
        self.options = PlaceholderOptions::with_capacity(capacity);
        self
    }

    pub fn sign_all(
        &self,
        documents: &[DocumentInput],
        request: &SignatureRequest,
    ) -> Result<Vec<DocumentOutcome>> {
        request.validate(documents.len())?;

        let outcomes: Vec<DocumentOutcome> = documents
            .iter()
            .enumerate()
            .map(|(index, document)| {
                let placements: Vec<Placement> = request.for_document(index).copied().collect();
                self.sign_document(index, document, &placements)
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        tracing::info!(
            documents = documents.len(),
            failed,
            "sign request finished"
        );
        Ok(outcomes)
    }

    /// Run one document through the pipeline.
    ///
    /// The first placement also positions the signature widget; with no
    /// placements the widget gets a default rectangle on page 1 and no
    /// visual marks are drawn.
    pub fn sign_document(
        &self,
        index: usize,
        document: &DocumentInput,
        placements: &[Placement],
    ) -> DocumentOutcome {
        let result = self.run(document, placements);
        match result {
            Ok(signed) => {
                tracing::info!(
                    index,
                    name = %document.name,
                    marks = placements.len(),
                    size = signed.pdf.len(),
                    "signed document"
                );
                Ok(signed)
            }
            Err(source) => {
                tracing::warn!(index, name = %document.name, error = %source, "document failed");
                Err(SignError::Document { index, source })
            }
        }
    }

    fn run(
        &self,
        document: &DocumentInput,
        placements: &[Placement],
    ) -> std::result::Result<SignedDocument, PdfError> {
        let widget = match placements.first() {
            Some(first) => widget_for(&document.bytes, first)?,
            None => WidgetPlacement::default(),
        };

        let placeholder =
            inject_placeholder(&document.bytes, &self.context, &widget, &self.options)?;
        let signed = sign(
            placeholder,
            &self.credentials.identity,
            &self.credentials.chain,
        )?;

        let marks: Vec<_> = placements.iter().map(Placement::page_placement).collect();
        let caption = Caption::new(self.context.signer_name.clone(), signed.signed_at);
        let pdf = annotate(&signed.bytes, &marks, &caption)?;

        Ok(SignedDocument {
            pdf,
            original_name: document.name.clone(),
            output_name: output_name(&document.name, signed.signed_at),
        })
    }
}

/// Widget rectangle covering a normalized placement
fn widget_for(pdf: &[u8], placement: &Placement) -> std::result::Result<WidgetPlacement, PdfError> {
    let doc = PdfDocument::from_bytes(pdf)?;
    let media_box = doc.page_dimensions(placement.page)?;
    Ok(WidgetPlacement {
        page: placement.page,
        rect: normalized_to_pdf(
            placement.x,
            placement.y,
            placement.width,
            placement.height,
            media_box,
        ),
    })
}
