//! PDF attachment resolution shared by the email steps

use serde_json::Value;
use tracing::{debug, warn};

use super::rename::{RENAMED_FILENAME_KEY, RENAMED_PDF_FILENAME_KEY, render_filename};
use crate::domain::email::PdfAttachment;
use crate::domain::workflow::template::{has_placeholders, value_to_string};
use crate::domain::workflow::{
    AttachmentOptions, AttachmentSource, ExecutionContext, PdfEmailStrategy, WorkflowError,
};
use crate::infrastructure::pdf::extract_page;

const FALLBACK_FILENAME: &str = "document.pdf";

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn from_source(source: AttachmentSource, context: &ExecutionContext) -> Option<String> {
    let document = context.document();
    match source {
        AttachmentSource::RenamedPdfStep => [RENAMED_PDF_FILENAME_KEY, RENAMED_FILENAME_KEY]
            .into_iter()
            .find_map(|key| non_blank(context.get(key).and_then(Value::as_str))),
        AttachmentSource::TransformSetupPdf => {
            non_blank(document.transform_setup_filename.as_deref())
        }
        AttachmentSource::OriginalPdf => non_blank(Some(&document.filename)),
        AttachmentSource::ExtractionTypeFilename => {
            let template = non_blank(document.extraction_type_filename_template.as_deref())?;
            let rendered = render_filename(&template, context);
            if has_placeholders(&rendered) {
                warn!(filename = %rendered, "Extraction type filename left unresolved placeholders");
            }
            non_blank(Some(&rendered))
        }
    }
}

fn with_pdf_extension(name: String) -> String {
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name
    } else {
        format!("{}.pdf", name)
    }
}

/// Pick the attachment filename: the first source that yields a value,
/// otherwise the original filename.
pub fn attachment_filename(sources: &[AttachmentSource], context: &ExecutionContext) -> String {
    let chosen = sources
        .iter()
        .find_map(|source| from_source(*source, context).map(|name| (*source, name)));

    let name = match chosen {
        Some((source, name)) => {
            debug!(source = ?source, filename = %name, "Attachment filename selected");
            name
        }
        None => non_blank(Some(&context.document().filename))
            .unwrap_or_else(|| FALLBACK_FILENAME.to_string()),
    };

    with_pdf_extension(name)
}

fn page_number(raw: Option<&Value>, context: &ExecutionContext) -> Result<u32, WorkflowError> {
    let text = match raw {
        Some(Value::String(template)) => context.substitute(template),
        Some(other) => value_to_string(other).unwrap_or_default(),
        None => {
            return Err(WorkflowError::validation(
                "Page number is required for the specific page strategy",
            ));
        }
    };

    text.trim()
        .parse::<u32>()
        .map_err(|_| WorkflowError::validation(format!("Invalid page number '{}'", text)))
}

/// Build the PDF attachment, if the options ask for one.
///
/// A missing PDF is a warning, not an error: the email goes out without it.
pub fn resolve_attachment(
    options: &AttachmentOptions,
    context: &ExecutionContext,
) -> Result<Option<PdfAttachment>, WorkflowError> {
    if !options.attach_pdf {
        return Ok(None);
    }

    let Some(pdf) = context.document().pdf_base64.as_deref().filter(|p| !p.is_empty()) else {
        warn!("PDF attachment requested but no PDF content is available");
        return Ok(None);
    };

    let filename = attachment_filename(&options.attachment_sources, context);
    let content = match options.pdf_email_strategy {
        PdfEmailStrategy::AllPagesInGroup => pdf.to_string(),
        PdfEmailStrategy::SpecificPageInGroup => {
            let page = page_number(options.page_number.as_ref(), context)?;
            debug!(page = page, "Extracting single page for attachment");
            extract_page(pdf, page)?
        }
    };

    Ok(Some(PdfAttachment::new(filename, content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::SourceDocument;
    use crate::infrastructure::pdf::fixtures::pdf_with_pages;
    use crate::infrastructure::pdf::page_count;
    use serde_json::json;

    fn document() -> SourceDocument {
        let mut document = SourceDocument::new("upload.pdf");
        document.transform_setup_filename = Some("Setup".to_string());
        document
    }

    #[test]
    fn test_first_present_source_wins() {
        let ctx = ExecutionContext::from_value(json!({})).with_document(document());
        let sources = [
            AttachmentSource::RenamedPdfStep,
            AttachmentSource::TransformSetupPdf,
            AttachmentSource::OriginalPdf,
        ];
        assert_eq!(attachment_filename(&sources, &ctx), "Setup.pdf");

        let mut ctx = ctx;
        ctx.set(RENAMED_PDF_FILENAME_KEY, json!("INV-1.pdf"));
        assert_eq!(attachment_filename(&sources, &ctx), "INV-1.pdf");
    }

    #[test]
    fn test_fallback_is_original_filename() {
        let ctx = ExecutionContext::from_value(json!({})).with_document(document());
        assert_eq!(
            attachment_filename(&[AttachmentSource::ExtractionTypeFilename], &ctx),
            "upload.pdf"
        );
        assert_eq!(
            attachment_filename(&[], &ExecutionContext::default()),
            FALLBACK_FILENAME
        );
    }

    #[test]
    fn test_extraction_type_template_is_resolved() {
        let document = SourceDocument::new("a.pdf").with_extraction_type_template("Type-{{id}}");
        let ctx = ExecutionContext::from_value(json!({"id": "9"})).with_document(document);
        assert_eq!(
            attachment_filename(&[AttachmentSource::ExtractionTypeFilename], &ctx),
            "Type-9.pdf"
        );
    }

    #[test]
    fn test_disabled_or_missing_pdf() {
        let ctx = ExecutionContext::from_value(json!({})).with_document(document());
        assert!(resolve_attachment(&AttachmentOptions::default(), &ctx).unwrap().is_none());

        let options = AttachmentOptions {
            attach_pdf: true,
            ..Default::default()
        };
        assert!(resolve_attachment(&options, &ctx).unwrap().is_none());
    }

    #[test]
    fn test_whole_group_attached_unchanged() {
        let pdf = pdf_with_pages(2);
        let ctx = ExecutionContext::from_value(json!({}))
            .with_document(SourceDocument::new("a.pdf").with_pdf(pdf.clone()));
        let options = AttachmentOptions {
            attach_pdf: true,
            ..Default::default()
        };

        let attachment = resolve_attachment(&options, &ctx).unwrap().unwrap();
        assert_eq!(attachment.base64_content, pdf);
        assert_eq!(attachment.filename, "a.pdf");
    }

    #[test]
    fn test_specific_page_from_template() {
        let ctx = ExecutionContext::from_value(json!({"page": 2}))
            .with_document(SourceDocument::new("a.pdf").with_pdf(pdf_with_pages(3)));
        let options = AttachmentOptions {
            attach_pdf: true,
            pdf_email_strategy: PdfEmailStrategy::SpecificPageInGroup,
            page_number: Some(json!("{{page}}")),
            ..Default::default()
        };

        let attachment = resolve_attachment(&options, &ctx).unwrap().unwrap();
        assert_eq!(page_count(&attachment.base64_content).unwrap(), 1);
    }

    #[test]
    fn test_specific_page_out_of_range() {
        let ctx = ExecutionContext::from_value(json!({}))
            .with_document(SourceDocument::new("a.pdf").with_pdf(pdf_with_pages(3)));
        let options = AttachmentOptions {
            attach_pdf: true,
            pdf_email_strategy: PdfEmailStrategy::SpecificPageInGroup,
            page_number: Some(json!(5)),
            ..Default::default()
        };

        let err = resolve_attachment(&options, &ctx).unwrap_err();
        assert!(err.to_string().contains("between 1 and 3"));
    }
}
