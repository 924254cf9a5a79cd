//! The source document a workflow run operates on

use serde::{Deserialize, Serialize};

/// Output file types a run can produce
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Csv,
    Json,
    Xml,
}

impl OutputFormat {
    /// Fallback order used when picking a primary filename
    pub const PRECEDENCE: [OutputFormat; 4] = [
        OutputFormat::Pdf,
        OutputFormat::Json,
        OutputFormat::Csv,
        OutputFormat::Xml,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// The PDF (or page group of a split PDF) being processed, with the
/// extraction-type settings that steps consult.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    /// Original uploaded filename, e.g. `statement.pdf`
    pub filename: String,

    /// Base64 content of the grouped PDF
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_base64: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_type_id: Option<String>,

    /// User that submitted the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Output format configured on the extraction type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_type: Option<OutputFormat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_group_filename_template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_type_filename_template: Option<String>,

    /// Filename configured by the transform setup of the extraction type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_setup_filename: Option<String>,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    pub fn with_pdf(mut self, pdf_base64: impl Into<String>) -> Self {
        self.pdf_base64 = Some(pdf_base64.into());
        self
    }

    pub fn with_extraction_type(mut self, extraction_type_id: impl Into<String>) -> Self {
        self.extraction_type_id = Some(extraction_type_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_format_type(mut self, format: OutputFormat) -> Self {
        self.format_type = Some(format);
        self
    }

    pub fn with_page_group_template(mut self, template: impl Into<String>) -> Self {
        self.page_group_filename_template = Some(template.into());
        self
    }

    pub fn with_extraction_type_template(mut self, template: impl Into<String>) -> Self {
        self.extraction_type_filename_template = Some(template.into());
        self
    }

    /// Filename without its `.pdf` extension
    pub fn stem(&self) -> &str {
        let lower = self.filename.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            &self.filename[..self.filename.len() - 4]
        } else {
            &self.filename
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_strips_pdf_extension() {
        assert_eq!(SourceDocument::new("remit.PDF").stem(), "remit");
        assert_eq!(SourceDocument::new("remit.pdf").stem(), "remit");
        assert_eq!(SourceDocument::new("remit").stem(), "remit");
    }

    #[test]
    fn test_document_deserializes_camel_case() {
        let doc: SourceDocument = serde_json::from_value(serde_json::json!({
            "filename": "a.pdf",
            "formatType": "csv",
            "pageGroupFilenameTemplate": "PG-{{id}}"
        }))
        .unwrap();

        assert_eq!(doc.format_type, Some(OutputFormat::Csv));
        assert_eq!(doc.page_group_filename_template.as_deref(), Some("PG-{{id}}"));
        assert!(doc.pdf_base64.is_none());
    }
}
