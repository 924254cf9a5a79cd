//! Rename step

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::domain::workflow::template::{has_placeholders, render};
use crate::domain::workflow::{
    ExecutionContext, OutputFormat, OutputTypes, RenameStep, WorkflowError, resolve_path,
};

/// Template used when neither the step nor the document configures one
pub const DEFAULT_FILENAME_TEMPLATE: &str = "Remit_{{pdfFilename}}";

pub const RENAMED_FILENAME_KEY: &str = "renamedFilename";
pub const RENAMED_PDF_FILENAME_KEY: &str = "renamedPdfFilename";
pub const RENAMED_FILENAMES_KEY: &str = "renamedFilenames";

static INVALID_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|]"#).unwrap());

static KNOWN_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(pdf|csv|json|xml)$").unwrap());

fn pick_template<'a>(step: &'a RenameStep, context: &'a ExecutionContext) -> &'a str {
    let document = context.document();
    [
        step.filename_template.as_deref(),
        document.page_group_filename_template.as_deref(),
        document.extraction_type_filename_template.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|t| !t.trim().is_empty())
    .unwrap_or(DEFAULT_FILENAME_TEMPLATE)
}

/// Resolve a filename template: `pdfFilename` first, then the context,
/// then the last API response.
pub fn render_filename(template: &str, context: &ExecutionContext) -> String {
    render(
        template,
        |path: &str| {
            if path == "pdfFilename" {
                return Some(Value::String(context.document().stem().to_string()));
            }
            context
                .resolve(path)
                .filter(|v| !v.is_null())
                .cloned()
                .or_else(|| {
                    context
                        .last_api_response()
                        .and_then(|response| resolve_path(response, path))
                        .cloned()
                })
        },
        |s| s.to_string(),
    )
}

fn base_name(rendered: &str, step: &RenameStep, now: DateTime<Utc>) -> String {
    let sanitized = INVALID_CHARS.replace_all(rendered.trim(), "_");
    let mut base = KNOWN_EXTENSION.replace(&sanitized, "").into_owned();
    if step.append_timestamp {
        base.push('_');
        base.push_str(&now.format(step.timestamp_format.pattern()).to_string());
    }
    base
}

fn enabled_formats(output_types: Option<OutputTypes>) -> Vec<OutputFormat> {
    let types = output_types.unwrap_or_default();
    let enabled: Vec<OutputFormat> = OutputFormat::PRECEDENCE
        .into_iter()
        .filter(|format| match format {
            OutputFormat::Pdf => types.pdf,
            OutputFormat::Csv => types.csv,
            OutputFormat::Json => types.json,
            OutputFormat::Xml => types.xml,
        })
        .collect();

    if enabled.is_empty() {
        vec![OutputFormat::Pdf]
    } else {
        enabled
    }
}

/// Compute output filenames with the current time
pub fn execute_rename(
    step: &RenameStep,
    context: &mut ExecutionContext,
) -> Result<Value, WorkflowError> {
    execute_rename_at(step, context, Utc::now())
}

/// Compute output filenames, stamping with `now` when a timestamp is requested
pub fn execute_rename_at(
    step: &RenameStep,
    context: &mut ExecutionContext,
    now: DateTime<Utc>,
) -> Result<Value, WorkflowError> {
    let template = pick_template(step, context);
    let rendered = render_filename(template, context);
    if has_placeholders(&rendered) {
        warn!(filename = %rendered, "Filename still contains unresolved placeholders");
    }

    let base = base_name(&rendered, step, now);
    if base.is_empty() {
        return Err(WorkflowError::validation(format!(
            "Filename template '{}' produced an empty filename",
            template
        )));
    }

    let formats = enabled_formats(step.output_types);
    let filenames: Map<String, Value> = formats
        .iter()
        .map(|format| {
            (
                format.extension().to_string(),
                Value::String(format!("{}.{}", base, format.extension())),
            )
        })
        .collect();

    let primary_format = context
        .document()
        .format_type
        .filter(|format| formats.contains(format))
        .unwrap_or(formats[0]);
    let primary = format!("{}.{}", base, primary_format.extension());
    let pdf_filename = format!("{}.pdf", base);

    info!(
        template = %template,
        filename = %primary,
        formats = formats.len(),
        "Output filenames computed"
    );

    context.set(RENAMED_FILENAME_KEY, Value::String(primary.clone()));
    context.set(RENAMED_PDF_FILENAME_KEY, Value::String(pdf_filename.clone()));
    context.set(RENAMED_FILENAMES_KEY, Value::Object(filenames.clone()));

    Ok(json!({
        RENAMED_FILENAME_KEY: primary,
        RENAMED_PDF_FILENAME_KEY: pdf_filename,
        RENAMED_FILENAMES_KEY: filenames,
    }))
}
