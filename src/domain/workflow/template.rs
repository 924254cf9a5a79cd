//! Placeholder substitution over the execution context
//!
//! Three placeholder forms are understood:
//! - `{{path}}` - general placeholder used in URLs, bodies, subjects, filenames
//! - `{var}` and `${var}` - path variables in endpoint path templates
//!
//! An unresolved placeholder is always left in the output unchanged, so a
//! single missing value never corrupts the rest of a template.

use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Captures, Regex};
use serde_json::Value;

use super::context::ExecutionContext;

/// `{{ path }}`
static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").unwrap());

/// `"{{ path }}"` (a whole JSON string literal) or a bare `{{ path }}`
static JSON_BODY_PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""\{\{\s*([^{}"]+?)\s*\}\}"|\{\{\s*([^{}]+?)\s*\}\}"#).unwrap()
});

/// `{var}` or `${var}`
static PATH_VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\{([A-Za-z0-9_.\[\]-]+)\}").unwrap());

/// Characters left alone by `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// String form of a resolved value; `None` when the value counts as unresolved
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => serde_json::to_string(value).ok(),
    }
}

/// Replace every `{{path}}` token using `lookup`, passing each string form
/// through `encode`. Tokens whose lookup fails are kept verbatim.
pub fn render<L, E>(template: &str, lookup: L, encode: E) -> String
where
    L: Fn(&str) -> Option<Value>,
    E: Fn(&str) -> String,
{
    PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &Captures| {
            let path = &caps[1];
            match lookup(path).as_ref().and_then(value_to_string) {
                Some(text) => encode(&text),
                None => {
                    tracing::debug!(path = %path, "Placeholder left unresolved");
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Plain substitution against the context
pub fn substitute(template: &str, context: &ExecutionContext) -> String {
    render(template, |path| context.resolve(path).cloned(), |s| s.to_string())
}

/// Substitution where each value is made safe for a URL.
///
/// With `odata_escape`, quotes are doubled and parentheses stripped before
/// percent-encoding.
pub fn substitute_url(template: &str, context: &ExecutionContext, odata_escape: bool) -> String {
    render(
        template,
        |path| context.resolve(path).cloned(),
        |s| {
            if odata_escape {
                encode_uri_component(&odata_escape_value(s))
            } else {
                encode_uri_component(s)
            }
        },
    )
}

/// Render a JSON body template.
///
/// Quoted or bare placeholders that resolve to objects or arrays are replaced
/// by raw JSON, so `{"data": "{{extractedData}}"}` stays valid JSON. Scalars
/// are JSON-string escaped, with single quotes doubled when requested.
pub fn render_json_body(
    template: &str,
    context: &ExecutionContext,
    escape_single_quotes: bool,
) -> String {
    JSON_BODY_PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &Captures| {
            let (path, quoted) = match (caps.get(1), caps.get(2)) {
                (Some(path), _) => (path.as_str(), true),
                (None, Some(path)) => (path.as_str(), false),
                (None, None) => return caps[0].to_string(),
            };

            let text = match context.resolve(path) {
                Some(value @ (Value::Object(_) | Value::Array(_))) => return value.to_string(),
                Some(value) => value_to_string(value),
                None => None,
            };

            match text {
                Some(text) => {
                    let text = if escape_single_quotes {
                        text.replace('\'', "''")
                    } else {
                        text
                    };
                    if quoted {
                        format!("\"{}\"", json_escape(&text))
                    } else {
                        json_escape(&text)
                    }
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Replace `{var}` and `${var}` tokens against the context.
///
/// Double-brace placeholders are not touched, so this can run on templates
/// that mix both syntaxes.
pub fn substitute_path_variables(template: &str, context: &ExecutionContext) -> String {
    render_path_variables(template, context, |s| s.to_string())
}

/// Like [`substitute_path_variables`], with an encoder applied to each value
pub fn render_path_variables<E>(template: &str, context: &ExecutionContext, encode: E) -> String
where
    E: Fn(&str) -> String,
{
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PATH_VARIABLE_PATTERN.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let start = whole.start();
        let end = whole.end();

        // Skip the inner part of `{{var}}`
        let inside_double_brace = (start > 0 && bytes[start - 1] == b'{')
            || (end < bytes.len() && bytes[end] == b'}');
        if inside_double_brace {
            continue;
        }

        out.push_str(&template[last..start]);
        match context.resolve(&caps[1]).and_then(value_to_string) {
            Some(text) => out.push_str(&encode(&text)),
            None => out.push_str(whole.as_str()),
        }
        last = end;
    }

    out.push_str(&template[last..]);
    out
}

/// True when the text still contains a `{{...}}` placeholder
pub fn has_placeholders(text: &str) -> bool {
    PLACEHOLDER_PATTERN.is_match(text)
}

/// Percent-encode like `encodeURIComponent`
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Escape a value for use inside an OData string literal.
///
/// Single quotes are doubled and parentheses removed; the latter works around
/// a WAF rule that rejects `()` in query strings.
pub fn odata_escape_value(value: &str) -> String {
    value.replace('\'', "''").replace(['(', ')'], "")
}

/// Escape text for embedding inside a JSON string literal (without quotes)
pub fn json_escape(value: &str) -> String {
    let quoted = Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
