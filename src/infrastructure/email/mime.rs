//! RFC 822 / MIME message construction

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use uuid::Uuid;

use crate::domain::email::EmailMessage;

const LINE_LENGTH: usize = 76;

/// Encode a header value as an RFC 2047 encoded word unless it is plain
/// printable ASCII. CR and LF never reach the header block unencoded.
fn encode_header(value: &str) -> String {
    if value.is_ascii() && !value.chars().any(|c| c.is_ascii_control()) {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value.as_bytes()))
    }
}

/// Address header value; control characters are dropped
fn address_list(addresses: &[String]) -> String {
    addresses
        .iter()
        .map(|address| address.chars().filter(|c| !c.is_control()).collect::<String>())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Value for a quoted `name=` / `filename=` parameter
fn quoted_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    encode_header(&cleaned)
}

/// Base64 with lines wrapped at 76 characters
fn wrapped_base64(data: &[u8]) -> String {
    wrap_encoded(&STANDARD.encode(data))
}

/// Re-wrap content that is already base64 encoded
fn wrap_encoded(encoded: &str) -> String {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .as_bytes()
        .chunks(LINE_LENGTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn body_content_type(message: &EmailMessage) -> &'static str {
    if message.is_html {
        "text/html; charset=\"UTF-8\""
    } else {
        "text/plain; charset=\"UTF-8\""
    }
}

/// Build the raw message text, with CRLF line endings
pub fn build_mime_message(message: &EmailMessage, from: &str) -> String {
    let mut lines = vec![
        format!("From: {}", address_list(&[from.to_string()])),
        format!("To: {}", address_list(&message.to)),
    ];
    if !message.cc.is_empty() {
        lines.push(format!("Cc: {}", address_list(&message.cc)));
    }
    if !message.bcc.is_empty() {
        lines.push(format!("Bcc: {}", address_list(&message.bcc)));
    }
    lines.push(format!("Subject: {}", encode_header(&message.subject)));
    lines.push("MIME-Version: 1.0".to_string());

    if message.attachments.is_empty() {
        lines.push(format!("Content-Type: {}", body_content_type(message)));
        lines.push("Content-Transfer-Encoding: base64".to_string());
        lines.push(String::new());
        lines.push(wrapped_base64(message.body.as_bytes()));
        return lines.join("\r\n");
    }

    let boundary = format!("boundary_{}", Uuid::new_v4().simple());
    lines.push(format!(
        "Content-Type: multipart/mixed; boundary=\"{}\"",
        boundary
    ));
    lines.push(String::new());

    lines.push(format!("--{}", boundary));
    lines.push(format!("Content-Type: {}", body_content_type(message)));
    lines.push("Content-Transfer-Encoding: base64".to_string());
    lines.push(String::new());
    lines.push(wrapped_base64(message.body.as_bytes()));

    for attachment in &message.attachments {
        let name = quoted_filename(&attachment.filename);
        lines.push(format!("--{}", boundary));
        lines.push(format!("Content-Type: application/pdf; name=\"{}\"", name));
        lines.push(format!(
            "Content-Disposition: attachment; filename=\"{}\"",
            name
        ));
        lines.push("Content-Transfer-Encoding: base64".to_string());
        lines.push(String::new());
        lines.push(wrap_encoded(&attachment.base64_content));
    }

    lines.push(format!("--{}--", boundary));
    lines.join("\r\n")
}
