//! Email domain module
//!
//! Steps build an [`EmailMessage`] and hand it to an [`EmailSender`]; which
//! provider delivers it is decided by the stored [`EmailProviderConfig`].

mod entity;
mod sender;

pub use entity::{
    parse_recipients, EmailMessage, EmailProviderConfig, GmailConfig, Office365Config,
    PdfAttachment,
};
pub use sender::EmailSender;

#[cfg(test)]
pub use sender::MockEmailSender;
