//! Email provider implementations

mod gmail;
mod mime;
mod office365;
mod provider;

pub use gmail::GmailSender;
pub use mime::build_mime_message;
pub use office365::Office365Sender;
pub use provider::ConfiguredEmailSender;
