//! PDF handling

mod page_extractor;

pub use page_extractor::{decode_pdf, extract_page, page_count};

#[cfg(test)]
pub(crate) use page_extractor::fixtures;
