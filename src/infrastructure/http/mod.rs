//! Outbound HTTP

mod client;

pub use client::{HttpBody, HttpClient, HttpClientTrait, HttpRequest, HttpResponse};

#[cfg(test)]
pub use client::mock;
