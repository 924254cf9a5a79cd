//! Infrastructure layer - external service implementations

pub mod email;
pub mod http;
pub mod logging;
pub mod pdf;
pub mod store;
pub mod workflow;
