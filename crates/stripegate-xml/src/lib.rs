//! AWS-style XML rendering for stripegate error responses.

pub mod error;

pub use error::error_to_xml;
