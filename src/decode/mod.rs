//! Response parsing
//!
//! # Overview
//!
//! A [`RecordParser`] extracts the records from one page's response body.
//! [`JsonPathParser`] covers the common case of records sitting in an array
//! at a fixed path; closures `Fn(&Value) -> Result<Vec<Record>>` also work.

mod decoders;
mod types;

pub use decoders::JsonPathParser;
pub use types::RecordParser;
