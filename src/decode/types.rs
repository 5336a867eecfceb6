//! Parser trait

use crate::error::Result;
use crate::types::Record;
use serde_json::Value;

/// Turns one page's response body into records
///
/// The request loop calls this once per page and yields the records in the
/// order returned. Stream-specific response shapes are handled by supplying a
/// different implementation; errors from `anyhow`-based parsers convert into
/// the crate error with `?`.
pub trait RecordParser: Send + Sync {
    /// Extract the records from a parsed response body
    fn parse(&self, body: &Value) -> Result<Vec<Record>>;
}

impl<F> RecordParser for F
where
    F: Fn(&Value) -> Result<Vec<Record>> + Send + Sync,
{
    fn parse(&self, body: &Value) -> Result<Vec<Record>> {
        self(body)
    }
}
