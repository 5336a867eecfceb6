//! Streams and the request loop
//!
//! # Overview
//!
//! - [`StreamDescriptor`] - static description supplied by the catalog or caller
//! - [`RestStream`] - a descriptor bound to an [`ApiClient`](crate::client::ApiClient),
//!   producing lazy [`Page`] and record streams

mod descriptor;
mod rest;

pub use descriptor::{PaginationKind, StreamDescriptor};
pub use rest::{Page, RestStream};
