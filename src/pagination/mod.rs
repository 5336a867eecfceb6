//! Pagination module
//!
//! Supports: has-more/offset (HubSpot v1), single page
//!
//! # Overview
//!
//! A [`Paginator`] turns a response body into the [`PageToken`] for the next
//! request and turns a token back into query parameters. The request loop owns
//! the iteration; paginators hold no per-run state.

mod strategies;
mod types;

pub use strategies::{HasMorePaginator, SinglePagePaginator, DEFAULT_PAGE_SIZE};
pub use types::{PageToken, Paginator};

#[cfg(test)]
mod tests;
