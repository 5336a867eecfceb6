//! The request loop
//!
//! A [`RestStream`] pairs a descriptor with an API client, a paginator and a
//! record parser, and turns them into a lazy stream of pages. Each page is
//! one request: render the URL from the context, attach extra, paging and
//! auth parameters, send through the retry policy, parse and conform the
//! records, then ask the paginator for the next token.

use super::descriptor::StreamDescriptor;
use crate::client::ApiClient;
use crate::decode::RecordParser;
use crate::error::{Error, Result};
use crate::pagination::{PageToken, Paginator};
use crate::schema::{resolve_schema, SchemaDefinition};
use crate::template;
use crate::types::{Context, Record};
use futures::stream::{self, Stream, TryStreamExt};
use tokio::sync::OnceCell;
use tracing::debug;

/// One fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number within this invocation
    pub number: usize,
    /// Token used to request this page (`None` for the first page)
    pub token: Option<PageToken>,
    /// Token for the following page, if any
    pub next_token: Option<PageToken>,
    /// Records in response order, conformed to the schema
    pub records: Vec<Record>,
}

enum Cursor {
    Start,
    Next(PageToken),
    Failed(Error),
    Done,
}

/// A stream bound to an API client
pub struct RestStream {
    descriptor: StreamDescriptor,
    api: ApiClient,
    paginator: Box<dyn Paginator>,
    parser: Box<dyn RecordParser>,
    schema: OnceCell<SchemaDefinition>,
    children: Vec<RestStream>,
}

impl RestStream {
    /// Build a stream (and its children) with the descriptor's default
    /// paginator and parser
    pub fn new(descriptor: StreamDescriptor, api: ApiClient) -> Self {
        let children = descriptor
            .children
            .iter()
            .map(|child| RestStream::new(child.clone(), api.clone()))
            .collect();

        Self {
            paginator: descriptor.paginator(),
            parser: descriptor.parser(),
            descriptor,
            api,
            schema: OnceCell::new(),
            children,
        }
    }

    /// Replace the paginator
    #[must_use]
    pub fn with_paginator(mut self, paginator: impl Paginator + 'static) -> Self {
        self.paginator = Box::new(paginator);
        self
    }

    /// Replace the record parser
    #[must_use]
    pub fn with_parser(mut self, parser: impl RecordParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Replace the parser of a direct child stream
    #[must_use]
    pub fn with_child_parser(mut self, child: &str, parser: impl RecordParser + 'static) -> Self {
        if let Some(stream) = self.children.iter_mut().find(|c| c.name() == child) {
            stream.parser = Box::new(parser);
        }
        self
    }

    /// Stream name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// The descriptor
    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    /// Child streams, in declaration order
    pub fn children(&self) -> &[RestStream] {
        &self.children
    }

    /// The resolved schema, fetched on first use and cached
    pub async fn schema(&self) -> Result<&SchemaDefinition> {
        self.schema
            .get_or_try_init(|| {
                resolve_schema(
                    &self.api,
                    &self.descriptor.base_properties,
                    self.descriptor.properties_path.as_deref(),
                )
            })
            .await
    }

    /// Lazy sequence of pages for a context
    ///
    /// Every call starts from the first page. If the paginator returns the
    /// token that was just used, the current page is still yielded and the
    /// stream then ends with [`Error::PaginationLoop`] without another request.
    pub fn pages<'a>(
        &'a self,
        context: Option<&'a Context>,
    ) -> impl Stream<Item = Result<Page>> + Send + 'a {
        stream::unfold((Cursor::Start, 0usize), move |(cursor, number)| async move {
            let token = match cursor {
                Cursor::Done => return None,
                Cursor::Failed(err) => return Some((Err(err), (Cursor::Done, number))),
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            let number = number + 1;
            match self.fetch_page(context, token.as_ref()).await {
                Err(err) => Some((Err(err), (Cursor::Done, number))),
                Ok((records, next_token)) => {
                    let cursor = match &next_token {
                        None => Cursor::Done,
                        Some(next) if Some(next) == token.as_ref() => {
                            Cursor::Failed(Error::PaginationLoop {
                                stream: self.descriptor.name.clone(),
                                page: number,
                                token: next.to_string(),
                            })
                        }
                        Some(next) => Cursor::Next(next.clone()),
                    };
                    let page = Page {
                        number,
                        token,
                        next_token,
                        records,
                    };
                    Some((Ok(page), (cursor, number)))
                }
            }
        })
    }

    /// Lazy sequence of records for a context, in page then response order
    pub fn records<'a>(
        &'a self,
        context: Option<&'a Context>,
    ) -> impl Stream<Item = Result<Record>> + Send + 'a {
        self.pages(context)
            .map_ok(|page| stream::iter(page.records.into_iter().map(Ok::<Record, Error>)))
            .try_flatten()
    }

    async fn fetch_page(
        &self,
        context: Option<&Context>,
        token: Option<&PageToken>,
    ) -> Result<(Vec<Record>, Option<PageToken>)> {
        let schema = self.schema().await?;
        let url = self
            .api
            .url(&template::render(&self.descriptor.path, context)?);

        let mut params = self.descriptor.extra_params.clone();
        params.extend(self.paginator.url_params(context, token));

        let body = self.api.get_json(&url, &params).await?;
        let records: Vec<Record> = self
            .parser
            .parse(&body)?
            .into_iter()
            .map(|mut record| {
                self.descriptor.apply_context(&mut record, context);
                schema.conform(record)
            })
            .collect();
        let next_token = self.paginator.next_page_token(&body, token);

        debug!(
            stream = %self.descriptor.name,
            records = records.len(),
            token = ?token.map(ToString::to_string),
            has_next = next_token.is_some(),
            "Fetched page"
        );

        Ok((records, next_token))
    }
}

impl std::fmt::Debug for RestStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStream")
            .field("descriptor", &self.descriptor)
            .field("schema_resolved", &self.schema.initialized())
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}
