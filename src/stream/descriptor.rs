//! Stream descriptors
//!
//! Plain data describing one stream: where it lives, how it pages, which
//! fields it declares and how it relates to child streams.

use crate::decode::{JsonPathParser, RecordParser};
use crate::pagination::{HasMorePaginator, Paginator, SinglePagePaginator, DEFAULT_PAGE_SIZE};
use crate::schema::Property;
use crate::types::{Context, Record};

/// How a stream pages through results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaginationKind {
    /// `count` + `has-more` / `offset` / `vid-offset`
    #[default]
    HasMore,
    /// Everything in one response
    SinglePage,
}

/// Static description of a stream
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// Stream name, also the state key
    pub name: String,
    /// URL template relative to the base URL, e.g. `/contacts/v1/lists/{list_id}/contacts/all`
    pub path: String,
    /// JSONPath of the records in a page body
    pub records_path: String,
    /// Statically declared fields
    pub base_properties: Vec<Property>,
    /// Metadata endpoint for discovered fields
    pub properties_path: Option<String>,
    /// Records per page
    pub page_size: u32,
    /// Pagination style
    pub pagination: PaginationKind,
    /// Primary key fields
    pub primary_keys: Vec<String>,
    /// Incremental cursor field
    pub replication_key: Option<String>,
    /// Whether records arrive ordered by the replication key
    pub is_sorted: bool,
    /// Extra query parameters sent with every page request
    pub extra_params: Vec<(String, String)>,
    /// Declared partition contexts; empty means a single stream-level bookmark
    pub partitions: Vec<Context>,
    /// Streams synced once per record of this stream
    pub children: Vec<StreamDescriptor>,
    /// `(context key, record field)` pairs building a child context
    pub child_context_keys: Vec<(String, String)>,
    /// `(record field, context key)` pairs copied from the context onto
    /// every record
    pub context_fields: Vec<(String, String)>,
}

impl StreamDescriptor {
    /// Create a descriptor with defaults: `$[*]` records, has-more paging
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            records_path: "$[*]".to_string(),
            base_properties: Vec::new(),
            properties_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            pagination: PaginationKind::HasMore,
            primary_keys: Vec::new(),
            replication_key: None,
            is_sorted: false,
            extra_params: Vec::new(),
            partitions: Vec::new(),
            children: Vec::new(),
            child_context_keys: Vec::new(),
            context_fields: Vec::new(),
        }
    }

    /// Set the records path
    #[must_use]
    pub fn records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = path.into();
        self
    }

    /// Declare a base field
    #[must_use]
    pub fn property(mut self, property: Property) -> Self {
        self.base_properties.push(property);
        self
    }

    /// Declare several base fields
    #[must_use]
    pub fn properties(mut self, properties: impl IntoIterator<Item = Property>) -> Self {
        self.base_properties.extend(properties);
        self
    }

    /// Set the metadata endpoint
    #[must_use]
    pub fn properties_path(mut self, path: impl Into<String>) -> Self {
        self.properties_path = Some(path.into());
        self
    }

    /// Set the page size
    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Use a single request instead of has-more paging
    #[must_use]
    pub fn single_page(mut self) -> Self {
        self.pagination = PaginationKind::SinglePage;
        self
    }

    /// Set the primary keys
    #[must_use]
    pub fn primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Set the replication key
    #[must_use]
    pub fn replication_key(mut self, key: impl Into<String>) -> Self {
        self.replication_key = Some(key.into());
        self
    }

    /// Mark records as sorted by the replication key
    #[must_use]
    pub fn sorted(mut self, is_sorted: bool) -> Self {
        self.is_sorted = is_sorted;
        self
    }

    /// Add an extra query parameter
    #[must_use]
    pub fn extra_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_params.push((key.into(), value.into()));
        self
    }

    /// Declare a partition
    #[must_use]
    pub fn partition(mut self, context: Context) -> Self {
        self.partitions.push(context);
        self
    }

    /// Add a child stream
    #[must_use]
    pub fn child(mut self, child: StreamDescriptor) -> Self {
        self.children.push(child);
        self
    }

    /// Map a record field into the child context under `context_key`
    #[must_use]
    pub fn child_context_key(
        mut self,
        context_key: impl Into<String>,
        record_field: impl Into<String>,
    ) -> Self {
        self.child_context_keys
            .push((context_key.into(), record_field.into()));
        self
    }

    /// Copy `context_key` from the request context onto each record as
    /// `record_field`
    #[must_use]
    pub fn context_field(
        mut self,
        record_field: impl Into<String>,
        context_key: impl Into<String>,
    ) -> Self {
        self.context_fields
            .push((record_field.into(), context_key.into()));
        self
    }

    /// Stamp context values onto a record
    pub fn apply_context(&self, record: &mut Record, context: Option<&Context>) {
        let Some(context) = context else { return };
        for (field, key) in &self.context_fields {
            if let Some(value) = context.get(key) {
                record.insert(field.clone(), value.clone());
            }
        }
    }

    /// Build the context for child streams from a record of this stream
    ///
    /// Returns `None` when a mapped field is missing or null; the children are
    /// then skipped for that record.
    pub fn child_context(&self, record: &Record) -> Option<Context> {
        self.child_context_keys
            .iter()
            .map(|(context_key, field)| {
                record
                    .get(field)
                    .filter(|v| !v.is_null())
                    .map(|v| (context_key.clone(), v.clone()))
            })
            .collect()
    }

    /// Paginator matching this descriptor
    pub fn paginator(&self) -> Box<dyn Paginator> {
        match self.pagination {
            PaginationKind::HasMore => Box::new(HasMorePaginator::new(self.page_size)),
            PaginationKind::SinglePage => Box::new(SinglePagePaginator),
        }
    }

    /// Record parser matching this descriptor
    pub fn parser(&self) -> Box<dyn RecordParser> {
        Box::new(JsonPathParser::new(&self.records_path))
    }

    /// This stream and all descendants, depth-first, parents first
    pub fn walk(&self) -> Vec<&StreamDescriptor> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}
