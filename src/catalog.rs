//! Built-in HubSpot stream catalog
//!
//! The v1 endpoints that page with `count` / `has-more` / `offset`. Contacts
//! discover their fields from the contact properties endpoint; the other
//! streams carry a static field list.

use crate::client::ApiClient;
use crate::config::TapConfig;
use crate::decode::{JsonPathParser, RecordParser};
use crate::error::Result;
use crate::schema::Property;
use crate::stream::{PaginationKind, RestStream, StreamDescriptor};
use crate::types::Record;
use serde_json::Value;

/// Contact property metadata endpoint
pub const CONTACT_PROPERTIES_PATH: &str = "properties/v1/contacts/properties";

/// Names of the built-in top-level streams, in sync order
pub const STREAM_NAMES: &[&str] = &[
    "account",
    "dispositions",
    "engagements",
    "contacts",
    "lists",
    "deals_pipelines",
];

fn strings(names: &[&str]) -> Vec<Property> {
    names.iter().map(|name| Property::string(*name)).collect()
}

fn account() -> StreamDescriptor {
    StreamDescriptor::new("account", "integrations/v1/me")
        .records_path("$")
        .single_page()
        .primary_keys(["portalId"])
        .properties(strings(&[
            "portalId",
            "timeZone",
            "accountType",
            "currency",
            "utcOffset",
            "utcOffsetMilliseconds",
        ]))
}

fn dispositions() -> StreamDescriptor {
    StreamDescriptor::new("dispositions", "calling/v1/dispositions")
        .records_path("$.[*]")
        .single_page()
        .primary_keys(["id"])
        .properties(strings(&["id", "label"]))
        .property(Property::boolean("deleted"))
}

fn engagements() -> StreamDescriptor {
    StreamDescriptor::new("engagements", "engagements/v1/engagements/paged")
        .records_path("$.results[*]")
        .page_size(250)
        .primary_keys(["id"])
        .properties(strings(&["id", "portalId"]))
        .property(Property::boolean("active"))
        .property(Property::datetime("createdAt"))
        .property(Property::datetime("lastUpdated"))
        .properties(strings(&[
            "createdBy", "modifiedBy", "ownerId", "type", "uid",
        ]))
        .property(Property::datetime("timestamp"))
        .properties(strings(&["source", "bodyPreview"]))
        .property(Property::boolean("bodyPreviewIsTruncated"))
        .property(Property::string("bodyPreviewHtml"))
        .property(Property::boolean("gdprDeleted"))
        .properties(strings(&[
            "status",
            "forObjectType",
            "subject",
            "taskType",
            "priority",
        ]))
        .property(Property::boolean("sendDefaultReminder"))
        .property(Property::boolean("isAllDay"))
        .properties(strings(&[
            "body",
            "disposition",
            "toNumber",
            "fromNumber",
            "durationMilliseconds",
            "recordingUrl",
            "title",
        ]))
        .property(Property::datetime("completionDate"))
        .properties(strings(&[
            "text",
            "html",
            "trackerKey",
            "messageId",
            "loggedFrom",
            "postSendStatus",
            "mediaProcessingStatus",
        ]))
        .property(Property::boolean("attachedVideoOpened"))
        .property(Property::boolean("attachedVideoWatched"))
}

fn contacts() -> StreamDescriptor {
    StreamDescriptor::new("contacts", "contacts/v1/lists/all/contacts/all")
        .records_path("$.contacts[*]")
        .primary_keys(["vid"])
        .extra_param("showListMemberships", "true")
        .properties_path(CONTACT_PROPERTIES_PATH)
        .property(Property::string("vid"))
        .property(Property::datetime("addedAt"))
        .properties(strings(&["portal-id", "list-memberships", "subscriber_email"]))
}

fn contact_list_data() -> StreamDescriptor {
    StreamDescriptor::new(
        "contact_list_data",
        "/contacts/v1/lists/{list_id}/contacts/all",
    )
    .records_path("$.contacts[*]")
    .primary_keys(["vid", "listId"])
    .properties_path(CONTACT_PROPERTIES_PATH)
    .property(Property::string("vid"))
    .property(Property::datetime("addedAt"))
    .properties(strings(&["portal-id", "listId"]))
    .context_field("listId", "list_id")
}

fn lists() -> StreamDescriptor {
    StreamDescriptor::new("lists", "contacts/v1/lists")
        .records_path("$.lists[*]")
        .page_size(250)
        .primary_keys(["listId", "updatedAt"])
        .replication_key("updatedAt")
        .properties(strings(&[
            "listId",
            "name",
            "authorId",
            "portalId",
            "internalListId",
        ]))
        .property(Property::boolean("dynamic"))
        .properties(strings(&["listType", "metaData", "filters", "teamIds"]))
        .property(Property::datetime("createdAt"))
        .property(Property::datetime("updatedAt"))
        .property(Property::boolean("deleteable"))
        .property(Property::boolean("archived"))
        .child(contact_list_data())
        .child_context_key("list_id", "listId")
}

fn deals_pipelines() -> StreamDescriptor {
    StreamDescriptor::new("deals_pipelines", "crm-pipelines/v1/pipelines/deals")
        .records_path("$.results[*]")
        .page_size(250)
        .primary_keys(["pipelineId"])
        .properties(strings(&["pipelineId", "objectType", "label", "displayOrder"]))
        .property(Property::datetime("createdAt"))
        .property(Property::datetime("updatedAt"))
        .property(Property::boolean("active"))
        .property(Property::string("stages"))
}

/// Descriptors of every built-in stream, in sync order
pub fn descriptors() -> Vec<StreamDescriptor> {
    vec![
        account(),
        dispositions(),
        engagements(),
        contacts(),
        lists(),
        deals_pipelines(),
    ]
}

/// Look up a built-in descriptor by top-level stream name
pub fn descriptor(name: &str) -> Option<StreamDescriptor> {
    descriptors().into_iter().find(|d| d.name == name)
}

/// Engagement rows nest their fields under `engagement`, `associations`
/// and `metadata`; the three groups are merged into one flat record
pub fn parse_engagements(body: &Value) -> Result<Vec<Record>> {
    let rows = JsonPathParser::new("$.results[*]").parse(body)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let mut flat = Record::new();
            for group in ["engagement", "associations", "metadata"] {
                if let Some(Value::Object(fields)) = row.get(group) {
                    flat.extend(fields.clone());
                }
            }
            flat
        })
        .collect())
}

/// Contacts carry their email in `identity-profiles[].identities[]`; the
/// last `EMAIL` identity becomes `subscriber_email`
pub fn parse_contacts(body: &Value) -> Result<Vec<Record>> {
    let mut records = JsonPathParser::new("$.contacts[*]").parse(body)?;
    for record in &mut records {
        let email = record
            .get("identity-profiles")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|profile| profile.get("identities")?.as_array())
            .flatten()
            .filter(|identity| identity.get("type").and_then(Value::as_str) == Some("EMAIL"))
            .filter_map(|identity| identity.get("value").cloned())
            .last();
        if let Some(email) = email {
            record.insert("subscriber_email".to_string(), email);
        }
    }
    Ok(records)
}

/// Bind descriptors to an API client, attaching the custom parsers of the
/// built-in streams
pub fn bind(descriptors: Vec<StreamDescriptor>, api: &ApiClient) -> Vec<RestStream> {
    descriptors
        .into_iter()
        .map(|descriptor| {
            let name = descriptor.name.clone();
            let stream = RestStream::new(descriptor, api.clone());
            match name.as_str() {
                "engagements" => stream.with_parser(parse_engagements),
                "contacts" => stream.with_parser(parse_contacts),
                _ => stream,
            }
        })
        .collect()
}

/// Every built-in stream bound to an API client
pub fn streams(api: &ApiClient) -> Vec<RestStream> {
    bind(descriptors(), api)
}

/// Every built-in stream wired from a tap config
///
/// A configured `page_size` replaces the page size of every paged stream,
/// children included.
pub fn streams_from_config(config: &TapConfig) -> Result<Vec<RestStream>> {
    let api = config.api_client()?;
    let mut descriptors = descriptors();
    if let Some(page_size) = config.page_size {
        for descriptor in &mut descriptors {
            override_page_size(descriptor, page_size);
        }
    }
    Ok(bind(descriptors, &api))
}

fn override_page_size(descriptor: &mut StreamDescriptor, page_size: u32) {
    if descriptor.pagination == PaginationKind::HasMore {
        descriptor.page_size = page_size;
    }
    for child in &mut descriptor.children {
        override_page_size(child, page_size);
    }
}
