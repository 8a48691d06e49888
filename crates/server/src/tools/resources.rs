//! MCP resources.
//!
//! `docs://structure` is the crawled directory tree as JSON and
//! `docs://file/{path}` is the text of one page, with `path` relative to the
//! documentation root.

use idfdocs_client::Explorer;
use rmcp::{
    ErrorData as McpError,
    model::{AnnotateAble, RawResource, RawResourceTemplate, ReadResourceResult, Resource, ResourceContents, ResourceTemplate},
};

use super::to_json;

pub const STRUCTURE_URI: &str = "docs://structure";
pub const FILE_URI_PREFIX: &str = "docs://file/";
pub const FILE_URI_TEMPLATE: &str = "docs://file/{path}";

pub fn list_resources() -> Vec<Resource> {
    let mut structure = RawResource::new(STRUCTURE_URI, "doc-structure");
    structure.title = Some("Documentation structure".into());
    structure.description = Some("Directory tree of the documentation, crawled from its index page.".into());
    structure.mime_type = Some("application/json".into());
    vec![structure.no_annotation()]
}

pub fn list_resource_templates() -> Vec<ResourceTemplate> {
    let file = RawResourceTemplate {
        uri_template: FILE_URI_TEMPLATE.into(),
        name: "doc-file".into(),
        title: Some("Documentation page".into()),
        description: Some("Text of one page, by path relative to the documentation root.".into()),
        mime_type: Some("text/plain".into()),
        icons: None,
    };
    vec![file.no_annotation()]
}

/// Read the resource named by `uri` from the configured edition.
///
/// # Errors
///
/// Unknown URIs are `resource_not_found`; explorer failures keep their tool error codes.
pub async fn read_resource_impl(explorer: &Explorer, uri: &str) -> Result<ReadResourceResult, McpError> {
    let (mime_type, text) = if uri == STRUCTURE_URI {
        let structure = explorer.get_doc_structure().await?;
        ("application/json", to_json(&structure)?)
    } else if let Some(path) = uri.strip_prefix(FILE_URI_PREFIX).filter(|p| !p.trim().is_empty()) {
        let doc = explorer.read_doc(path).await?;
        ("text/plain", doc.content)
    } else {
        return Err(McpError::resource_not_found(
            format!("Unknown resource: {uri}"),
            Some(serde_json::json!({ "uri": uri })),
        ));
    };

    tracing::info!(uri, bytes = text.len(), "read_resource");

    Ok(ReadResourceResult {
        contents: vec![ResourceContents::TextResourceContents {
            uri: uri.to_string(),
            mime_type: Some(mime_type.into()),
            text,
            meta: None,
        }],
    })
}
