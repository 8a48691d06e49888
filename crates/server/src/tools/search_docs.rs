//! search_docs tool implementation.
//!
//! Searches the main documentation sections, plus any page already cached,
//! for a case-insensitive literal query.

use idfdocs_client::Explorer;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{VersionParams, json_result, select_explorer};

/// Input parameters for search_docs tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchDocsParams {
    /// Text to search for. Matched literally, ignoring case.
    pub query: String,

    /// Maximum number of hits (capped by the server's configured maximum).
    #[serde(default)]
    pub limit: Option<usize>,

    /// Number of ranked hits to skip, for paging through results.
    #[serde(default)]
    pub offset: usize,

    #[serde(flatten)]
    pub edition: VersionParams,
}

/// Implementation of search_docs tool.
pub async fn search_docs_impl(explorer: &Explorer, params: SearchDocsParams) -> Result<CallToolResult, McpError> {
    let explorer = select_explorer(explorer, &params.edition)?;
    let results = explorer.search_docs(&params.query, params.limit, params.offset).await?;

    tracing::info!(
        query = %params.query,
        hits = results.hits.len(),
        offset = results.offset,
        pages = results.pages_searched,
        elapsed_ms = results.metadata.elapsed_ms,
        "search_docs"
    );

    json_result(&results)
}
