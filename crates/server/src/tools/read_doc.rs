//! read_doc tool implementation.
//!
//! Returns the visible text of one documentation page. Paths are resolved
//! against the documentation root and may not leave it.

use idfdocs_client::Explorer;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{VersionParams, json_result, select_explorer};

/// Input parameters for read_doc tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReadDocParams {
    /// Page path relative to the documentation root, e.g. "api-reference/peripherals/gpio.html".
    /// A full URL inside the documentation root is also accepted.
    pub file_path: String,

    /// Fetch the page again even if it is cached.
    #[serde(default)]
    pub force_refresh: bool,

    #[serde(flatten)]
    pub edition: VersionParams,
}

/// Implementation of read_doc tool.
pub async fn read_doc_impl(explorer: &Explorer, params: ReadDocParams) -> Result<CallToolResult, McpError> {
    let explorer = select_explorer(explorer, &params.edition)?;
    let content = if params.force_refresh {
        explorer.refresh_doc(&params.file_path).await?
    } else {
        explorer.read_doc(&params.file_path).await?
    };

    tracing::info!(
        path = %content.path,
        content_length = content.content_length,
        force_refresh = params.force_refresh,
        "read_doc"
    );

    json_result(&content)
}
