//! find_api_references tool implementation.
//!
//! Looks up a function, type or header across the API reference pages.

use idfdocs_client::Explorer;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{VersionParams, json_result, select_explorer};

/// Input parameters for find_api_references tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FindApiReferencesParams {
    /// API component name: a function ("esp_wifi_init"), type ("gpio_config_t") or header ("esp_wifi.h").
    pub component: String,

    #[serde(flatten)]
    pub edition: VersionParams,
}

/// Implementation of find_api_references tool.
pub async fn find_api_references_impl(
    explorer: &Explorer, params: FindApiReferencesParams,
) -> Result<CallToolResult, McpError> {
    let explorer = select_explorer(explorer, &params.edition)?;
    let references = explorer.find_api_references(&params.component).await?;

    tracing::info!(
        component = %params.component,
        references = references.references.len(),
        pages = references.pages_scanned,
        "find_api_references"
    );

    json_result(&references)
}
