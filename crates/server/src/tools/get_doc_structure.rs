//! get_doc_structure tool implementation.

use idfdocs_client::Explorer;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::{VersionParams, json_result, select_explorer};

/// Crawl the documentation from its index page and return the directory tree.
pub async fn get_doc_structure_impl(explorer: &Explorer, params: VersionParams) -> Result<CallToolResult, McpError> {
    let explorer = select_explorer(explorer, &params)?;
    let structure = explorer.get_doc_structure().await?;

    tracing::info!(
        version = %structure.metadata.version,
        pages = structure.tree.pages,
        truncated = structure.tree.truncated,
        failed = structure.tree.failed.len(),
        "get_doc_structure"
    );

    json_result(&structure)
}
