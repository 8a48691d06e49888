//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    FindApiReferencesParams, ReadDocParams, SearchDocsParams, VersionParams,
    find_api_references::find_api_references_impl, get_doc_structure::get_doc_structure_impl,
    read_doc::read_doc_impl, resources, search_docs::search_docs_impl,
};

use idfdocs_client::Explorer;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListResourceTemplatesResult, ListResourcesResult,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ReadResourceRequestParam, ReadResourceResult,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use std::sync::Arc;

/// The main MCP server handler for mcp-idf-docs.
#[derive(Clone)]
pub struct DocsServer {
    explorer: Arc<Explorer>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl DocsServer {
    /// Create a new server handler over `explorer`.
    pub fn new(explorer: Arc<Explorer>) -> Self {
        Self { explorer, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Search the ESP-IDF documentation for a keyword or phrase. Returns ranked pages with URL, title and a snippet around the first match."
    )]
    async fn search_docs(&self, params: Parameters<SearchDocsParams>) -> Result<CallToolResult, McpError> {
        search_docs_impl(&self.explorer, params.0).await
    }

    #[tool(
        description = "Get the structure of the ESP-IDF documentation as a directory tree of page titles and URLs, crawled from the documentation index."
    )]
    async fn get_doc_structure(&self, params: Parameters<VersionParams>) -> Result<CallToolResult, McpError> {
        get_doc_structure_impl(&self.explorer, params.0).await
    }

    #[tool(
        description = "Read one ESP-IDF documentation page by path relative to the documentation root (e.g. \"api-reference/peripherals/gpio.html\"). Returns its title and text content."
    )]
    async fn read_doc(&self, params: Parameters<ReadDocParams>) -> Result<CallToolResult, McpError> {
        read_doc_impl(&self.explorer, params.0).await
    }

    /// Find where an API component is documented.
    ///
    /// Accepts function names, type names and header names; pages whose API
    /// Reference section mentions the component rank first.
    #[tool(
        description = "Find ESP-IDF API reference pages documenting a function, type or header (e.g. \"esp_wifi_init\", \"gpio_config_t\", \"esp_wifi.h\")."
    )]
    async fn find_api_references(&self, params: Parameters<FindApiReferencesParams>) -> Result<CallToolResult, McpError> {
        find_api_references_impl(&self.explorer, params.0).await
    }
}

impl ServerHandler for DocsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-idf-docs".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().enable_resources().build(),
            instructions: Some(format!(
                "Explore the ESP-IDF documentation at {}. Use get_doc_structure to browse, search_docs to find pages, \
                 read_doc to read one, and find_api_references to locate API definitions. The same tree and pages \
                 are readable as the resources docs://structure and docs://file/{{path}}.",
                self.explorer.root().root_url()
            )),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }

    async fn list_resources(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, rmcp::model::ErrorData> {
        Ok(ListResourcesResult::with_all_items(resources::list_resources()))
    }

    async fn list_resource_templates(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, rmcp::model::ErrorData> {
        Ok(ListResourceTemplatesResult::with_all_items(resources::list_resource_templates()))
    }

    async fn read_resource(
        &self, request: ReadResourceRequestParam, _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, rmcp::model::ErrorData> {
        resources::read_resource_impl(&self.explorer, &request.uri).await
    }
}
