//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-idf-docs server. Each
//! tool serializes its explorer result as pretty JSON text content.

pub mod find_api_references;
pub mod get_doc_structure;
pub mod read_doc;
pub mod resources;
pub mod search_docs;

pub use find_api_references::FindApiReferencesParams;
pub use read_doc::ReadDocParams;
pub use search_docs::SearchDocsParams;

use idfdocs_client::Explorer;
use idfdocs_core::{DocVersion, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Optional documentation edition override, shared by every tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VersionParams {
    /// Documentation version ("latest", "v5.1", ...). Defaults to the server's configured version.
    #[serde(default)]
    pub version: Option<String>,

    /// Chip target ("esp32", "esp32s3", ...). Defaults to the server's configured chip target.
    #[serde(default)]
    pub chip_target: Option<String>,
}

/// The explorer for the requested edition; unset fields keep the configured ones.
pub fn select_explorer(explorer: &Explorer, params: &VersionParams) -> Result<Explorer, McpError> {
    if params.version.is_none() && params.chip_target.is_none() {
        return Ok(explorer.clone());
    }

    let current = explorer.version();
    let version = DocVersion::new(
        params.version.as_deref().unwrap_or(current.version()),
        params.chip_target.clone().or_else(|| current.chip_target().map(str::to_string)),
    );

    Ok(explorer.with_version(version)?)
}

pub(crate) fn to_json<T: Serialize>(output: &T) -> Result<String, McpError> {
    Ok(serde_json::to_string_pretty(output).map_err(|e| Error::InvalidInput(format!("Failed to serialize result: {e}")))?)
}

/// Serialize `output` as the tool's text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(to_json(output)?)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::Utc;
    use idfdocs_client::{Explorer, FetchedPage, Fetcher};
    use idfdocs_core::{AppConfig, Error};
    use rmcp::model::CallToolResult;
    use std::collections::HashMap;
    use std::sync::Arc;
    use url::Url;

    /// Canned documentation site under `https://docs.example.com/idf/en/latest/`.
    pub struct SiteFetcher {
        pages: HashMap<String, String>,
    }

    impl SiteFetcher {
        pub fn new(pages: &[(&str, &str)]) -> Self {
            let pages = pages
                .iter()
                .map(|(path, html)| (format!("https://docs.example.com/idf/en/latest/{path}"), html.to_string()))
                .collect();
            Self { pages }
        }
    }

    #[async_trait]
    impl Fetcher for SiteFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage, Error> {
            let body = self
                .pages
                .get(url.as_str())
                .ok_or_else(|| Error::Http { status: 404, url: url.to_string() })?;

            Ok(FetchedPage {
                url: url.clone(),
                final_url: url.clone(),
                status: 200,
                content_type: Some("text/html".into()),
                body: Bytes::from(body.clone()),
                fetched_at: Utc::now(),
                fetch_ms: 0,
            })
        }
    }

    pub fn explorer(pages: &[(&str, &str)]) -> Explorer {
        let config = AppConfig { base_url: "https://docs.example.com/idf".into(), ..Default::default() };
        Explorer::from_config(&config, Arc::new(SiteFetcher::new(pages))).unwrap()
    }

    pub const INDEX: &str = r#"<html><head><title>ESP-IDF Programming Guide</title></head><body>
        <div class="document"><h1>ESP-IDF Programming Guide</h1><p>Start here.</p>
        <a href="api-reference/index.html">API Reference</a><a href="api-guides/wifi.html">Wi-Fi Guide</a></div></body></html>"#;

    pub const API_INDEX: &str = r#"<html><head><title>API Reference</title></head><body>
        <div class="document"><h1>API Reference</h1><a href="network/esp_wifi.html">Wi-Fi</a></div></body></html>"#;

    pub const ESP_WIFI: &str = r#"<html><head><title>Wi-Fi</title></head><body><div class="document">
        <h1>Wi-Fi</h1><section id="api-reference"><h2>API Reference</h2>
        <dl class="cpp function"><dt class="sig">esp_err_t esp_wifi_init(const wifi_init_config_t *config)</dt>
        <dd><p>Initialize WiFi.</p></dd></dl></section></div></body></html>"#;

    pub const WIFI_GUIDE: &str = r#"<html><head><title>Wi-Fi Driver</title></head><body><div class="document">
        <h1>Wi-Fi Driver</h1><p>Call esp_wifi_init first.</p></div></body></html>"#;

    pub fn site() -> Explorer {
        explorer(&[
            ("index.html", INDEX),
            ("api-reference/index.html", API_INDEX),
            ("api-reference/network/esp_wifi.html", ESP_WIFI),
            ("api-guides/wifi.html", WIFI_GUIDE),
        ])
    }

    /// Parse the JSON text content of a tool result.
    pub fn json_of(result: &CallToolResult) -> serde_json::Value {
        let text = result.content.first().and_then(|c| c.as_text()).expect("Expected text content");
        serde_json::from_str(&text.text).unwrap()
    }
}
