//! Component or function name to API-reference pages.
//!
//! A name is expanded into candidate spellings, each candidate is scored like
//! a search query, and pages where the name sits inside an API-reference
//! region get a large bonus. Results are merged per page, best candidate first.

use idfdocs_core::{DocLocation, Error, ParsedPage};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::search::{Query, snippet};

/// Added when a candidate appears inside a signature or struct/enum block.
pub const API_SECTION_BONUS: f64 = 20.0;

/// Added for pages under the API reference tree.
pub const API_PATH_BONUS: f64 = 5.0;

/// Weight of derived spellings relative to the name as given.
pub const DERIVED_WEIGHT: f64 = 0.5;

/// Start page of the API reference tree.
pub const API_REFERENCE_INDEX: &str = "api-reference/index.html";

const API_PREFIX: &str = "api-reference/";

/// One page documenting the requested name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiReference {
    /// The spelling that matched on this page
    pub name: String,
    #[serde(flatten)]
    pub location: DocLocation,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    /// Whether the name appears inside an API-reference region
    pub in_api_section: bool,
}

/// Spellings under which `component` may be documented, the input first.
///
/// - `esp_wifi_init` also tries its header `esp_wifi.h` / `esp_wifi` and `esp_wifi_init_t`
/// - a bare component such as `wifi` also tries `esp_wifi`
/// - `gpio.h` also tries `gpio`
///
/// # Errors
///
/// Returns `Error::InvalidQuery` if `component` is blank.
pub fn candidates(component: &str) -> Result<Vec<String>, Error> {
    let name = component.trim();
    if name.is_empty() {
        return Err(Error::InvalidQuery("component cannot be empty".into()));
    }

    let mut out = vec![name.to_string()];
    let base = name.strip_suffix(".h").unwrap_or(name);
    let identifier = !base.is_empty() && base.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if identifier {
        if base != name {
            out.push(base.to_string());
        }

        if let Some(stem) = header_stem(base) {
            out.push(format!("{stem}.h"));
            out.push(stem);
        } else if base == name {
            out.push(format!("{base}.h"));
        }

        if !base.ends_with("_t") {
            out.push(format!("{base}_t"));
        }
        if !base.contains('_') {
            out.push(format!("esp_{base}"));
        }
    }

    let mut unique = Vec::with_capacity(out.len());
    for candidate in out {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    Ok(unique)
}

/// Header a snake_case identifier is probably declared in.
///
/// `esp_`-prefixed names keep two parts (`esp_wifi_init` -> `esp_wifi`),
/// others one (`gpio_set_level` -> `gpio`).
fn header_stem(identifier: &str) -> Option<String> {
    let parts: Vec<&str> = identifier.split('_').filter(|p| !p.is_empty()).collect();
    let keep = if parts.first() == Some(&"esp") { 2 } else { 1 };
    (parts.len() > keep).then(|| parts[..keep].join("_"))
}

/// Rank `corpus` for `component`. No match yields an empty list.
///
/// # Errors
///
/// Returns `Error::InvalidQuery` if `component` is blank or longer than
/// `max_query_length`. Derived spellings over the limit are dropped.
pub fn find_references(
    component: &str, corpus: &[Arc<ParsedPage>], max_query_length: usize,
) -> Result<Vec<ApiReference>, Error> {
    let names = candidates(component)?;
    let mut queries = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        match Query::parse(name, max_query_length) {
            Ok(query) => queries.push(query),
            // only the name as given can fail the lookup; longer spellings are skipped
            Err(err) if i == 0 => return Err(err),
            Err(_) => continue,
        }
    }

    let mut best: HashMap<&str, ApiReference> = HashMap::new();

    for page in corpus {
        for (i, query) in queries.iter().enumerate() {
            let Some(reference) = score_page(query, page, i == 0) else { continue };

            let path = page.location.path();
            if best.get(path).is_none_or(|current| reference.score > current.score) {
                best.insert(path, reference);
            }
        }
    }

    let mut references: Vec<ApiReference> = best.into_values().collect();
    references.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.location.path().cmp(b.location.path()))
    });
    Ok(references)
}

fn score_page(query: &Query, page: &ParsedPage, literal: bool) -> Option<ApiReference> {
    let base = query.score(page);
    if base <= 0.0 {
        return None;
    }

    let in_api_section = query.is_match(&page.api_text);
    let mut score = base;
    if in_api_section {
        score += API_SECTION_BONUS;
    }
    if page.location.path().starts_with(API_PREFIX) {
        score += API_PATH_BONUS;
    }
    if !literal {
        score *= DERIVED_WEIGHT;
    }

    let context = if in_api_section { &page.api_text } else { &page.text };

    Some(ApiReference {
        name: query.as_str().to_string(),
        location: page.location.clone(),
        title: page.title.clone(),
        snippet: snippet(query, context),
        score,
        in_api_section,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::root;
    use chrono::Utc;

    fn page(path: &str, title: &str, text: &str, api_text: &str) -> Arc<ParsedPage> {
        Arc::new(ParsedPage {
            location: root().resolve(path).unwrap(),
            title: title.to_string(),
            text: text.to_string(),
            links: Vec::new(),
            api_text: api_text.to_string(),
            size: text.len(),
            derived_at: Utc::now(),
        })
    }

    #[test]
    fn test_candidates_for_function() {
        let names = candidates("esp_wifi_init").unwrap();
        assert_eq!(names, vec!["esp_wifi_init", "esp_wifi.h", "esp_wifi", "esp_wifi_init_t"]);
    }

    #[test]
    fn test_candidates_for_bare_component() {
        let names = candidates(" gpio ").unwrap();
        assert_eq!(names, vec!["gpio", "gpio.h", "gpio_t", "esp_gpio"]);
    }

    #[test]
    fn test_candidates_for_header() {
        let names = candidates("esp_wifi.h").unwrap();
        assert_eq!(names, vec!["esp_wifi.h", "esp_wifi", "esp_wifi_t"]);
    }

    #[test]
    fn test_candidates_for_type() {
        let names = candidates("gpio_config_t").unwrap();
        assert_eq!(names, vec!["gpio_config_t", "gpio.h", "gpio"]);
    }

    #[test]
    fn test_candidates_free_text_kept_literal() {
        assert_eq!(candidates("wifi driver").unwrap(), vec!["wifi driver"]);
    }

    #[test]
    fn test_blank_component_rejected() {
        assert!(matches!(candidates("  "), Err(Error::InvalidQuery(_))));
        assert!(matches!(find_references("", &[], 100), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_api_section_outranks_plain_mention() {
        let corpus = vec![
            page(
                "api-guides/wifi.html",
                "Wi-Fi Driver Guide",
                "Call esp_wifi_init before esp_wifi_start. Then esp_wifi_init again.",
                "",
            ),
            page(
                "api-reference/network/esp_wifi.html",
                "Wi-Fi",
                "API Reference\nesp_err_t esp_wifi_init(const wifi_init_config_t *config)",
                "esp_err_t esp_wifi_init(const wifi_init_config_t *config)",
            ),
        ];

        let references = find_references("esp_wifi_init", &corpus, 100).unwrap();

        assert_eq!(references.len(), 2);
        assert_eq!(references[0].location.path(), "api-reference/network/esp_wifi.html");
        assert!(references[0].in_api_section);
        assert_eq!(references[0].name, "esp_wifi_init");
        assert!(references[0].snippet.contains("esp_wifi_init(const"));
        assert!(!references[1].in_api_section);
    }

    #[test]
    fn test_merged_per_page() {
        let corpus = vec![page("api-reference/network/esp_wifi.html", "esp_wifi", "esp_wifi_init", "esp_wifi_init")];
        let references = find_references("esp_wifi_init", &corpus, 100).unwrap();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].name, "esp_wifi_init");
    }

    #[test]
    fn test_derived_spelling_found() {
        let corpus = vec![page("api-reference/peripherals/gpio.html", "GPIO", "Include gpio.h to use it.", "")];
        let references = find_references("gpio_set_level", &corpus, 100).unwrap();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].name, "gpio");
        assert!(!references[0].in_api_section);
    }

    #[test]
    fn test_long_name_drops_long_spellings() {
        let name = "a".repeat(97);
        let corpus = vec![page("api-reference/system/long.html", "Long", &format!("see {name} here"), "")];

        let references = find_references(&name, &corpus, 100).unwrap();
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].name, name);

        assert!(find_references(&name, &[], 100).unwrap().is_empty());
        assert!(matches!(find_references(&"a".repeat(101), &corpus, 100), Err(Error::InvalidQuery(_))));
    }

    #[test]
    fn test_nothing_matching_is_empty() {
        let corpus = vec![page("api-reference/system/log.html", "Logging", "ESP_LOGI", "esp_log_level_set")];
        assert!(find_references("esp_wifi_init", &corpus, 100).unwrap().is_empty());
    }
}
