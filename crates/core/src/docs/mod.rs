//! Documentation model: versions, sandboxed locations and parsed pages.
//!
//! ### URL Layout
//! - Root: `{base}/en/{version}/` or `{base}/en/{version}/{chip}/`
//! - Documents: root joined with a normalized relative path
//!
//! ### Sandbox
//! - A [`DocLocation`] can only be obtained through a [`DocRoot`], which
//!   rejects any path that would leave the root.
//! - Absolute URLs are accepted only when they already lie inside the root.

mod page;
mod resolve;

pub use page::{DocLink, ParsedPage};

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::Error;

/// A documentation edition ("latest", "v5.1", ...) with an optional chip target.
///
/// Two versions are equal iff both the version string and the chip target match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocVersion {
    version: String,
    chip_target: Option<String>,
}

impl DocVersion {
    pub fn new(version: impl Into<String>, chip_target: Option<String>) -> Self {
        Self { version: version.into(), chip_target }
    }

    /// The rolling "latest" edition without a chip target.
    pub fn latest() -> Self {
        Self::new("latest", None)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn chip_target(&self) -> Option<&str> {
        self.chip_target.as_deref()
    }

    /// Relative URL prefix for this edition, always ending in `/`.
    fn url_prefix(&self) -> String {
        match &self.chip_target {
            Some(chip) => format!("en/{}/{}/", self.version, chip),
            None => format!("en/{}/", self.version),
        }
    }

    fn validate(&self) -> Result<(), Error> {
        validate_segment("version", &self.version)?;
        if let Some(chip) = &self.chip_target {
            validate_segment("chip_target", chip)?;
        }
        Ok(())
    }
}

impl Default for DocVersion {
    fn default() -> Self {
        Self::latest()
    }
}

impl fmt::Display for DocVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chip_target {
            Some(chip) => write!(f, "{}/{}", self.version, chip),
            None => f.write_str(&self.version),
        }
    }
}

fn validate_segment(field: &str, value: &str) -> Result<(), Error> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));

    if valid { Ok(()) } else { Err(Error::InvalidInput(format!("invalid {field}: {value:?}"))) }
}

/// A resolved, sandboxed reference to one document under a [`DocRoot`].
///
/// `path` is relative to the root, normalized, and never leaves it. The empty
/// path is the root document itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DocLocation {
    version: DocVersion,
    path: String,
    url: Url,
}

impl DocLocation {
    pub fn version(&self) -> &DocVersion {
        &self.version
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Non-empty path segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    /// Directory part of the path including its trailing `/`, or `""` at the top level.
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..=idx],
            None => "",
        }
    }
}

impl fmt::Display for DocLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// The documentation root for one [`DocVersion`]; the only way to obtain a [`DocLocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocRoot {
    version: DocVersion,
    root_url: Url,
}

impl DocRoot {
    /// Build the root for `version` under `base_url`.
    ///
    /// The base must be an http(s) URL; query and fragment are dropped.
    pub fn new(base_url: &Url, version: DocVersion) -> Result<Self, Error> {
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(format!("unsupported documentation base: {base_url}")));
        }
        version.validate()?;

        let mut base = base_url.clone();
        base.set_query(None);
        base.set_fragment(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let root_url = base
            .join(&version.url_prefix())
            .map_err(|e| Error::InvalidUrl(e.to_string()))?;

        Ok(Self { version, root_url })
    }

    pub fn version(&self) -> &DocVersion {
        &self.version
    }

    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    /// The root document.
    pub fn root(&self) -> DocLocation {
        DocLocation { version: self.version.clone(), path: String::new(), url: self.root_url.clone() }
    }

    /// Resolve a relative path (or an absolute URL inside the root) to a location.
    ///
    /// An empty path resolves to the root document.
    pub fn resolve(&self, input: &str) -> Result<DocLocation, Error> {
        let trimmed = input.trim();

        let url = if trimmed.contains("://") {
            resolve::reject_parent_in_url(trimmed)?;
            Url::parse(trimmed).map_err(|e| Error::InvalidPath(format!("{trimmed}: {e}")))?
        } else {
            let relative = resolve::normalize_relative(trimmed)?;
            self.root_url
                .join(&relative)
                .map_err(|e| Error::InvalidPath(format!("{trimmed}: {e}")))?
        };

        self.locate(&url)
            .ok_or_else(|| Error::InvalidPath(format!("{trimmed} is outside the documentation root {}", self.root_url)))
    }

    /// Like [`DocRoot::resolve`], but a concrete document must be named.
    pub fn resolve_document(&self, input: &str) -> Result<DocLocation, Error> {
        let location = self.resolve(input)?;
        if location.is_root() && !input.trim().contains("://") {
            return Err(Error::InvalidPath(format!("{:?} does not name a document", input.trim())));
        }
        Ok(location)
    }

    /// Map an absolute URL back to a location if it is same-tree.
    ///
    /// Query and fragment are ignored. Returns `None` for other hosts, schemes,
    /// ports, or paths outside the root.
    pub fn locate(&self, url: &Url) -> Option<DocLocation> {
        if url.scheme() != self.root_url.scheme()
            || url.host_str() != self.root_url.host_str()
            || url.port_or_known_default() != self.root_url.port_or_known_default()
        {
            return None;
        }

        let root_path = self.root_url.path();
        let path = url.path();
        let relative = if let Some(rest) = path.strip_prefix(root_path) {
            rest
        } else if root_path.strip_suffix('/') == Some(path) {
            ""
        } else {
            return None;
        };

        if relative.split('/').any(|s| s == "..") {
            return None;
        }

        let mut resolved = self.root_url.clone();
        resolved.set_path(&format!("{root_path}{relative}"));

        Some(DocLocation { version: self.version.clone(), path: relative.to_string(), url: resolved })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://docs.espressif.com/projects/esp-idf";

    fn root() -> DocRoot {
        DocRoot::new(&Url::parse(BASE).unwrap(), DocVersion::latest()).unwrap()
    }

    fn esp32_root() -> DocRoot {
        DocRoot::new(&Url::parse(BASE).unwrap(), DocVersion::new("v5.1", Some("esp32".into()))).unwrap()
    }

    #[test]
    fn test_root_url_layout() {
        assert_eq!(root().root_url().as_str(), "https://docs.espressif.com/projects/esp-idf/en/latest/");
        assert_eq!(esp32_root().root_url().as_str(), "https://docs.espressif.com/projects/esp-idf/en/v5.1/esp32/");
    }

    #[test]
    fn test_base_with_trailing_slash() {
        let root = DocRoot::new(&Url::parse(&format!("{BASE}/")).unwrap(), DocVersion::latest()).unwrap();
        assert_eq!(root.root_url().as_str(), "https://docs.espressif.com/projects/esp-idf/en/latest/");
    }

    #[test]
    fn test_version_equality() {
        assert_eq!(DocVersion::new("v5.1", None), DocVersion::new("v5.1", None));
        assert_ne!(DocVersion::new("v5.1", None), DocVersion::new("v5.1", Some("esp32".into())));
        assert_ne!(DocVersion::new("v5.1", Some("esp32".into())), DocVersion::new("v5.1", Some("esp32s3".into())));
        assert_eq!(DocVersion::new("v5.1", Some("esp32".into())).to_string(), "v5.1/esp32");
    }

    #[test]
    fn test_invalid_version_rejected() {
        let base = Url::parse(BASE).unwrap();
        assert!(matches!(DocRoot::new(&base, DocVersion::new("..", None)), Err(Error::InvalidInput(_))));
        assert!(matches!(DocRoot::new(&base, DocVersion::new("a/b", None)), Err(Error::InvalidInput(_))));
        assert!(matches!(DocRoot::new(&base, DocVersion::new("", None)), Err(Error::InvalidInput(_))));
        assert!(matches!(
            DocRoot::new(&base, DocVersion::new("latest", Some("../x".into()))),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unsupported_base_scheme() {
        let base = Url::parse("file:///tmp/docs").unwrap();
        assert!(matches!(DocRoot::new(&base, DocVersion::latest()), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_relative_document() {
        let loc = root().resolve("api-reference/network/esp_wifi.html").unwrap();
        assert_eq!(loc.path(), "api-reference/network/esp_wifi.html");
        assert_eq!(
            loc.url().as_str(),
            "https://docs.espressif.com/projects/esp-idf/en/latest/api-reference/network/esp_wifi.html"
        );
        assert_eq!(loc.directory(), "api-reference/network/");
        assert_eq!(loc.segments().collect::<Vec<_>>(), vec!["api-reference", "network", "esp_wifi.html"]);
    }

    #[test]
    fn test_resolve_collapses_dot_and_empty_segments() {
        let loc = root().resolve("./api-guides//./wifi.html").unwrap();
        assert_eq!(loc.path(), "api-guides/wifi.html");
    }

    #[test]
    fn test_resolve_keeps_directory_slash() {
        let loc = root().resolve("api-reference/").unwrap();
        assert_eq!(loc.path(), "api-reference/");
        assert_eq!(loc.directory(), "api-reference/");
    }

    #[test]
    fn test_resolve_strips_fragment_and_query() {
        let loc = root().resolve("api-guides/wifi.html#station-mode").unwrap();
        assert_eq!(loc.path(), "api-guides/wifi.html");
        let loc = root().resolve("search.html?q=wifi").unwrap();
        assert_eq!(loc.path(), "search.html");
    }

    #[test]
    fn test_resolve_empty_is_root() {
        let loc = root().resolve("   ").unwrap();
        assert!(loc.is_root());
        assert_eq!(loc, root().root());
    }

    #[test]
    fn test_resolve_document_rejects_empty() {
        assert!(matches!(root().resolve_document(""), Err(Error::InvalidPath(_))));
        assert!(matches!(root().resolve_document("./"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_resolve_rejects_parent_segments() {
        let root = root();
        for path in ["../secret", "api-reference/../../x", "a/..", "..", "a/%2e%2e/b", "a/.%2E/b"] {
            assert!(matches!(root.resolve(path), Err(Error::InvalidPath(_))), "{path} should be rejected");
        }
    }

    #[test]
    fn test_resolve_rejects_absolute_and_protocol_relative() {
        let root = root();
        assert!(matches!(root.resolve("/etc/passwd"), Err(Error::InvalidPath(_))));
        assert!(matches!(root.resolve("//evil.example.com/x"), Err(Error::InvalidPath(_))));
        assert!(matches!(root.resolve("a\\..\\b"), Err(Error::InvalidPath(_))));
        assert!(matches!(root.resolve("javascript:alert(1)"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_resolve_absolute_url_inside_root() {
        let loc = root()
            .resolve("https://docs.espressif.com/projects/esp-idf/en/latest/get-started/index.html")
            .unwrap();
        assert_eq!(loc.path(), "get-started/index.html");
    }

    #[test]
    fn test_resolve_absolute_url_outside_root() {
        let root = root();
        assert!(matches!(root.resolve("https://example.com/en/latest/x.html"), Err(Error::InvalidPath(_))));
        assert!(matches!(
            root.resolve("https://docs.espressif.com/projects/esp-idf/en/v5.1/x.html"),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            root.resolve("https://docs.espressif.com/projects/esp-idf/en/latest/../../../x.html"),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            root.resolve("https://docs.espressif.com/projects/esp-idf/en/latest/a/../b.html"),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            root.resolve("https://docs.espressif.com/projects/esp-idf/en/latest/a/%2e%2e/b.html"),
            Err(Error::InvalidPath(_))
        ));
        assert!(root.resolve("https://docs.espressif.com/projects/esp-idf/en/latest/a/b.html").is_ok());
    }

    #[test]
    fn test_locate_same_tree() {
        let root = esp32_root();
        let url = Url::parse("https://docs.espressif.com/projects/esp-idf/en/v5.1/esp32/api-reference/index.html#top")
            .unwrap();
        let loc = root.locate(&url).unwrap();
        assert_eq!(loc.path(), "api-reference/index.html");
        assert_eq!(loc.url().fragment(), None);
        assert_eq!(loc.version(), root.version());
    }

    #[test]
    fn test_locate_root_without_slash() {
        let url = Url::parse("https://docs.espressif.com/projects/esp-idf/en/latest").unwrap();
        assert!(root().locate(&url).unwrap().is_root());
    }

    #[test]
    fn test_locate_rejects_cross_site_and_other_versions() {
        let root = esp32_root();
        for url in [
            "https://github.com/espressif/esp-idf",
            "http://docs.espressif.com/projects/esp-idf/en/v5.1/esp32/index.html",
            "https://docs.espressif.com/projects/esp-idf/en/v5.1/esp32s3/index.html",
            "https://docs.espressif.com/projects/esp-idf/zh_CN/v5.1/esp32/index.html",
        ] {
            assert!(root.locate(&Url::parse(url).unwrap()).is_none(), "{url} should not be same-tree");
        }
    }

    #[test]
    fn test_percent_encoded_path_keys_match() {
        let root = root();
        let from_path = root.resolve("api guides/wi fi.html").unwrap();
        let from_url = root.locate(from_path.url()).unwrap();
        assert_eq!(from_path, from_url);
    }
}
