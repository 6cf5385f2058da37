//! Registry metadata client.
//!
//! The registry exposes one JSON document per project (latest release) and
//! per release:
//!
//! ```text
//! GET <root>/<name>/json
//! GET <root>/<name>/<version>/json
//! ```
//!
//! Only the `info` block and the `urls` array of release files are used.

use std::time::Duration;

use serde::Deserialize;

use crate::core::error::InstallError;

/// Release metadata document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReleaseMetadata {
    pub info: ReleaseInfo,
    pub urls: Vec<ReleaseFile>,
}

/// The `info` block of a metadata document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReleaseInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub summary: Option<String>,
}

/// One downloadable file of a release.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReleaseFile {
    pub packagetype: String,
    pub url: String,
    pub filename: String,
    pub digests: Digests,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Digests {
    pub sha256: Option<String>,
}

/// Packaging types accepted when a release has no source distribution, in preference order.
const BINARY_FALLBACK_TYPES: &[&str] = &["bdist_wheel", "bdist_egg"];

/// Pick the file to build from.
///
/// The first source distribution wins; otherwise the first file whose
/// packaging type is a known binary distribution.
pub fn select_artifact(files: &[ReleaseFile]) -> Option<&ReleaseFile> {
    files
        .iter()
        .find(|f| f.packagetype == "sdist")
        .or_else(|| {
            files
                .iter()
                .find(|f| BINARY_FALLBACK_TYPES.contains(&f.packagetype.as_str()))
        })
}

/// Blocking client for the registry metadata endpoint.
pub struct RegistryClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl RegistryClient {
    /// Create a client for the given metadata root.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, InstallError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = build_http_client(timeout).map_err(|e| InstallError::Network {
            url: base_url.clone(),
            message: e.to_string(),
        })?;
        Ok(RegistryClient { base_url, http })
    }

    /// The metadata URL for a project, optionally at an exact version.
    pub fn metadata_url(&self, name: &str, version: Option<&str>) -> String {
        match version {
            Some(v) => format!("{}/{}/{}/json", self.base_url, name, v),
            None => format!("{}/{}/json", self.base_url, name),
        }
    }

    /// Fetch release metadata. A 404 means the project or version does not exist.
    pub fn fetch_metadata(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<ReleaseMetadata, InstallError> {
        let url = self.metadata_url(name, version);
        tracing::info!("Fetching package info for {}", name);
        tracing::debug!("GET {}", url);

        let response = self.http.get(&url).send().map_err(|e| InstallError::Network {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(InstallError::NotFound {
                package: name.to_string(),
                version: version.map(str::to_string),
            });
        }
        if !status.is_success() {
            return Err(InstallError::Network {
                url,
                message: format!("HTTP {}", status),
            });
        }

        let body = response.bytes().map_err(|e| InstallError::Network {
            url: url.clone(),
            message: format!("failed to read response body: {}", e),
        })?;

        serde_json::from_slice(&body).map_err(|e| InstallError::Network {
            url,
            message: format!("invalid metadata document: {}", e),
        })
    }
}

/// Shared HTTP client settings for metadata and downloads.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("srcinstall/", env!("CARGO_PKG_VERSION")))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn file(packagetype: &str, filename: &str) -> ReleaseFile {
        ReleaseFile {
            packagetype: packagetype.to_string(),
            url: format!("https://files.example/{}", filename),
            filename: filename.to_string(),
            digests: Digests::default(),
        }
    }

    #[test]
    fn test_select_prefers_source_distribution() {
        let files = vec![
            file("bdist_wheel", "foo-1.0-py3-none-any.whl"),
            file("sdist", "foo-1.0.tar.gz"),
            file("sdist", "foo-1.0.zip"),
        ];
        assert_eq!(select_artifact(&files).unwrap().filename, "foo-1.0.tar.gz");
    }

    #[test]
    fn test_select_falls_back_to_binary() {
        let files = vec![
            file("bdist_msi", "foo-1.0.msi"),
            file("bdist_egg", "foo-1.0.egg"),
            file("bdist_wheel", "foo-1.0-py3-none-any.whl"),
        ];
        assert_eq!(select_artifact(&files).unwrap().filename, "foo-1.0.egg");
        assert!(select_artifact(&[file("bdist_msi", "foo.msi")]).is_none());
        assert!(select_artifact(&[]).is_none());
    }

    #[test]
    fn test_metadata_urls() {
        let client = RegistryClient::new("https://pypi.org/pypi/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.metadata_url("foo", Some("1.2.3")),
            "https://pypi.org/pypi/foo/1.2.3/json"
        );
        assert_eq!(client.metadata_url("foo", None), "https://pypi.org/pypi/foo/json");
    }

    #[test]
    fn test_fetch_metadata_parses_document() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/pypi/foo/1.2.3/json");
            then.status(200).json_body(serde_json::json!({
                "info": {"name": "foo", "version": "1.2.3", "summary": "Foo things"},
                "urls": [{
                    "packagetype": "sdist",
                    "url": "https://files.example/foo-1.2.3.tar.gz",
                    "filename": "foo-1.2.3.tar.gz",
                    "digests": {"sha256": "abc"},
                    "size": 10
                }]
            }));
        });

        let client = RegistryClient::new(server.url("/pypi"), Duration::from_secs(5)).unwrap();
        let meta = client.fetch_metadata("foo", Some("1.2.3")).unwrap();

        mock.assert();
        assert_eq!(meta.info.version.as_deref(), Some("1.2.3"));
        assert_eq!(meta.urls.len(), 1);
        assert_eq!(meta.urls[0].digests.sha256.as_deref(), Some("abc"));
    }

    #[test]
    fn test_fetch_metadata_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/pypi/nope/json");
            then.status(404);
        });

        let client = RegistryClient::new(server.url("/pypi"), Duration::from_secs(5)).unwrap();
        let err = client.fetch_metadata("nope", None).unwrap_err();
        assert!(matches!(err, InstallError::NotFound { .. }));
    }

    #[test]
    fn test_fetch_metadata_server_error_is_network_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/pypi/foo/json");
            then.status(503);
        });

        let client = RegistryClient::new(server.url("/pypi"), Duration::from_secs(5)).unwrap();
        let err = client.fetch_metadata("foo", None).unwrap_err();
        assert!(matches!(err, InstallError::Network { .. }));
    }
}
