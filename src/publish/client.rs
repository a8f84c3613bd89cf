//! GitHub releases REST client.
//!
//! A thin, typed wrapper over the handful of endpoints capstan needs. The
//! one piece of real policy lives in the error surface: a 404 is a distinct
//! [`ApiError::NotFound`] (surfaced as `Ok(None)` by the lookup calls)
//! because "release doesn't exist yet" is expected control flow, while any
//! other non-success status is a hard failure.

use reqwest::blocking::Client;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors produced by the GitHub API client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("GitHub API request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid GitHub credential: {0}")]
    Credential(#[from] reqwest::header::InvalidHeaderValue),

    #[error("invalid upload URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A release as returned by the API. Owned by GitHub; capstan only ever
/// mutates it through further API calls.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    pub upload_url: String,
    pub html_url: String,
    #[serde(default)]
    pub draft: bool,
}

/// An asset attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
    pub browser_download_url: String,
}

/// Parameters for creating a release.
#[derive(Debug, Clone, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_commitish: Option<String>,
}

/// Blocking client for the GitHub releases API.
pub struct ReleaseClient {
    http: Client,
    base: String,
    owner: String,
    repo: String,
}

impl std::fmt::Debug for ReleaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseClient")
            .field("base", &self.base)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish()
    }
}

fn check(response: reqwest::blocking::Response) -> ApiResult<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound { url });
    }

    let message = response.text().unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

impl ReleaseClient {
    /// Create a client for `owner/repo` against `api_url`, authenticating
    /// with the given bearer token.
    pub fn new(api_url: &Url, token: &str, owner: &str, repo: &str) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("capstan"));

        let http = Client::builder().default_headers(headers).build()?;

        Ok(ReleaseClient {
            http,
            base: api_url.as_str().trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base, self.owner, self.repo, path)
    }

    /// Fetch a release by tag. Draft releases are invisible to this
    /// endpoint. Returns `Ok(None)` when the tag has no release.
    pub fn release_by_tag(&self, tag: &str) -> ApiResult<Option<Release>> {
        let url = self.repo_url(&format!("releases/tags/{tag}"));
        match check(self.http.get(&url).send()?) {
            Ok(response) => Ok(Some(response.json()?)),
            Err(ApiError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch a release by its numeric id.
    pub fn release_by_id(&self, id: u64) -> ApiResult<Release> {
        let url = self.repo_url(&format!("releases/{id}"));
        Ok(check(self.http.get(&url).send()?)?.json()?)
    }

    /// List one page of the repository's releases, drafts included.
    pub fn releases(&self, page: u32, per_page: u32) -> ApiResult<Vec<Release>> {
        let url = self.repo_url("releases");
        let response = self
            .http
            .get(&url)
            .query(&[("per_page", per_page), ("page", page)])
            .send()?;
        Ok(check(response)?.json()?)
    }

    /// Create a release.
    pub fn create_release(&self, new: &NewRelease) -> ApiResult<Release> {
        let url = self.repo_url("releases");
        Ok(check(self.http.post(&url).json(new).send()?)?.json()?)
    }

    /// List the assets attached to a release.
    pub fn assets(&self, release_id: u64) -> ApiResult<Vec<ReleaseAsset>> {
        let url = self.repo_url(&format!("releases/{release_id}/assets"));
        let response = self.http.get(&url).query(&[("per_page", 100u32)]).send()?;
        Ok(check(response)?.json()?)
    }

    /// Delete a release asset.
    pub fn delete_asset(&self, asset_id: u64) -> ApiResult<()> {
        let url = self.repo_url(&format!("releases/assets/{asset_id}"));
        check(self.http.delete(&url).send()?)?;
        Ok(())
    }

    /// Upload `data` as a release asset named `name`.
    pub fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        data: Vec<u8>,
    ) -> ApiResult<ReleaseAsset> {
        // The upload endpoint comes back as a URI template
        // (`.../assets{?name,label}`); drop the template part and supply the
        // name ourselves.
        let bare = release
            .upload_url
            .split('{')
            .next()
            .unwrap_or(&release.upload_url);
        let mut url = Url::parse(bare)?;
        url.query_pairs_mut().append_pair("name", name);

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/zip")
            .header(CONTENT_LENGTH, data.len())
            .body(data)
            .send()?;
        Ok(check(response)?.json()?)
    }

    /// Download an asset's content.
    pub fn download(&self, url: &str) -> ApiResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/octet-stream")
            .send()?;
        Ok(check(response)?.bytes()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &mockito::ServerGuard) -> ReleaseClient {
        let url = Url::parse(&server.url()).unwrap();
        ReleaseClient::new(&url, "fake-token", "octo", "widgets").unwrap()
    }

    #[test]
    fn test_release_by_tag_found() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/repos/octo/widgets/releases/tags/v1.0.0")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id": 7, "tag_name": "v1.0.0", "upload_url": "u", "html_url": "h", "draft": false}"#,
            )
            .create();

        let release = client(&server).release_by_tag("v1.0.0").unwrap().unwrap();
        assert_eq!(release.id, 7);
        assert_eq!(release.tag_name, "v1.0.0");
    }

    #[test]
    fn test_release_by_tag_missing_is_none() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/repos/octo/widgets/releases/tags/v9.9.9")
            .with_status(404)
            .create();

        assert!(client(&server).release_by_tag("v9.9.9").unwrap().is_none());
    }

    #[test]
    fn test_non_404_error_is_fatal() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("GET", "/repos/octo/widgets/releases/tags/v1.0.0")
            .with_status(500)
            .with_body("boom")
            .create();

        let err = client(&server).release_by_tag("v1.0.0").unwrap_err();
        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error variant: {other}"),
        }
    }

    #[test]
    fn test_upload_asset_strips_uri_template() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/upload/releases/7/assets")
            .match_query(mockito::Matcher::UrlEncoded(
                "name".into(),
                "demo.deb".into(),
            ))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 1, "name": "demo.deb", "browser_download_url": "d"}"#)
            .create();

        let release = Release {
            id: 7,
            tag_name: "v1.0.0".to_string(),
            upload_url: format!("{}/upload/releases/7/assets{{?name,label}}", server.url()),
            html_url: "h".to_string(),
            draft: false,
        };

        let asset = client(&server)
            .upload_asset(&release, "demo.deb", b"content".to_vec())
            .unwrap();
        assert_eq!(asset.name, "demo.deb");
        mock.assert();
    }

    #[test]
    fn test_delete_asset() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("DELETE", "/repos/octo/widgets/releases/assets/42")
            .with_status(204)
            .create();

        client(&server).delete_asset(42).unwrap();
        mock.assert();
    }
}
