// MIT License - Copyright (c) 2026 Peter Wright

//! Thin HTTP layer over the panel's web interface.
//!
//! One shared `reqwest` client carries the persistent cookie jar. Bodies are
//! decoded as UTF-8 regardless of the declared charset (the SPC firmware
//! declares ISO-8859-1 while serving UTF-8 French labels). Any HTTP status
//! >= 400 is an error; redirects are followed and the final URL is kept,
//! because the session id shows up there after login.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::cookies::FileCookieJar;
use crate::error::{Result, SpcError};

/// Per-request timeout. The panel is a slow embedded web server.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

const USER_AGENT: &str = concat!("spc42-client/", env!("CARGO_PKG_VERSION"));

/// A fetched page: the URL the request ended up at plus the decoded body.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub final_url: String,
    pub body: String,
}

/// Shared HTTP client bound to one panel host.
pub struct PanelClient {
    http: reqwest::Client,
    jar: Arc<FileCookieJar>,
    base: String,
}

impl PanelClient {
    pub fn new(host: &str, jar: Arc<FileCookieJar>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_provider(Arc::clone(&jar))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            jar,
            base: host.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve a path (or keep an already-absolute URL) against the panel host.
    pub fn absolute(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!("{}/{}", self.base, path_or_url.trim_start_matches('/'))
        }
    }

    pub async fn get(&self, path_or_url: &str) -> Result<PageResponse> {
        let resp = self.http.get(self.absolute(path_or_url)).send().await?;
        self.finish(resp).await
    }

    pub async fn post_form(
        &self,
        path_or_url: &str,
        form: &[(String, String)],
    ) -> Result<PageResponse> {
        let resp = self
            .http
            .post(self.absolute(path_or_url))
            .form(form)
            .send()
            .await?;
        self.finish(resp).await
    }

    async fn finish(&self, resp: reqwest::Response) -> Result<PageResponse> {
        let code = resp.status().as_u16();
        if code >= 400 {
            return Err(SpcError::Status { code });
        }
        let final_url = resp.url().to_string();
        let bytes = resp.bytes().await?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        // Best effort; a read-only state dir must not break scans.
        if let Err(e) = self.jar.save() {
            warn!("Cannot persist cookie jar: {e}");
        }

        Ok(PageResponse { final_url, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PanelClient {
        let dir = tempfile::tempdir().unwrap();
        let jar = Arc::new(FileCookieJar::load_or_empty(&dir.path().join("jar")));
        PanelClient::new("http://panel.local/", jar).unwrap()
    }

    #[test]
    fn test_absolute_joins_relative_paths() {
        let c = client();
        assert_eq!(c.absolute("/login.htm"), "http://panel.local/login.htm");
        assert_eq!(c.absolute("login.htm"), "http://panel.local/login.htm");
    }

    #[test]
    fn test_absolute_keeps_full_urls() {
        let c = client();
        assert_eq!(
            c.absolute("http://panel.local/secure.htm?session=x"),
            "http://panel.local/secure.htm?session=x"
        );
    }
}
