// MIT License - Copyright (c) 2026 Peter Wright

//! Session acquisition and persistence against the panel's login form.
//!
//! The SPC42 expires sessions unpredictably and rate-limits sloppy clients,
//! so the manager reuses a cached session id as long as the panel accepts it,
//! re-validates before ever logging in again, and enforces a global minimum
//! interval between login attempts. Failed logins back off exponentially.

use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::SpcSection;
use crate::constants::{
    LOGIN_MARKERS, LOGIN_PATH, PAGE_HOME, PANEL_TOKEN, SESSION_FILE, secure_page_path,
};
use crate::error::{Result, SpcError};
use crate::http::PanelClient;

/// Cached session record, persisted as `spc_session.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord {
    host: String,
    session: String,
    /// Unix seconds (fractional) of the login that produced this id.
    time: f64,
}

const VALIDATE_RETRY_DELAY: Duration = Duration::from_secs(2);
const BACKOFF_BASE: Duration = Duration::from_secs(2);
const BACKOFF_CAP: Duration = Duration::from_secs(60);

pub struct SessionManager {
    host: String,
    user: String,
    pin: String,
    language: u32,
    cache_file: PathBuf,
    min_login_interval: Duration,
    /// Last time a login POST was issued, successful or not. Enforces the
    /// at-most-one-login-per-window rule within the process.
    last_login_attempt: Option<Instant>,
    last_login_fail: Option<Instant>,
    backoff: Duration,
}

impl SessionManager {
    /// Create the manager and make sure the cache directory is usable.
    pub fn new(spc: &SpcSection) -> Result<Self> {
        std::fs::create_dir_all(&spc.session_cache_dir).map_err(|e| SpcError::StateDir {
            path: spc.session_cache_dir.clone(),
            source: e,
        })?;
        Ok(Self {
            host: spc.host.clone(),
            user: spc.user.clone(),
            pin: spc.pin.clone(),
            language: spc.language,
            cache_file: spc.session_cache_dir.join(SESSION_FILE),
            min_login_interval: Duration::from_secs(spc.min_login_interval_sec),
            last_login_attempt: None,
            last_login_fail: None,
            backoff: Duration::ZERO,
        })
    }

    /// Return a valid session id, logging in if allowed, or `None`.
    ///
    /// Network failures never bubble up from validation; the only hard error
    /// out of here is an unwritable session cache.
    pub async fn get_or_login(&mut self, client: &PanelClient) -> Result<Option<String>> {
        let cached = self.load_cache();
        let sid = cached.as_ref().map(|r| r.session.clone());

        if let Some(sid) = &sid
            && self.validate(client, sid).await
        {
            return Ok(Some(sid.clone()));
        }

        // After a failed login, wait out the backoff window and give the
        // cached id one more chance (another process may have logged in).
        if let Some(failed_at) = self.last_login_fail
            && failed_at.elapsed() < self.backoff
        {
            let remaining = self.backoff.saturating_sub(failed_at.elapsed());
            debug!("Login backoff active, waiting {:.1}s", remaining.as_secs_f64());
            sleep(remaining.min(BACKOFF_CAP)).await;
            if let Some(sid) = &sid
                && self.validate(client, sid).await
            {
                return Ok(Some(sid.clone()));
            }
        }

        if self.login_too_recent(cached.as_ref()) {
            sleep(VALIDATE_RETRY_DELAY).await;
            if let Some(sid) = &sid
                && self.validate(client, sid).await
            {
                return Ok(Some(sid.clone()));
            }
            debug!("Within minimum login interval, not logging in");
            return Ok(None);
        }

        self.login(client).await
    }

    /// Check whether the panel still accepts a session id.
    async fn validate(&self, client: &PanelClient, session_id: &str) -> bool {
        let path = secure_page_path(session_id, PAGE_HOME);
        match client.get(&path).await {
            Ok(resp) => body_indicates_valid(&resp.body),
            Err(e) => {
                debug!("Session validation request failed: {e}");
                false
            }
        }
    }

    /// Perform the login sequence and persist the new session on success.
    async fn login(&mut self, client: &PanelClient) -> Result<Option<String>> {
        // Seed cookies; the controller may set one before accepting the POST.
        let _ = client.get(LOGIN_PATH).await;

        self.last_login_attempt = Some(Instant::now());
        let url = format!("{LOGIN_PATH}?action=login&language={}", self.language);
        let form = [
            ("userid".to_string(), self.user.clone()),
            ("password".to_string(), self.pin.clone()),
        ];

        let resp = match client.post_form(&url, &form).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Login request failed: {e}");
                self.note_login_failure();
                return Ok(None);
            }
        };

        let sid = extract_session(&resp.final_url).or_else(|| extract_session(&resp.body));
        match sid {
            Some(sid) => {
                self.store_cache(&sid)?;
                self.last_login_fail = None;
                self.backoff = Duration::ZERO;
                info!("Logged in to panel, new session acquired");
                Ok(Some(sid))
            }
            None => {
                warn!("Login succeeded at HTTP level but no session id was returned");
                self.note_login_failure();
                Ok(None)
            }
        }
    }

    fn note_login_failure(&mut self) {
        self.last_login_fail = Some(Instant::now());
        self.backoff = (self.backoff.max(BACKOFF_BASE / 2) * 2).min(BACKOFF_CAP);
    }

    /// Whether a login happened recently enough that another is forbidden.
    ///
    /// A jitter of up to 20% of the interval avoids several instances
    /// stampeding the panel at the same moment.
    fn login_too_recent(&self, cached: Option<&SessionRecord>) -> bool {
        if let Some(attempt) = self.last_login_attempt
            && attempt.elapsed() < self.min_login_interval
        {
            return true;
        }
        let Some(record) = cached else { return false };
        let age = unix_now() - record.time;
        let jitter = rand::rng().random_range(0.0..=self.min_login_interval.as_secs_f64() * 0.2);
        age < self.min_login_interval.as_secs_f64() + jitter
    }

    fn load_cache(&self) -> Option<SessionRecord> {
        let text = std::fs::read_to_string(&self.cache_file).ok()?;
        let record: SessionRecord = serde_json::from_str(&text).ok()?;
        if record.host != self.host {
            debug!(
                "Ignoring cached session for different host {} (this panel: {})",
                record.host, self.host
            );
            return None;
        }
        if record.session.is_empty() {
            return None;
        }
        Some(record)
    }

    /// Atomically rewrite `spc_session.json`.
    fn store_cache(&self, session_id: &str) -> Result<()> {
        let record = SessionRecord {
            host: self.host.clone(),
            session: session_id.to_string(),
            time: unix_now(),
        };
        let dir = self.cache_file.parent().unwrap_or(std::path::Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string(&record)?.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.cache_file).map_err(|e| e.error)?;
        Ok(())
    }
}

fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// A protected page was actually served (not the login form in disguise).
pub fn body_indicates_valid(body: &str) -> bool {
    let low = body.to_lowercase();
    !LOGIN_MARKERS.iter().any(|m| low.contains(m)) && low.contains(PANEL_TOKEN)
}

/// Extract the session token from a URL or a response body.
pub fn extract_session(text: &str) -> Option<String> {
    static QUERY_RE: OnceLock<Regex> = OnceLock::new();
    static HREF_RE: OnceLock<Regex> = OnceLock::new();
    let query = QUERY_RE.get_or_init(|| Regex::new(r"[?&]session=([0-9A-Za-zx]+)").unwrap());
    let href = HREF_RE
        .get_or_init(|| Regex::new(r#"secure\.htm\?[^"'>]*session=([0-9A-Za-zx]+)"#).unwrap());

    query
        .captures(text)
        .or_else(|| href.captures(text))
        .map(|c| c[1].to_string())
}
