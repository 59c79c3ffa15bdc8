// MIT License - Copyright (c) 2026 Peter Wright

//! Durable cookie jar shared by every panel request.
//!
//! The jar is a mapping from `(domain, name)` to cookie attributes, persisted
//! between restarts in the Netscape/Mozilla text format so that other tools
//! (curl, wget) can read it. Writes go through a temp file and an atomic
//! rename; a reader never observes a truncated jar.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use reqwest::Url;
use reqwest::header::HeaderValue;
use tracing::{debug, warn};

use crate::error::Result;

const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredCookie {
    domain: String,
    include_subdomains: bool,
    path: String,
    secure: bool,
    /// Unix seconds; 0 marks a session cookie (kept across restarts anyway,
    /// the panel re-issues or expires them server-side).
    expires: i64,
    name: String,
    value: String,
}

impl StoredCookie {
    fn to_netscape_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.domain,
            if self.include_subdomains { "TRUE" } else { "FALSE" },
            self.path,
            if self.secure { "TRUE" } else { "FALSE" },
            self.expires,
            self.name,
            self.value
        )
    }

    fn from_netscape_line(line: &str) -> Option<Self> {
        // curl writes HttpOnly cookies with a marker prefix
        let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            return None;
        }
        Some(Self {
            domain: fields[0].to_string(),
            include_subdomains: fields[1].eq_ignore_ascii_case("TRUE"),
            path: fields[2].to_string(),
            secure: fields[3].eq_ignore_ascii_case("TRUE"),
            expires: fields[4].parse().ok()?,
            name: fields[5].to_string(),
            value: fields[6].to_string(),
        })
    }

    fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let domain_ok = if self.include_subdomains {
            host == self.domain || host.ends_with(&format!(".{}", self.domain))
        } else {
            host == self.domain
        };
        let path_ok = url.path().starts_with(&self.path);
        let scheme_ok = !self.secure || url.scheme() == "https";
        domain_ok && path_ok && scheme_ok
    }
}

/// Cookie jar persisted to disk, pluggable into `reqwest` as a cookie
/// provider.
pub struct FileCookieJar {
    path: PathBuf,
    cookies: RwLock<HashMap<(String, String), StoredCookie>>,
}

impl FileCookieJar {
    /// Load the jar from `path`, or start empty.
    ///
    /// A corrupt jar file is deleted and replaced by an empty jar rather than
    /// failing startup.
    pub fn load_or_empty(path: &Path) -> Self {
        let mut cookies = HashMap::new();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let mut bad_lines = 0usize;
                for line in text.lines() {
                    let trimmed = line.trim();
                    if trimmed.is_empty()
                        || (trimmed.starts_with('#') && !trimmed.starts_with("#HttpOnly_"))
                    {
                        continue;
                    }
                    match StoredCookie::from_netscape_line(trimmed) {
                        Some(c) => {
                            cookies.insert((c.domain.clone(), c.name.clone()), c);
                        }
                        None => bad_lines += 1,
                    }
                }
                if bad_lines > 0 {
                    warn!(
                        "Cookie jar {} is corrupt ({bad_lines} bad lines), starting empty",
                        path.display()
                    );
                    cookies.clear();
                    let _ = std::fs::remove_file(path);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Cannot read cookie jar {}: {e}, starting empty", path.display());
                let _ = std::fs::remove_file(path);
            }
        }
        debug!("Cookie jar loaded: {} cookies", cookies.len());
        Self {
            path: path.to_path_buf(),
            cookies: RwLock::new(cookies),
        }
    }

    /// Persist the jar atomically (temp file + rename in the jar's directory).
    pub fn save(&self) -> Result<()> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut lines: Vec<String> = {
            let cookies = self.cookies.read().expect("cookie jar lock poisoned");
            cookies.values().map(StoredCookie::to_netscape_line).collect()
        };
        lines.sort();

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        writeln!(tmp, "{NETSCAPE_HEADER}")?;
        for line in &lines {
            writeln!(tmp, "{line}")?;
        }
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cookies.read().expect("cookie jar lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn store(&self, url: &Url, header: &HeaderValue) {
        let Ok(raw) = header.to_str() else { return };
        let Some(host) = url.host_str() else { return };

        let mut parts = raw.split(';');
        let Some(pair) = parts.next() else { return };
        let Some((name, value)) = pair.split_once('=') else {
            return;
        };
        let name = name.trim().to_string();
        let value = value.trim().to_string();
        if name.is_empty() {
            return;
        }

        let mut cookie = StoredCookie {
            domain: host.to_string(),
            include_subdomains: false,
            path: default_path(url),
            secure: false,
            expires: 0,
            name,
            value,
        };
        let mut remove = false;

        for attr in parts {
            let attr = attr.trim();
            let (key, val) = attr.split_once('=').unwrap_or((attr, ""));
            match key.trim().to_ascii_lowercase().as_str() {
                "domain" => {
                    let d = val.trim().trim_start_matches('.');
                    if !d.is_empty() {
                        cookie.domain = d.to_string();
                        cookie.include_subdomains = true;
                    }
                }
                "path" => {
                    if val.starts_with('/') {
                        cookie.path = val.to_string();
                    }
                }
                "secure" => cookie.secure = true,
                "max-age" => match val.trim().parse::<i64>() {
                    Ok(secs) if secs > 0 => {
                        cookie.expires = chrono::Utc::now().timestamp() + secs;
                    }
                    Ok(_) => remove = true,
                    Err(_) => {}
                },
                "expires" => {
                    if let Ok(when) = chrono::DateTime::parse_from_rfc2822(val.trim()) {
                        cookie.expires = when.timestamp();
                        if cookie.expires <= chrono::Utc::now().timestamp() {
                            remove = true;
                        }
                    }
                }
                _ => {}
            }
        }

        let key = (cookie.domain.clone(), cookie.name.clone());
        let mut cookies = self.cookies.write().expect("cookie jar lock poisoned");
        if remove {
            cookies.remove(&key);
        } else {
            cookies.insert(key, cookie);
        }
    }
}

/// RFC 6265 default-path: the directory of the request path.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

impl reqwest::cookie::CookieStore for FileCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            self.store(url, header);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let cookies = self.cookies.read().expect("cookie jar lock poisoned");
        let mut pairs: Vec<String> = cookies
            .values()
            .filter(|c| c.matches(url))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        if pairs.is_empty() {
            return None;
        }
        pairs.sort();
        HeaderValue::from_str(&pairs.join("; ")).ok()
    }
}
