// MIT License - Copyright (c) 2026 Peter Wright

//! Panel URL layout and the fixed strings the web interface is recognized by.

/// Login endpoint (GET seeds cookies, POST submits credentials).
pub const LOGIN_PATH: &str = "/login.htm";

/// Protected page ids under `/secure.htm?session=<sid>&page=<id>`.
pub const PAGE_HOME: &str = "spc_home";
pub const PAGE_ZONES: &str = "status_zones";
pub const PAGE_DOORS: &str = "status_doors";
pub const PAGE_OUTPUTS: &str = "status_outputs";
pub const PAGE_CONTROLLER: &str = "controller_status";

/// Files kept under `spc.session_cache_dir`.
pub const SESSION_FILE: &str = "spc_session.json";
pub const COOKIE_FILE: &str = "spc_cookies.jar";

/// Token present on every protected SPC42 page.
pub const PANEL_TOKEN: &str = "spc42";

/// Substrings (lowercase) that betray a redirect back to the login form.
pub const LOGIN_MARKERS: [&str; 3] = ["login.htm", "mot de passe", "identifiant"];

/// Build the path of a protected page for the given session.
pub fn secure_page_path(session_id: &str, page: &str) -> String {
    format!("/secure.htm?session={session_id}&page={page}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_page_path() {
        assert_eq!(
            secure_page_path("0xABC", PAGE_ZONES),
            "/secure.htm?session=0xABC&page=status_zones"
        );
    }
}
