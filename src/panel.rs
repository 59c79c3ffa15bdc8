// MIT License - Copyright (c) 2026 Peter Wright

//! The single-flight facade over the panel's web interface.
//!
//! One mutex serializes login, scans and command execution: the SPC session
//! model does not survive interleaved requests from concurrent clients, and
//! two loops plus the command router all share the session. Lock hold times
//! are one HTTP exchange, bounded by the request timeout.

use tokio::sync::Mutex;

use crate::commands::{CommandAction, discover_action_form};
use crate::config::SpcSection;
use crate::constants::{
    COOKIE_FILE, PAGE_CONTROLLER, PAGE_DOORS, PAGE_HOME, PAGE_OUTPUTS, PAGE_ZONES,
    secure_page_path,
};
use crate::cookies::FileCookieJar;
use crate::devices::{ControllerEntry, Door, OutputDevice, Sector, Zone};
use crate::error::{Result, SpcError};
use crate::http::PanelClient;
use crate::pages;
use crate::session::SessionManager;

struct PanelInner {
    client: PanelClient,
    session: SessionManager,
}

/// Shared access point to one SPC panel.
pub struct SpcPanel {
    inner: Mutex<PanelInner>,
}

impl SpcPanel {
    pub fn new(spc: &SpcSection) -> Result<Self> {
        // SessionManager::new creates the cache directory, so the jar path
        // is usable afterwards.
        let session = SessionManager::new(spc)?;
        let jar = std::sync::Arc::new(FileCookieJar::load_or_empty(
            &spc.session_cache_dir.join(COOKIE_FILE),
        ));
        let client = PanelClient::new(&spc.host, jar)?;
        Ok(Self {
            inner: Mutex::new(PanelInner { client, session }),
        })
    }

    /// Fetch a protected page under the current session.
    async fn fetch_page(&self, page: &'static str) -> Result<String> {
        let mut inner = self.inner.lock().await;
        let PanelInner { client, session } = &mut *inner;
        let sid = session
            .get_or_login(client)
            .await?
            .ok_or(SpcError::NoSession)?;
        let resp = client.get(&secure_page_path(&sid, page)).await?;
        Ok(resp.body)
    }

    pub async fn fetch_zones(&self) -> Result<Vec<Zone>> {
        Ok(pages::parse_zones(&self.fetch_page(PAGE_ZONES).await?))
    }

    pub async fn fetch_sectors(&self) -> Result<Vec<Sector>> {
        Ok(pages::parse_sectors(&self.fetch_page(PAGE_HOME).await?))
    }

    pub async fn fetch_doors(&self) -> Result<Vec<Door>> {
        Ok(pages::parse_doors(&self.fetch_page(PAGE_DOORS).await?))
    }

    pub async fn fetch_outputs(&self) -> Result<Vec<OutputDevice>> {
        Ok(pages::parse_outputs(&self.fetch_page(PAGE_OUTPUTS).await?))
    }

    pub async fn fetch_controller(&self) -> Result<Vec<ControllerEntry>> {
        Ok(pages::parse_controller(&self.fetch_page(PAGE_CONTROLLER).await?))
    }

    /// Replay the web UI's form post for `action` on `entity_id`.
    ///
    /// The whole exchange (session check, button discovery, POST) happens
    /// under the panel lock so a scan can never slip in between.
    pub async fn execute(&self, action: CommandAction, entity_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let PanelInner { client, session } = &mut *inner;
        let sid = session
            .get_or_login(client)
            .await?
            .ok_or(SpcError::NoSession)?;

        let page = action.control_page();
        let resp = client.get(&secure_page_path(&sid, page)).await?;
        let form = discover_action_form(&resp.body, entity_id, action.button()).ok_or_else(
            || SpcError::ActionNotFound {
                page,
                action: action.button(),
                entity: entity_id.to_string(),
            },
        )?;

        client.post_form(&form.action, &form.fields).await?;
        Ok(())
    }
}
