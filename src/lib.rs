// MIT License - Copyright (c) 2026 Peter Wright

//! # spc-web-bridge
//!
//! Talk to an ACRE SPC42 intrusion panel through the only interface it has:
//! its authenticated HTML web UI. The library logs in and keeps the session
//! alive (the panel expires sessions unpredictably and dislikes login
//! storms), scrapes the status pages into typed zone/sector/door/output
//! records with closed-set integer state codes, diffs them against the last
//! published snapshot, and replays the web UI's own form posts for arming,
//! door and output commands.
//!
//! The `spc2mqtt` binary drives all of this from two periodic scan loops and
//! an MQTT command router.
//!
//! ## Quick Start
//!
//! ```no_run
//! use spc_web_bridge::{Config, SpcPanel};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(std::path::Path::new("/etc/acre_exp/config.yml"))?;
//!     let panel = SpcPanel::new(&config.spc)?;
//!
//!     for zone in panel.fetch_zones().await? {
//!         println!("Zone {}: {} (state={})", zone.id, zone.name, zone.state.code());
//!     }
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod constants;
pub mod cookies;
pub mod devices;
pub mod error;
pub mod http;
pub mod pages;
pub mod panel;
pub mod scan;
pub mod session;
pub mod snapshot;
pub mod topics;

// Re-exports for convenience
pub use commands::{CommandAction, ack};
pub use config::{Category, Config, FeatureFlags};
pub use error::{Result, SpcError};
pub use panel::SpcPanel;
pub use scan::{ControllerScanEngine, Publication, ScanEngine};
pub use snapshot::SnapshotStore;
