// MIT License - Copyright (c) 2026 Peter Wright
// MQTT bridge

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use spc_web_bridge::commands::{CommandAction, ack};
use spc_web_bridge::config::{Category, Config, FeatureFlags, WatchdogSection};
use spc_web_bridge::scan::{ControllerScanEngine, Publication, ScanEngine};
use spc_web_bridge::topics::{self, CommandTopic};
use spc_web_bridge::{SpcError, SpcPanel};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "spc2mqtt")]
#[command(about = "Bridge between an ACRE SPC42 alarm panel and MQTT")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short = 'c', long, default_value = "/etc/acre_exp/config.yml")]
    config: PathBuf,
}

fn to_qos(level: u8) -> QoS {
    match level {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Everything needed to put a payload on the wire, cheap to clone into tasks.
#[derive(Clone)]
struct Publisher {
    client: AsyncClient,
    base: String,
    qos: QoS,
    retain: bool,
    log_changes: bool,
}

impl Publisher {
    /// Publish one state topic (retained per config).
    ///
    /// A failed publish is logged and forgotten: the diff engine keeps the
    /// new value in its snapshot, and the retained previous value plus the
    /// next change keep the broker eventually consistent.
    async fn publish_state(&self, publication: &Publication) {
        let topic = format!("{}/{}", self.base, publication.topic);
        if self.log_changes {
            info!("{topic} = {}", publication.payload);
        }
        if let Err(e) = self
            .client
            .publish(&topic, self.qos, self.retain, publication.payload.clone())
            .await
        {
            error!("Failed to publish {topic}: {e}");
        }
    }

    /// Publish a command acknowledgement (transient, never retained).
    async fn publish_ack(&self, category: Category, id: &str, payload: &str) {
        let topic = format!("{}/{}", self.base, topics::command_result_topic(category, id));
        info!("{topic} = {payload}");
        if let Err(e) = self
            .client
            .publish(&topic, self.qos, false, payload.to_string())
            .await
        {
            error!("Failed to publish {topic}: {e}");
        }
    }

    /// Bridge availability topic, retained ("online"/"offline").
    async fn publish_status(&self, payload: &str) {
        let topic = format!("{}/{}", self.base, topics::STATUS_SEGMENT);
        if let Err(e) = self
            .client
            .publish(&topic, self.qos, true, payload.to_string())
            .await
        {
            error!("Failed to publish {topic}: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Scan loops
// ---------------------------------------------------------------------------

/// One fast-scan tick: zones and sectors are read on every tick — their
/// `information` flags only withhold publication, inside the diff engine —
/// while doors and outputs are fetched at all only when their flag is on.
///
/// The first fetch error ends the tick (logged once); the snapshot keeps the
/// previously published values so nothing is re-emitted spuriously later.
async fn fast_scan_tick(
    panel: &SpcPanel,
    engine: &mut ScanEngine,
    publisher: &Publisher,
    information: &FeatureFlags,
) {
    match panel.fetch_zones().await {
        Ok(zones) => publish_all(publisher, engine.diff_zones(&zones)).await,
        Err(e) => return log_scan_error("zones", &e),
    }
    match panel.fetch_sectors().await {
        Ok(sectors) => publish_all(publisher, engine.diff_sectors(&sectors)).await,
        Err(e) => return log_scan_error("secteurs", &e),
    }
    if information.doors {
        match panel.fetch_doors().await {
            Ok(doors) => publish_all(publisher, engine.diff_doors(&doors)).await,
            Err(e) => return log_scan_error("doors", &e),
        }
    }
    if information.outputs {
        match panel.fetch_outputs().await {
            Ok(outputs) => publish_all(publisher, engine.diff_outputs(&outputs)).await,
            Err(e) => return log_scan_error("outputs", &e),
        }
    }
}

async fn controller_scan_tick(
    panel: &SpcPanel,
    engine: &mut ControllerScanEngine,
    publisher: &Publisher,
) {
    match panel.fetch_controller().await {
        Ok(entries) => publish_all(publisher, engine.diff_entries(&entries)).await,
        Err(e) => log_scan_error("controller", &e),
    }
}

async fn publish_all(publisher: &Publisher, publications: Vec<Publication>) {
    for p in &publications {
        publisher.publish_state(p).await;
    }
}

fn log_scan_error(what: &str, e: &SpcError) {
    warn!("Scan of {what} skipped: {e}");
}

/// Periodic driver shared by both scan loops: tick until shutdown flips.
///
/// A macro rather than a generic function: a generic `AsyncFnMut` tick
/// parameter here runs into a rustc limitation proving `Send` for the
/// resulting spawned future is general enough over the tick closure's
/// captured borrows (rust-lang/rust#110338). Inlining the identical
/// select loop at each call site keeps everything owned within one
/// `async move` block, sidestepping the issue without changing behavior.
macro_rules! run_scan_loop {
    ($period:expr, $shutdown:expr, $tick:expr) => {{
        let mut shutdown = $shutdown;
        let mut ticker = interval($period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => { $tick },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }};
}

// ---------------------------------------------------------------------------
// Command router
// ---------------------------------------------------------------------------

const COMMAND_QUEUE_LIMIT: usize = 32;

/// Bounded queue between the broker's thread and the command router.
///
/// When full, the oldest queued command is evicted (and acknowledged
/// `error:overloaded` by the pusher) so the newest command always gets in.
struct CommandQueue {
    entries: Mutex<VecDeque<(CommandTopic, String)>>,
    ready: Notify,
}

impl CommandQueue {
    fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(COMMAND_QUEUE_LIMIT)),
            ready: Notify::new(),
        }
    }

    /// Enqueue a command, returning the evicted oldest entry if the queue
    /// was full.
    async fn push(
        &self,
        command: CommandTopic,
        payload: String,
    ) -> Option<(CommandTopic, String)> {
        let evicted = {
            let mut entries = self.entries.lock().await;
            let evicted = if entries.len() >= COMMAND_QUEUE_LIMIT {
                entries.pop_front()
            } else {
                None
            };
            entries.push_back((command, payload));
            evicted
        };
        self.ready.notify_one();
        evicted
    }

    async fn pop(&self) -> (CommandTopic, String) {
        loop {
            if let Some(entry) = self.entries.lock().await.pop_front() {
                return entry;
            }
            self.ready.notified().await;
        }
    }
}

/// Handle one validated-or-not command from the queue. Every outcome is
/// acknowledged on the sibling `command_result` topic.
async fn handle_command(
    panel: &SpcPanel,
    publisher: &Publisher,
    controle: &FeatureFlags,
    command: CommandTopic,
    payload: String,
) {
    let CommandTopic { category, id } = command;

    if !controle.get(category) {
        publisher.publish_ack(category, &id, ack::CONTROL_DISABLED).await;
        return;
    }

    let Some(action) = CommandAction::parse(category, &payload) else {
        warn!("Bad command payload {payload:?} on {category}/{id}");
        publisher.publish_ack(category, &id, ack::BAD_PAYLOAD).await;
        return;
    };

    info!("Command {category}/{id}: {}", action.button());
    match panel.execute(action, &id).await {
        Ok(()) => publisher.publish_ack(category, &id, &action.ok_ack()).await,
        Err(e) => {
            warn!("Command {} on {category}/{id} failed: {e}", action.button());
            publisher.publish_ack(category, &id, &ack::for_error(&e)).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config).context("Failed to load configuration")?;

    let WatchdogSection {
        refresh_interval,
        controller_refresh_interval,
        log_changes,
        information,
        controle,
    } = config.watchdog.clone();

    let panel = Arc::new(SpcPanel::new(&config.spc).context("Failed to set up panel client")?);

    // Set up MQTT
    let base = config.mqtt.base_topic.clone();
    let qos = to_qos(config.mqtt.qos);
    let mut mqtt_opts = MqttOptions::new(
        &config.mqtt.client_id,
        &config.mqtt.host,
        config.mqtt.port,
    );
    mqtt_opts.set_keep_alive(Duration::from_secs(30));
    if !config.mqtt.user.is_empty() {
        mqtt_opts.set_credentials(&config.mqtt.user, &config.mqtt.pass);
    }
    mqtt_opts.set_last_will(LastWill::new(
        format!("{base}/{}", topics::STATUS_SEGMENT),
        "offline",
        qos,
        true,
    ));
    let (client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);

    let publisher = Publisher {
        client: client.clone(),
        base: base.clone(),
        qos,
        retain: config.mqtt.retain,
        log_changes,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    // Broker callbacks run on the MQTT task; commands cross into the router
    // through this bounded queue. Overflow drops the oldest queued command
    // with an explicit ack instead of stalling the event loop.
    let queue = Arc::new(CommandQueue::new());

    info!(
        "spc2mqtt starting (panel {}, broker {}:{}, refresh {refresh_interval}s)",
        config.spc.host, config.mqtt.host, config.mqtt.port
    );

    // Task 1: MQTT event loop — connection lifecycle, subscriptions, inbound
    // commands.
    let mqtt_handle = {
        let client = client.clone();
        let publisher = publisher.clone();
        let base = base.clone();
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT connected");
                        publisher.publish_status("online").await;
                        for category in Category::ALL {
                            if !controle.get(category) {
                                continue;
                            }
                            let filter = topics::command_filter(&base, category);
                            match client.subscribe(&filter, qos).await {
                                Ok(()) => info!("MQTT: subscribed to {filter}"),
                                Err(e) => error!("MQTT: cannot subscribe to {filter}: {e}"),
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        let payload = String::from_utf8_lossy(&msg.payload).to_string();
                        let Some(command) = topics::parse_command_topic(&base, &msg.topic) else {
                            warn!("Ignoring malformed command topic {}", msg.topic);
                            continue;
                        };
                        if let Some((dropped, _)) = queue.push(command, payload).await {
                            warn!(
                                "Command queue full, dropping oldest command for {}/{}",
                                dropped.category, dropped.id
                            );
                            publisher
                                .publish_ack(dropped.category, &dropped.id, ack::OVERLOADED)
                                .await;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT event loop error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        })
    };

    // Task 2: command router — strictly serialized panel mutations.
    let cmd_handle = {
        let panel = Arc::clone(&panel);
        let publisher = publisher.clone();
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            loop {
                let (command, payload) = queue.pop().await;
                handle_command(&panel, &publisher, &controle, command, payload).await;
            }
        })
    };

    // Task 3: fast state scan.
    let fast_handle = {
        let panel = Arc::clone(&panel);
        let publisher = publisher.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut engine = ScanEngine::new(information);
            run_scan_loop!(
                Duration::from_secs_f64(refresh_interval),
                shutdown,
                fast_scan_tick(&panel, &mut engine, &publisher, &information).await
            );
        })
    };

    // Task 4: controller status scan.
    let controller_handle = {
        let panel = Arc::clone(&panel);
        let publisher = publisher.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut engine = ControllerScanEngine::new();
            run_scan_loop!(
                Duration::from_secs_f64(controller_refresh_interval),
                shutdown,
                controller_scan_tick(&panel, &mut engine, &publisher).await
            );
        })
    };

    // Wait for a shutdown signal.
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down..."),
        _ = sigterm.recv() => info!("Terminated, shutting down..."),
    }

    // Cooperative stop: scan loops finish their current HTTP call and exit.
    let _ = shutdown_tx.send(true);
    let _ = fast_handle.await;
    let _ = controller_handle.await;

    publisher.publish_status("offline").await;
    if let Err(e) = client.disconnect().await {
        warn!("MQTT disconnect failed: {e}");
    }
    // The event loop must keep polling briefly to flush the offline publish
    // and the Disconnect packet.
    tokio::time::sleep(Duration::from_millis(250)).await;
    cmd_handle.abort();
    mqtt_handle.abort();

    info!("Shutdown complete");
    Ok(())
}
