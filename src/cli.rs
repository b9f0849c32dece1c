//! CLI domain: parsing, routing, and presentation only.
//!
//! Domain behavior lives in the lifecycle/history/service modules; this
//! module wires them to the terminal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use owo_colors::OwoColorize;
use tracing::info;

use crate::config::{AnchorageConfig, ConfigLoader};
use crate::error::{ServiceError, SessionError};
use crate::geometry::{Pose, Quat, Vec3};
use crate::history::HistoryStore;
use crate::lifecycle::{LifecycleOrchestrator, SessionPhase};
use crate::quality::MappingQuality;
use crate::scene::{DisplayChannel, SpatialTracker};
use crate::service::management::{AnchorManagement, HostedAnchor, HttpManagementClient};
use crate::sim::{
    RecordingDisplay, RecordingRenderer, ScriptedInput, SimOutcome, SimScene,
    SimulatedAnchorService,
};
use crate::types::{CloudAnchorId, SessionMode};
use crate::service::TaskFailure;

#[derive(Parser)]
#[command(
    name = "anchorage",
    version,
    about = "Quality-gated lifecycle management for persistent shared spatial anchors"
)]
pub struct Cli {
    /// Path to a configuration file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a simulated hosting session end to end.
    Host(SessionArgs),
    /// Run a simulated resolving session end to end.
    Resolve(SessionArgs),
    /// Inspect or clear the hosted-anchor history.
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Manage hosted anchors on the anchor service.
    Anchors {
        #[command(subcommand)]
        command: AnchorCommands,
    },
    /// Show the effective configuration.
    Config,
}

#[derive(Args)]
pub struct SessionArgs {
    /// Give up after this many ticks.
    #[arg(long, default_value_t = 2000)]
    pub max_ticks: u64,

    /// Simulated cloud-task latency, in ticks.
    #[arg(long, default_value_t = 40)]
    pub task_latency: u32,

    /// Script the cloud task to fail instead of succeed.
    #[arg(long)]
    pub fail: bool,
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List hosted anchors recorded on this machine.
    List {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Delete every history record.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum AnchorCommands {
    /// List anchors currently hosted by the service.
    List {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Extend a hosted anchor's retention.
    Extend {
        /// Cloud anchor id.
        id: String,
        /// Days from now the anchor should expire.
        #[arg(long, default_value_t = 365)]
        days: i64,
    },
    /// Delete a hosted anchor from the service.
    Delete {
        /// Cloud anchor id.
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

/// Loaded configuration plus everything command handlers need.
pub struct RunContext {
    config: AnchorageConfig,
}

impl RunContext {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, SessionError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(RunContext { config })
    }

    pub fn config(&self) -> &AnchorageConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String, SessionError> {
        match command {
            Commands::Host(args) => self.run_session(SessionMode::Hosting, args),
            Commands::Resolve(args) => self.run_session(SessionMode::Resolving, args),
            Commands::History { command } => self.run_history(command),
            Commands::Anchors { command } => self.run_anchors(command),
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| SessionError::Config(e.to_string())),
        }
    }

    fn open_history(&self) -> Result<HistoryStore, SessionError> {
        let path = self
            .config
            .storage
            .history_path(&self.config.service.endpoint)?;
        Ok(HistoryStore::open(path).map_err(SessionError::from)?)
    }

    /// Drive a full simulated session: a scripted tap places the anchor,
    /// the camera orbits it to build up mapping coverage, and the simulated
    /// service completes the hosting task after a fixed latency.
    fn run_session(&self, mode: SessionMode, args: &SessionArgs) -> Result<String, SessionError> {
        let session = &self.config.session;
        let history = Arc::new(self.open_history()?);

        let scene = Arc::new(SimScene::with_floor());
        let service = Arc::new(SimulatedAnchorService::new(args.task_latency));
        if args.fail {
            service.set_outcome(SimOutcome::Fail(TaskFailure::DatasetProcessingFailed));
        }
        let renderer = Arc::new(RecordingRenderer::new());
        let display = Arc::new(RecordingDisplay::new());

        let dt = Duration::from_millis(session.sim_tick_ms.max(1));
        let warmup_ticks =
            (session.warmup_secs / dt.as_secs_f32()).ceil() as usize;
        let input = ScriptedInput::tap_after(warmup_ticks + 1);

        let mut orchestrator = LifecycleOrchestrator::new(
            mode,
            session,
            scene.clone(),
            service.clone(),
            renderer.clone(),
            display.clone(),
            Box::new(input),
            history.clone(),
        );

        info!(mode = %mode, "starting simulated session");
        let mut lines = Vec::new();
        lines.push(format!(
            "simulated scene: {} tracked plane(s)",
            scene.tracked_planes().len()
        ));
        let mut last_phase: Option<SessionPhase> = None;

        for tick in 0..args.max_ticks {
            // Orbit the camera around the anchor at eye height so azimuth
            // coverage accumulates; report sufficient quality once the
            // orbit has swept half a turn.
            let angle = tick as f32 * 0.02;
            scene.set_camera(Pose::new(
                Vec3::new(2.0 * angle.sin(), 1.4, 2.0 * angle.cos()),
                Quat::from_yaw(angle + std::f32::consts::PI),
            ));
            if angle > std::f32::consts::PI {
                service.set_quality(MappingQuality::Sufficient);
            }

            orchestrator.tick(dt);
            service.step();

            let phase = orchestrator.phase();
            if last_phase != Some(phase) {
                lines.push(format!("[tick {:4}] phase: {}", tick, phase.as_str().bold()));
                last_phase = Some(phase);
            }
            if orchestrator.is_done() {
                break;
            }
        }

        for channel in [
            DisplayChannel::Status,
            DisplayChannel::Quality,
            DisplayChannel::Instruction,
            DisplayChannel::AnchorCount,
        ] {
            if let Some(text) = display.text(channel) {
                lines.push(format!("{:?}: {}", channel, text));
            }
        }

        if orchestrator.is_done() {
            lines.push(format!("{}", "session complete".green()));
        } else {
            lines.push(format!("{}", "session did not finish within the tick budget".red()));
        }
        if mode == SessionMode::Hosting && !args.fail {
            lines.push(format!("history now holds {} record(s)", history.count()));
        }
        Ok(lines.join("\n"))
    }

    fn run_history(&self, command: &HistoryCommands) -> Result<String, SessionError> {
        let store = self.open_history()?;
        match command {
            HistoryCommands::List { json } => {
                let records = store.load().map_err(SessionError::from)?;
                if *json {
                    return serde_json::to_string_pretty(&records)
                        .map_err(|e| SessionError::Config(e.to_string()));
                }
                if records.is_empty() {
                    return Ok("no hosted anchors recorded".to_string());
                }
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Name", "Cloud Anchor ID", "Created (UTC)"]);
                for record in &records {
                    table.add_row(vec![
                        record.name.clone(),
                        record.cloud_anchor_id.to_string(),
                        record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    ]);
                }
                Ok(table.to_string())
            }
            HistoryCommands::Clear { yes } => {
                if !*yes && !confirm("Delete every history record?")? {
                    return Ok("aborted".to_string());
                }
                let count = store.count();
                store.clear().map_err(SessionError::from)?;
                Ok(format!("cleared {} record(s)", count))
            }
        }
    }

    fn run_anchors(&self, command: &AnchorCommands) -> Result<String, SessionError> {
        let client = HttpManagementClient::new(&self.config.service)?;
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| SessionError::Config(format!("failed to start async runtime: {}", e)))?;

        match command {
            AnchorCommands::List { json } => {
                let anchors = runtime.block_on(client.list_anchors())?;
                if *json {
                    return serde_json::to_string_pretty(&anchors)
                        .map_err(|e| SessionError::Config(e.to_string()));
                }
                Ok(format_anchor_table(&anchors))
            }
            AnchorCommands::Extend { id, days } => {
                let expire = Utc::now() + chrono::Duration::days(*days);
                let anchor = runtime
                    .block_on(client.extend_ttl(&CloudAnchorId(id.clone()), expire))?;
                Ok(format!(
                    "anchor {} now expires {}",
                    anchor.anchor_id(),
                    format_time(&anchor.expire_time)
                ))
            }
            AnchorCommands::Delete { id, yes } => {
                if !*yes && !confirm(&format!("Delete hosted anchor {}?", id))? {
                    return Ok("aborted".to_string());
                }
                runtime.block_on(client.delete_anchor(&CloudAnchorId(id.clone())))?;
                Ok(format!("deleted {}", id))
            }
        }
    }
}

fn confirm(prompt: &str) -> Result<bool, SessionError> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| SessionError::Config(format!("confirmation prompt failed: {}", e)))
}

fn format_anchor_table(anchors: &[HostedAnchor]) -> String {
    if anchors.is_empty() {
        return "no anchors hosted".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Cloud Anchor ID", "Created", "Expires", "Last localized"]);
    for anchor in anchors {
        table.add_row(vec![
            anchor.anchor_id().to_string(),
            format_time(&anchor.create_time),
            format_time(&anchor.expire_time),
            format_time(&anchor.last_localize_time),
        ]);
    }
    table.to_string()
}

fn format_time(time: &Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Map an error to the message shown on stderr.
pub fn map_error(err: &SessionError) -> String {
    match err {
        SessionError::Service(ServiceError::AuthFailed(detail)) => format!(
            "authentication failed: {}\nSet service.api_key in the config or ANCHORAGE_SERVICE__API_KEY.",
            detail
        ),
        other => other.to_string(),
    }
}
