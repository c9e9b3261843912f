mod commands;
mod live;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tvlink_core::channel;
use tvlink_core::preview::{self, PreviewState};
use tvlink_core::{
    CommandRouter, ControlSurface, JsonFileStore, Keymap, MemoryStore, Outbound, Platform, Recorder,
    SettingsStore, SharedSettings, TransportConfig, Transports,
};

const DRAIN_LIMIT: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(name = "tvlink", about = "Drive Roku (ECP) and Fire TV (adb) remotes from the keyboard")]
struct Args {
    /// Settings file (defaults to the platform config dir).
    #[arg(long, env = "TVLINK_SETTINGS", value_name = "PATH", global = true)]
    settings: Option<PathBuf>,

    /// adb executable.
    #[arg(long, env = "TVLINK_ADB", value_name = "PROGRAM", global = true)]
    adb: Option<PathBuf>,

    #[arg(long, global = true)]
    ecp_port: Option<u16>,

    #[arg(long, global = true)]
    http_timeout_ms: Option<u64>,

    /// Kill an adb invocation that runs longer than this.
    #[arg(long, global = true)]
    adb_timeout_ms: Option<u64>,

    /// Print the requests and adb commands instead of issuing them. Settings are not written.
    #[arg(long, default_value_t = false, global = true)]
    dry_run: bool,

    /// More logging (-v debug, -vv trace). RUST_LOG wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the saved device list.
    #[command(subcommand)]
    Devices(DevicesCmd),
    /// Make a device current, e.g. `10.0.0.5|ecp-http`.
    Select { id: String },
    /// Clear the current device.
    Unselect,
    /// Send one key: a name like `up` or `volume-mute`, or `lit_<char>`.
    Press {
        token: String,
        #[arg(long, value_enum)]
        phase: Option<PhaseArg>,
    },
    /// Type text on the current device, one literal per character.
    Type { text: String },
    /// Drop and reopen the adb session for the current device.
    Reconnect,
    #[command(subcommand)]
    Settings(SettingsCmd),
    /// Forward the keyboard to the current device until Ctrl+C or Ctrl+Q.
    Live,
}

#[derive(Subcommand, Debug)]
enum DevicesCmd {
    List,
    Add {
        address: String,
        /// ecp-http (roku) or adb-shell (firetv).
        family: String,
        #[arg(long)]
        alias: Option<String>,
    },
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum SettingsCmd {
    Show,
    SetResolution { resolution: String },
    SetFilter { filter: String },
    SetTransparency { value: f32 },
    SetBorder {
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    /// Capture device for the preview; omit to blank it.
    SetSource { device_id: Option<String> },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PhaseArg {
    Down,
    Up,
}

enum Backend {
    Real(Transports),
    DryRun(Arc<Recorder>),
}

impl Backend {
    fn router(&self, ecp_port: u16) -> CommandRouter {
        match self {
            Backend::Real(t) => {
                CommandRouter::with_transports(t.http.clone(), t.shell.clone(), ecp_port)
            }
            Backend::DryRun(rec) => {
                CommandRouter::with_transports(rec.clone(), rec.clone(), ecp_port)
            }
        }
    }

    async fn finish(self) {
        match self {
            Backend::Real(t) => t.drain(DRAIN_LIMIT).await,
            Backend::DryRun(rec) => {
                for entry in rec.take() {
                    match entry {
                        Outbound::Http(url) => println!("POST {url}"),
                        Outbound::Shell(args) => println!("adb {}", args.join(" ")),
                    }
                }
            }
        }
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = TransportConfig::from_env();
    if let Some(adb) = args.adb.clone() {
        config.adb_program = adb;
    }
    if let Some(port) = args.ecp_port {
        config.ecp_port = port;
    }
    if let Some(ms) = args.http_timeout_ms {
        config.http_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = args.adb_timeout_ms {
        config.adb_timeout = Duration::from_millis(ms);
    }

    let path = match args.settings.clone() {
        Some(p) => p,
        None => JsonFileStore::default_path()?,
    };
    let file_store = JsonFileStore::new(&path);
    let store: Box<dyn SettingsStore> = if args.dry_run {
        Box::new(MemoryStore::with(file_store.load()?))
    } else {
        Box::new(file_store)
    };
    let settings = SharedSettings::open(store)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;

    let backend = if args.dry_run {
        Backend::DryRun(Recorder::new())
    } else {
        Backend::Real(Transports::start(&config)?)
    };

    let (control, preview_end) = channel::pair();
    let preview_state = PreviewState::from_settings(&settings.snapshot());
    let preview_task = tokio::spawn(preview::run(preview_end, preview_state, Vec::new()));

    let mut surface = ControlSurface::new(settings, backend.router(config.ecp_port), control);
    if matches!(args.command, Command::Live) {
        // Terminals never see the Command key, so chords always use Control.
        surface = surface.with_keymap(Keymap::new(Platform::Standard));
    }
    let result = match args.command {
        Command::Live => live::run(&mut surface).await,
        command => commands::run(&mut surface, command),
    };

    drop(surface);
    if let Err(e) = preview_task.await {
        warn!(error = %e, "preview actor ended abnormally");
    }
    backend.finish().await;
    result
}
