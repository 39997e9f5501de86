//! Palworld dedicated server manager
//!
//! Command line front end over the host service unit, the game's control API
//! and the notification webhook.
//!
//! # Architecture Overview
//!
//! ```text
//!   palserver-manager <command>
//!        │
//!        ├── start / stop / restart / enable / disable ──▶ service (systemctl)
//!        ├── status / announce / save ───────────────────▶ control (game REST API)
//!        ├── pre-stop ──▶ lifecycle::shutdown ──▶ control + notifications
//!        ├── watch ─────▶ watch loop ──▶ lifecycle::startup + notifications
//!        ├── config ────▶ config::store (PalWorldSettings.ini)
//!        └── notify ────▶ config::settings + notifications (webhook)
//! ```

use std::error::Error;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use palserver_manager::config::loader::load_or_default;
use palserver_manager::config::store::keys;
use palserver_manager::config::validation::validate_webhook_url;
use palserver_manager::config::watcher::ConfigWatcher;
use palserver_manager::config::{ConfigHandle, ConfigValue, ManagerConfig, OperatorSettings, StorePaths};
use palserver_manager::control::{GameControl, RemoteControlClient};
use palserver_manager::lifecycle::{Interrupt, ShutdownOrchestrator, StartupCheck};
use palserver_manager::net::PublicIpResolver;
use palserver_manager::notifications::{
    Delivery, EventKind, NotificationDispatcher, NotificationEvent, Notifier,
};
use palserver_manager::observability::{logging, metrics};
use palserver_manager::service::{ServiceError, ServiceManager, StartOutcome, Systemd};
use palserver_manager::watch::WatchLoop;

const ICON_ENABLED: &str = "✅";
const ICON_STOPPED: &str = "🛑";
const ICON_DISABLED: &str = "❌";
const ICON_WARNING: &str = "⛔";

#[derive(Parser)]
#[command(name = "palserver-manager")]
#[command(about = "Manage a Palworld dedicated server", long_about = None)]
struct Cli {
    /// Manager configuration file
    #[arg(short, long, default_value = "manager.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit webhook notifications
    Notify {
        #[command(subcommand)]
        command: NotifyCommand,
    },
    #[command(flatten)]
    Server(ServerCommand),
}

/// Commands that need the game settings.
#[derive(Subcommand)]
enum ServerCommand {
    /// Warn players and save the world before the service stops
    PreStop,
    /// Watch the server and relay player activity
    Watch,
    /// Show server settings and state
    Status,
    /// Start the game service
    Start,
    /// Stop the game service (players get a countdown)
    Stop,
    /// Restart the game service if it is running
    Restart,
    /// Start the game service on boot
    Enable,
    /// Do not start the game service on boot
    Disable,
    /// Broadcast a message to players in game
    Announce { message: String },
    /// Save the world
    Save,
    /// Inspect or edit the game settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// List every game setting
    Show,
    /// Print one game setting
    Get { key: String },
    /// Set a game setting: bool, int, float, string, group or literal
    Set { key: String, kind: String, value: String },
    /// First-run setup
    Init {
        /// Run even when the settings were already written
        #[arg(long)]
        force: bool,
        /// Leave the control API disabled
        #[arg(long)]
        no_api: bool,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Password players need to join
        #[arg(long)]
        password: Option<String>,
    },
    /// Toggle a crossplay platform (Steam, Xbox, PS5, Mac)
    Crossplay { platform: String },
}

#[derive(Subcommand)]
enum NotifyCommand {
    /// Show webhook state and message templates
    Show,
    /// Set the webhook URL and enable delivery
    Webhook { url: String },
    /// Enable delivery
    Enable,
    /// Disable delivery, messages are only logged
    Disable,
    /// Override an event's message; omit the template to restore the default
    Message { event: EventKind, template: Option<String> },
    /// Send a test notification
    Test { event: EventKind, params: Vec<String> },
}

/// Components wired from the manager configuration.
struct App {
    config: ManagerConfig,
    settings: ConfigHandle,
    service: Arc<Systemd>,
    control: Arc<RemoteControlClient>,
    notifier: Arc<NotificationDispatcher>,
}

impl App {
    fn build(config: ManagerConfig) -> Result<Self, Box<dyn Error>> {
        let settings = ConfigHandle::load(StorePaths::from_config(&config.paths))?;
        let service = Arc::new(Systemd::new(config.service.name.clone()));
        let control = Arc::new(RemoteControlClient::new(
            config.control.clone(),
            settings.clone(),
            service.clone(),
        )?);
        let notifier = Arc::new(NotificationDispatcher::new(
            &config.notifications,
            config.paths.operator_settings_path(),
        )?);

        Ok(Self {
            config,
            settings,
            service,
            control,
            notifier,
        })
    }

    fn public_ip(&self) -> Result<PublicIpResolver, Box<dyn Error>> {
        Ok(PublicIpResolver::new(
            &self.config.watch.public_ip_url,
            self.config.control.timeout(),
        )?)
    }

    fn startup_check(&self) -> Result<StartupCheck, Box<dyn Error>> {
        Ok(StartupCheck::new(
            self.service.clone(),
            self.control.clone(),
            self.notifier.clone(),
            self.settings.clone(),
            self.public_ip()?,
            self.config.watch.clone(),
        ))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => report_failure(e),
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let config = load_or_default(&cli.config)?;
    logging::init_logging(&config.observability.log_level);

    tracing::debug!(config = %cli.config.display(), "Configuration loaded");

    match cli.command {
        Commands::Notify { command } => notify_command(&config, command).await,
        Commands::Server(command) => server_command(&App::build(config)?, command).await,
    }
}

async fn server_command(app: &App, command: ServerCommand) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        ServerCommand::PreStop => pre_stop(app).await,
        ServerCommand::Watch => watch(app).await,
        ServerCommand::Status => status(app).await,
        ServerCommand::Start => start(app).await,
        ServerCommand::Stop => stop(app).await,
        ServerCommand::Restart => Ok(match app.service.restart().await {
            Ok(true) => report_success(ICON_ENABLED, "Game restarted"),
            Ok(false) => report_success("", "Game is not currently running!"),
            Err(e) => report_failure(e),
        }),
        ServerCommand::Enable => Ok(match app.service.enable().await {
            Ok(()) => report_success(ICON_ENABLED, "Auto-start enabled"),
            Err(e) => report_failure(e),
        }),
        ServerCommand::Disable => Ok(match app.service.disable().await {
            Ok(()) => report_success(ICON_DISABLED, "Auto-start disabled"),
            Err(e) => report_failure(e),
        }),
        ServerCommand::Announce { message } => Ok(match app.control.announce(&message).await {
            Ok(()) => report_success(ICON_ENABLED, "Announcement sent"),
            Err(e) => report_failure(e),
        }),
        ServerCommand::Save => Ok(match app.control.save().await {
            Ok(()) => report_success(ICON_ENABLED, "World saved"),
            Err(e) => report_failure(e),
        }),
        ServerCommand::Config { command } => config_command(app, command),
    }
}

async fn pre_stop(app: &App) -> Result<ExitCode, Box<dyn Error>> {
    let interrupt = Interrupt::new();
    let mut rx = interrupt.subscribe();
    interrupt.listen_for_signals();

    let mut orchestrator = ShutdownOrchestrator::new(
        app.service.clone(),
        app.control.clone(),
        app.notifier.clone(),
        app.config.shutdown.clone(),
    );
    let outcome = orchestrator.run(&mut rx).await;

    Ok(if outcome.is_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn watch(app: &App) -> Result<ExitCode, Box<dyn Error>> {
    let interrupt = Interrupt::new();
    let rx = interrupt.subscribe();
    interrupt.listen_for_signals();

    let observability = &app.config.observability;
    if observability.metrics_enabled {
        match observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut watch_loop = WatchLoop::new(
        app.service.clone(),
        app.control.clone(),
        app.notifier.clone(),
        app.startup_check()?,
        app.config.watch.clone(),
    );

    // Dropping the watcher stops it, so it lives for the whole loop.
    let _watcher = if app.config.watch.hot_reload {
        let path = app.settings.snapshot().paths().active.clone();
        let (watcher, reloads) = ConfigWatcher::new(&path, app.settings.clone());
        match watcher.run() {
            Ok(watcher) => {
                watch_loop = watch_loop.with_reloads(reloads);
                Some(watcher)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Game settings hot reload unavailable");
                None
            }
        }
    } else {
        None
    };

    watch_loop.run(rx).await;
    tracing::info!("Watch stopped");
    Ok(ExitCode::SUCCESS)
}

async fn status(app: &App) -> Result<ExitCode, Box<dyn Error>> {
    let store = app.settings.snapshot();
    let state = app.service.status().await;
    let port = store.get_int(keys::PUBLIC_PORT);
    let address = app.public_ip()?.resolve().await;

    let direct_connect = match (address, port.and_then(|p| u16::try_from(p).ok())) {
        (Some(ip), Some(port)) => SocketAddr::new(ip, port).to_string(),
        (Some(ip), None) => ip.to_string(),
        (None, _) => "N/A".to_string(),
    };
    let run_state = if state.is_running() {
        format!("{} Running", ICON_ENABLED)
    } else {
        format!("{} {}", ICON_STOPPED, capitalize(&state.to_string()))
    };
    let auto_start = if app.service.is_enabled().await {
        format!("{} Enabled", ICON_ENABLED)
    } else {
        format!("{} Disabled", ICON_DISABLED)
    };
    let version = match app.control.info().await {
        Ok(info) => info.version,
        Err(e) => format!("{} {}", ICON_WARNING, e),
    };
    let players = match app.control.player_count().await {
        Ok(count) => count.to_string(),
        Err(e) => format!("{} {}", ICON_WARNING, e),
    };

    let rows = [
        ("Server Name:", store.get_str(keys::SERVER_NAME).unwrap_or_default().to_string()),
        ("Port:", port.map(|p| p.to_string()).unwrap_or_else(|| "N/A".to_string())),
        ("Direct Connect:", direct_connect),
        ("Player Password:", store.get_str(keys::SERVER_PASSWORD).unwrap_or_default().to_string()),
        ("Crossplay:", store.crossplay_platforms().join(", ")),
        ("Status:", run_state),
        ("Auto-Start:", auto_start),
        ("Version:", version),
        ("Players Online:", players),
    ];
    for (label, value) in rows {
        println!("{:>16}  {}", label, value);
    }

    if !store.is_configured() {
        println!();
        println!("Game settings not written yet, run `config init` to set up the server.");
    }
    Ok(ExitCode::SUCCESS)
}

async fn start(app: &App) -> Result<ExitCode, Box<dyn Error>> {
    println!("Starting game via systemd...");
    Ok(match app.service.start().await {
        Ok(StartOutcome::AlreadyRunning) => report_success("", "Game is currently running!"),
        Ok(StartOutcome::Started) => report_success(ICON_ENABLED, "Game started"),
        Err(e) => report_failure(e),
    })
}

async fn stop(app: &App) -> Result<ExitCode, Box<dyn Error>> {
    if !app.service.is_privileged() {
        return Ok(report_failure(ServiceError::NotPrivileged));
    }

    println!(
        "Stopping server, please wait as players will have a {} minute warning.",
        app.config.shutdown.warning_iterations as u64 * app.config.shutdown.warning_interval_ms / 60_000
    );
    Ok(match app.service.stop().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_failure(e),
    })
}

fn config_command(app: &App, command: ConfigCommand) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        ConfigCommand::Show => {
            let store = app.settings.snapshot();
            for entry in store.entries() {
                println!("{:<40} {:<8} {}", entry.key, entry.kind().as_str(), entry.value);
            }
        }
        ConfigCommand::Get { key } => match app.settings.snapshot().get(&key) {
            Some(value) => println!("{}", value),
            None => {
                eprintln!("{} Unknown setting '{}'", ICON_WARNING, key);
                return Ok(ExitCode::FAILURE);
            }
        },
        ConfigCommand::Set { key, kind, value } => {
            if let Err(e) = app.settings.set(&key, &kind, &value) {
                return Ok(report_failure(e));
            }
            println!("{} {} updated", ICON_ENABLED, key);
        }
        ConfigCommand::Init {
            force,
            no_api,
            name,
            description,
            password,
        } => {
            if app.settings.snapshot().is_configured() && !force {
                println!("Game settings already exist, use --force to run setup again.");
                return Ok(ExitCode::SUCCESS);
            }

            let mut admin_password = None;
            app.settings.update(|store| {
                if !no_api {
                    admin_password = Some(store.enable_api()?);
                }
                for (key, value) in [
                    (keys::SERVER_NAME, name),
                    (keys::SERVER_DESCRIPTION, description),
                    (keys::SERVER_PASSWORD, password),
                ] {
                    if let Some(value) = value {
                        store.set_value(key, ConfigValue::String(value.trim().to_string()))?;
                    }
                }
                store.save()
            })?;

            match admin_password {
                Some(password) => println!("{} Control API enabled, admin password: {}", ICON_ENABLED, password),
                None => println!("{} Control API left disabled", ICON_DISABLED),
            }
        }
        ConfigCommand::Crossplay { platform } => {
            let mut enabled = false;
            app.settings.update(|store| {
                enabled = store.toggle_crossplay(&platform)?;
                Ok(())
            })?;
            let icon = if enabled { ICON_ENABLED } else { ICON_DISABLED };
            println!(
                "{} Crossplay: {}",
                icon,
                app.settings.snapshot().crossplay_platforms().join(", ")
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn notify_command(config: &ManagerConfig, command: NotifyCommand) -> Result<ExitCode, Box<dyn Error>> {
    let path = config.paths.operator_settings_path();
    let dispatcher = NotificationDispatcher::new(&config.notifications, path.clone())?;
    let mut settings = OperatorSettings::load(&path)?;

    match command {
        NotifyCommand::Show => {
            let webhook = &settings.notifications.webhook;
            if webhook.is_empty() {
                println!("No webhook configured, messages are only logged.");
            } else {
                let state = if settings.notifications.enabled {
                    format!("{} Enabled", ICON_ENABLED)
                } else {
                    format!("{} Disabled", ICON_DISABLED)
                };
                println!("{:>14}  {}", "Webhook:", mask_webhook(webhook));
                println!("{:>14}  {}", "Delivery:", state);
                match dispatcher.describe_webhook().await {
                    Ok(info) => {
                        println!("{:>14}  {}", "Name:", info.name);
                        println!("{:>14}  {}", "Channel ID:", info.channel_id);
                        println!("{:>14}  {}", "Guild ID:", info.guild_id);
                    }
                    Err(e) => println!("{:>14}  {} {}", "Status:", ICON_WARNING, e),
                }
            }

            println!();
            for kind in EventKind::ALL {
                let custom = settings.message_override(kind.key()).is_some();
                println!(
                    "{:<18} {}{}",
                    kind.label(),
                    NotificationDispatcher::template_for(&settings, kind),
                    if custom { "" } else { "  (default)" }
                );
            }
        }
        NotifyCommand::Webhook { url } => {
            let url = validate_webhook_url(&url).map_err(|e| e.to_string())?;
            settings.set_webhook(url.as_str());
            settings.save(&path)?;
            match dispatcher.describe_webhook().await {
                Ok(info) => println!("{} Webhook '{}' saved and enabled", ICON_ENABLED, info.name),
                Err(e) => println!("{} Webhook saved, but could not be verified: {}", ICON_WARNING, e),
            }
        }
        NotifyCommand::Enable => {
            if settings.notifications.webhook.trim().is_empty() {
                eprintln!("{} Set a webhook URL first", ICON_WARNING);
                return Ok(ExitCode::FAILURE);
            }
            settings.notifications.enabled = true;
            settings.save(&path)?;
            println!("{} Notifications enabled", ICON_ENABLED);
        }
        NotifyCommand::Disable => {
            settings.notifications.enabled = false;
            settings.save(&path)?;
            println!("{} Notifications disabled", ICON_DISABLED);
        }
        NotifyCommand::Message { event, template } => {
            settings.set_message(event.key(), template.as_deref().unwrap_or_default());
            settings.save(&path)?;
            println!(
                "{}: {}",
                event.label(),
                NotificationDispatcher::template_for(&settings, event)
            );
        }
        NotifyCommand::Test { event, params } => {
            match dispatcher
                .dispatch(&NotificationEvent::with_params(event, params))
                .await
            {
                Ok(Delivery::Sent(message)) => println!("{} Sent: {}", ICON_ENABLED, message),
                Ok(Delivery::LocalOnly(message)) => {
                    println!("{} Delivery disabled, logged only: {}", ICON_DISABLED, message)
                }
                Err(e) => return Ok(report_failure(e)),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn report_success(icon: &str, message: &str) -> ExitCode {
    if icon.is_empty() {
        println!("{}", message);
    } else {
        println!("{} {}", icon, message);
    }
    ExitCode::SUCCESS
}

/// Print a failure as plain status text and exit non-zero.
fn report_failure(error: impl Display) -> ExitCode {
    eprintln!("{} {}", ICON_WARNING, error);
    ExitCode::FAILURE
}

/// Hide the token part of a webhook URL.
fn mask_webhook(url: &str) -> String {
    let Some(slash) = url.rfind('/') else {
        return "************".to_string();
    };
    let (base, token) = url.split_at(slash + 1);
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return format!("{}************", base);
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}************{}", base, head, tail)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
