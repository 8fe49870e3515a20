use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::{
    event::{poll, read, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use restui::app::App;
use restui::config::Config;
use restui::config_store::{ConfigStore, StorageArgs, LOCAL_PROVIDER};
use restui::http::HttpTransport;
use restui::resource::{AppConfig, DEMO_CONFIG};
use restui::ui::splash::{render as render_splash, SplashState};
use restui::{event, ui};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Terminal admin panel for REST APIs
#[derive(Parser, Debug)]
#[command(name = "restui", version = restui::VERSION, about, long_about = None)]
struct Args {
    /// Admin configuration file (.json, .yaml or .yml)
    #[arg(short, long, env = "RESTUI_CONFIG")]
    config: Option<PathBuf>,

    /// Location to open, e.g. /posts?_page=2
    #[arg(short, long)]
    location: Option<String>,

    /// Use the built-in demo configuration
    #[arg(long)]
    demo: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(flatten)]
    storage: StorageFlags,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Args, Debug)]
struct StorageFlags {
    /// Storage provider of the configuration (local or http)
    #[arg(long, env = "STORAGE_PROVIDER")]
    storage_provider: Option<String>,

    /// Object path inside the container
    #[arg(long, env = "STORAGE_PATH")]
    storage_path: Option<String>,

    #[arg(long, env = "STORAGE_CONTAINER")]
    storage_container: Option<String>,

    /// Connection settings as JSON, e.g. {"endpoint": "https://..."}
    #[arg(long, env = "STORAGE_CONNECTION")]
    storage_connection: Option<String>,
}

impl StorageFlags {
    fn to_storage_args(&self) -> StorageArgs {
        StorageArgs {
            provider: self.storage_provider.clone(),
            path: self.storage_path.clone(),
            container: self.storage_container.clone(),
            connection: self.storage_connection.clone(),
        }
    }

    fn is_remote(&self) -> bool {
        self.storage_provider
            .as_deref()
            .map(str::trim)
            .is_some_and(|p| !p.is_empty() && p != LOCAL_PROVIDER)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the admin configuration and exit
    Config {
        #[arg(long, value_enum, default_value = "json")]
        format: ConfigFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConfigFormat {
    Json,
    Js,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", log_path.display(), e);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("restui started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = Config::config_dir() {
        return config_dir.join("restui.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".restui").join("restui.log");
    }
    PathBuf::from("restui.log")
}

/// Store to read the admin configuration from; `None` means the demo
fn select_store(args: &Args, prefs: &Config) -> Result<Option<ConfigStore>> {
    if args.demo {
        return Ok(None);
    }

    let local = args
        .config
        .clone()
        .or_else(|| prefs.config_source.as_ref().map(PathBuf::from));

    if local.is_none() && !args.storage.is_remote() {
        return Ok(None);
    }

    let store = ConfigStore::from_args(&args.storage.to_storage_args(), local.unwrap_or_default())?;
    Ok(Some(store))
}

async fn load_app_config(store: Option<&ConfigStore>) -> Result<AppConfig> {
    match store {
        Some(store) => store
            .load_json()
            .await
            .with_context(|| format!("Failed to load configuration from {}", store.describe())),
        None => Ok(AppConfig::demo()?),
    }
}

/// `restui config --format json|js`
async fn print_config(store: Option<&ConfigStore>, format: ConfigFormat) -> Result<()> {
    match (format, store) {
        (ConfigFormat::Json, Some(store)) => {
            let value = store.load_value().await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        },
        (ConfigFormat::Json, None) => {
            println!("{}", DEMO_CONFIG.trim_end());
        },
        (ConfigFormat::Js, Some(store)) => {
            let script = store.load_js().await?;
            tracing::debug!("Serving script as {}", script.content_type);
            println!("{}", script.body);
        },
        (ConfigFormat::Js, None) => {
            anyhow::bail!("The js format needs a remote storage provider");
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut prefs = Config::load();
    let store = select_store(&args, &prefs)?;

    if let Some(Command::Config { format }) = &args.command {
        return print_config(store.as_ref(), *format).await;
    }

    if let Some(ConfigStore::Local(path)) = &store {
        let source = path.display().to_string();
        if prefs.config_source.as_deref() != Some(source.as_str()) {
            prefs.config_source = Some(source);
            if let Err(e) = prefs.save() {
                tracing::warn!("Could not save preferences: {}", e);
            }
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = initialize_with_splash(&mut terminal, &args, store.as_ref(), prefs).await;

    match result {
        Ok(Some(mut app)) => {
            let run_result = run_app(&mut terminal, &mut app).await;
            cleanup_terminal(&mut terminal)?;

            let location = app.location.clone();
            if let Err(e) = app.config.set_last_location(&location) {
                tracing::warn!("Could not save last location: {}", e);
            }

            if let Err(err) = run_result {
                eprintln!("Error: {err:?}");
            }
        },
        Ok(None) => {
            cleanup_terminal(&mut terminal)?;
        },
        Err(err) => {
            cleanup_terminal(&mut terminal)?;
            eprintln!("Initialization error: {err:?}");
        },
    }

    Ok(())
}

fn cleanup_terminal<B: Backend + std::io::Write>(terminal: &mut Terminal<B>) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn initialize_with_splash<B: Backend>(
    terminal: &mut Terminal<B>,
    args: &Args,
    store: Option<&ConfigStore>,
    prefs: Config,
) -> Result<Option<App>>
where
    B::Error: Send + Sync + 'static,
{
    let mut splash = SplashState::new();
    terminal.draw(|f| render_splash(f, &splash))?;

    if check_abort()? {
        return Ok(None);
    }

    // Step 1: Admin configuration
    let source = store.map(ConfigStore::describe).unwrap_or_else(|| "demo".to_string());
    splash.set_message(&format!("Loading configuration [{}]", source));
    terminal.draw(|f| render_splash(f, &splash))?;

    let app_config = match load_app_config(store).await {
        Ok(config) => config,
        Err(e) => {
            splash.set_message("Error: configuration could not be loaded");
            terminal.draw(|f| render_splash(f, &splash))?;
            tokio::time::sleep(Duration::from_secs(2)).await;
            return Err(e);
        },
    };
    splash.set_title(&app_config.name);
    splash.complete_step();

    if check_abort()? {
        return Ok(None);
    }

    // Step 2: HTTP client
    let base_url = app_config.base_url.as_deref().unwrap_or("(relative urls)").to_string();
    splash.set_message(&format!("Preparing client [{}]", base_url));
    terminal.draw(|f| render_splash(f, &splash))?;

    let transport = HttpTransport::new(
        app_config.base_url.as_deref(),
        app_config.request_headers.clone(),
        prefs.request_timeout(),
    )?;
    splash.complete_step();

    if check_abort()? {
        return Ok(None);
    }

    // Step 3: First location
    let first_page = app_config
        .page_ids()
        .first()
        .map(|s| s.to_string())
        .unwrap_or_default();
    let location = prefs.effective_location(args.location.as_deref(), &first_page);
    splash.set_message(&format!("Opening {}", location));
    terminal.draw(|f| render_splash(f, &splash))?;

    let mut app = App::new(app_config, Arc::new(transport), prefs);
    app.open_location(&location).await?;

    // A stale location from another configuration
    if app.session.is_none() {
        let error = app.error_message.take();
        app.navigate_to_resource(&first_page).await?;
        app.error_message = error;
    }

    splash.complete_step();
    splash.set_message("Ready!");
    terminal.draw(|f| render_splash(f, &splash))?;

    tokio::time::sleep(Duration::from_millis(200)).await;

    Ok(Some(app))
}

fn check_abort() -> Result<bool> {
    if poll(Duration::from_millis(50))? {
        if let Event::Key(key) = read()? {
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        if event::handle_events(app).await? {
            return Ok(());
        }
    }
}
