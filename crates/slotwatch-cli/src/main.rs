use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use slotwatch::config::{DEFAULT_SITE_URL, DEFAULT_TELEGRAM_API_URL, resolve_targets};
use slotwatch::{
    Notifier, PageSettings, PageSource, RawConfig, SlotWatcher, parse_availability_rows,
};

#[derive(Parser)]
#[command(name = "slotwatch")]
#[command(
    about = "Watches schengenappointments.com for open visa appointment slots",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
struct PageArgs {
    #[arg(
        long,
        env = "CITY_SLUG",
        default_value = "dubai",
        help = "City slug as used in the site URL"
    )]
    city: String,

    #[arg(long, env = "VISA_TYPE", default_value = "tourism", help = "Visa type slug")]
    visa_type: String,

    #[arg(
        long,
        env = "SNAPSHOT_FILE",
        help = "Pre-rendered HTML of the page [default: rendered_<city>.html]"
    )]
    snapshot: Option<PathBuf>,

    #[arg(long, help = "Ignore any snapshot and fetch the page directly")]
    live: bool,

    #[arg(
        long,
        env = "SITE_URL",
        default_value = DEFAULT_SITE_URL,
        help = "Base URL of the appointments site"
    )]
    site_url: String,

    #[arg(
        long,
        env = "FETCH_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Timeout for the live fetch, in seconds"
    )]
    timeout_secs: u64,
}

impl PageArgs {
    fn into_raw(self) -> RawConfig {
        RawConfig {
            city_slug: Some(self.city),
            visa_type: Some(self.visa_type),
            snapshot_file: self.snapshot,
            site_url: Some(self.site_url),
            timeout: Some(Duration::from_secs(self.timeout_secs)),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check the city page once, alert on open slots for the target countries and save state
    Check {
        #[command(flatten)]
        page: PageArgs,

        #[arg(
            long,
            env = "TARGET_COUNTRIES",
            help = "Comma-separated list of countries to watch"
        )]
        targets: Option<String>,

        #[arg(
            long,
            env = "TELEGRAM_TOKEN",
            hide_env_values = true,
            help = "Telegram bot token"
        )]
        telegram_token: Option<String>,

        #[arg(long, env = "CHAT_ID", help = "Telegram chat to deliver alerts to")]
        chat_id: Option<String>,

        #[arg(
            long,
            env = "TELEGRAM_API_URL",
            default_value = DEFAULT_TELEGRAM_API_URL,
            help = "Base URL of the Telegram Bot API"
        )]
        telegram_api_url: String,

        #[arg(
            long,
            env = "STATE_FILE",
            help = "JSON file with the last seen availability [default: last_state_<city>.json]"
        )]
        state_file: Option<PathBuf>,

        #[arg(long, help = "Log alerts instead of sending them")]
        dry_run: bool,
    },
    /// Print the country rows found on the city page
    Rows {
        #[command(flatten)]
        page: PageArgs,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn page_source(page: &PageSettings, live: bool) -> PageSource {
    let source = if live {
        PageSource::live(page)
    } else {
        PageSource::from_settings(page)
    };
    source.unwrap_or_else(|e| {
        log::error!("Error creating page source: {e}");
        process::exit(1);
    })
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    // Loaded before parsing so `.env` values act as env fallbacks.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    match cli.command {
        Commands::Check {
            page,
            targets,
            telegram_token,
            chat_id,
            telegram_api_url,
            state_file,
            dry_run,
        } => {
            let live = page.live;
            let config = RawConfig {
                target_countries: resolve_targets(targets, std::env::var("TARGET_COUNTRY").ok()),
                telegram_token,
                chat_id,
                state_file,
                telegram_api_url: Some(telegram_api_url),
                ..page.into_raw()
            }
            .validate()
            .unwrap_or_else(|e| {
                log::error!("Invalid configuration: {e}");
                process::exit(1);
            });

            let notifier = Notifier::from_config(&config, dry_run).unwrap_or_else(|e| {
                log::error!("{e}");
                process::exit(1);
            });

            let source = page_source(&config.page, live);

            let summary = SlotWatcher::new(config, source, notifier)
                .run()
                .await
                .unwrap_or_else(|e| {
                    log::error!("{e}");
                    process::exit(1);
                });

            log::info!(
                "Done: {} row(s), {} target(s) found, {} alert(s)",
                summary.rows,
                summary.matched.len(),
                summary.notified
            );
        }

        Commands::Rows { page, format } => {
            let live = page.live;
            let settings = page.into_raw().validate_page().unwrap_or_else(|e| {
                log::error!("Invalid configuration: {e}");
                process::exit(1);
            });
            let source = page_source(&settings, live);

            let html = source.get_document().await.unwrap_or_else(|e| {
                log::error!("Error fetching availability page: {e}");
                process::exit(1);
            });

            let rows = parse_availability_rows(&html);

            match format {
                OutputFormat::Json => serialize_json(&rows),
                OutputFormat::Text => {
                    if rows.is_empty() {
                        println!("No country rows found.");
                    } else {
                        for (i, row) in rows.iter().enumerate() {
                            println!("{:>3}. {}", i + 1, row);
                        }
                    }
                }
            }
        }
    }
}
