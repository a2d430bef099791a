use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use moodring_core::time::{parse_date, parse_timezone};
use moodring_core::{MoodPipeline, MoodType, NotificationPolicy};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod llm;
mod notifier;
mod runtime;
mod state;
mod stats_cmd;

use config::{Config, load_config};
use llm::{ChatSession, chat_complete};
use notifier::TerminalNotifier;
use runtime::{SourceSpec, run_pipeline};
use state::FileBlobStore;
use stats_cmd::{StatsCommand, run_stats};

#[derive(Parser, Debug)]
#[command(
    name = "moodring",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("MOODRING_BUILD_SHA"), ")"),
    about = "GSR mood companion: live mood tracking, history and care reminders"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read the sensor (or a simulated one) and track mood until Ctrl-C
    #[command(group(ArgGroup::new("source").required(true).args(["mock", "device"])))]
    Run {
        /// Use the synthetic signal instead of a device
        #[arg(long, default_value_t = false)]
        mock: bool,

        /// Serial device or any readable text stream (already configured, e.g. 9600 baud)
        #[arg(long)]
        device: Option<PathBuf>,

        /// Stop after this many seconds
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Seed for the synthetic signal (default: config pipeline.mock_seed)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Mood statistics from the recorded history
    Stats {
        #[command(subcommand)]
        command: StatsCommand,
    },

    /// Delete recorded history
    #[command(group(ArgGroup::new("what").required(true).args(["all", "before"])))]
    Clear {
        /// Delete every record
        #[arg(long, default_value_t = false)]
        all: bool,

        /// Delete records dated before YYYY-MM-DD (that day is kept)
        #[arg(long)]
        before: Option<String>,
    },

    /// Config file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Talk to the assistant in the persona of the current mood
    Chat {
        /// Message to send; omit for an interactive session
        message: Vec<String>,

        /// Persona to use (default: mood of the latest record)
        #[arg(long)]
        mood: Option<MoodType>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.moodring/config.toml with defaults
    Init,
    /// Print the effective configuration (API key masked)
    Show,
}

fn init_tracing() {
    let filter = std::env::var("MOODRING_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_pipeline(cfg: &Config) -> Result<MoodPipeline<FileBlobStore>> {
    let tz = parse_timezone(&cfg.pipeline.timezone)?;
    let store = FileBlobStore::open_default()?;
    Ok(MoodPipeline::with_policy(store, tz, NotificationPolicy::new()).with_stats_tick(cfg.pipeline.stats_tick()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            mock,
            device,
            duration_secs,
            seed,
        } => {
            let cfg = load_config()?;
            let spec = match (mock, device) {
                (true, _) => SourceSpec::Mock {
                    seed: seed.or(cfg.pipeline.mock_seed),
                },
                (false, Some(path)) => SourceSpec::Device(path),
                (false, None) => bail!("pass --mock or --device <path>"),
            };
            let mut pipeline = open_pipeline(&cfg)?;
            let mut sink = TerminalNotifier::stdout(cfg.notify.desktop);

            println!("Tracking mood from {} source (Ctrl-C to stop)\n", spec.kind());
            let summary = run_pipeline(&mut pipeline, &spec, &mut sink, duration_secs.map(Duration::from_secs)).await?;

            println!(
                "\nReadings: {} (admitted {}), records: {}, care notifications: {}",
                summary.readings, summary.admitted, summary.records, summary.notifications
            );
            if let Some(m) = summary.last_mood {
                println!("Last mood: {}", m.profile().label);
            }
            if let Some(d) = pipeline.daily_stats(Utc::now()) {
                print!("\n{}", stats_cmd::render_daily(Some(&d)));
            }
        }

        Command::Stats { command } => {
            let cfg = load_config()?;
            let mut pipeline = open_pipeline(&cfg)?;
            run_stats(command, &mut pipeline, Utc::now())?;
        }

        Command::Clear { all, before } => {
            let cfg = load_config()?;
            let mut pipeline = open_pipeline(&cfg)?;
            if all {
                pipeline.clear_all();
                println!("Cleared all mood records.");
            } else if let Some(s) = before {
                let date = parse_date(&s)?;
                pipeline.clear_before(date, Utc::now());
                println!("Cleared mood records before {date}.");
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },

        Command::Chat { message, mood } => {
            let cfg = load_config()?;
            let mood = match mood {
                Some(m) => m,
                None => open_pipeline(&cfg)?.latest_mood().unwrap_or_default(),
            };
            let openai = cfg.openai.resolve();
            let mut session = ChatSession::new(mood);

            if message.is_empty() {
                chat_repl(&openai, &mut session)?;
            } else {
                let text = message.join(" ");
                if let Some(input) = session.prepare(&text)? {
                    let reply = chat_complete(&openai, &session.request_turns(&input))?;
                    println!("{reply}");
                }
            }
        }
    }

    Ok(())
}

fn chat_repl(openai: &config::OpenAiConfig, session: &mut ChatSession) -> Result<()> {
    println!(
        "Chatting as the '{}' companion. Commands: /mood <type>, /exit",
        session.mood().profile().label
    );
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("flush stdout")?;
        let Some(line) = lines.next() else { break };
        let line = line.context("read stdin")?;
        let trimmed = line.trim();

        if trimmed == "/exit" || trimmed == "/quit" {
            break;
        }
        if let Some(arg) = trimmed.strip_prefix("/mood") {
            match arg.trim().parse::<MoodType>() {
                Ok(m) => {
                    if session.set_mood(m) {
                        println!("(mood changed, the assistant's style will adjust)");
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
            continue;
        }

        let input = match session.prepare(trimmed) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        match chat_complete(openai, &session.request_turns(&input)) {
            Ok(reply) => {
                println!("{reply}\n");
                session.record_exchange(&input, &reply);
            }
            Err(e) => {
                info!(error = %e, "chat request failed");
                eprintln!("error: {e:#}");
            }
        }
    }
    Ok(())
}
