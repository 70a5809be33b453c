//! Weekly Pomodoros - terminal front-end.
//!
//! # Commands
//!
//! - `pomodoros list`: Show today's and this week's todos
//! - `pomodoros add <content> [--date]`: Add a todo
//! - `pomodoros done <id>` / `undone <id>`: Toggle completion
//! - `pomodoros edit <id> [--content] [--date]`: Change a todo
//! - `pomodoros delete <id>`: Remove a todo
//! - `pomodoros timer <20|30|60>`: Run a Pomodoro session
//! - `pomodoros harvest`: Show today's completed sessions
//!
//! # Environment Variables
//!
//! See the [`config`](pomodoros_client::config) module for available
//! configuration options.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pomodoros_client::clock::{Clock, SystemClock};
use pomodoros_client::config::Config;
use pomodoros_client::harvest::HarvestCounter;
use pomodoros_client::service::{TimerService, TimerSnapshot};
use pomodoros_client::timer::{SessionLength, TimerState};
use pomodoros_client::types::{format_remaining, NewTodo, Todo, TodoBuckets, TodoPatch, DATE_FORMAT};
use pomodoros_client::{CookieJar, MutationOutcome, TodoApi, TodoCache};

/// Weekly Pomodoros - dated todos and a Pomodoro timer.
#[derive(Parser, Debug)]
#[command(name = "pomodoros")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    POMODOROS_SERVER_URL        Gateway URL (default: http://127.0.0.1:3000)
    POMODOROS_DATA_DIR          Cookie jar directory (default: ~/.pomodoros)
    POMODOROS_CACHE_STALE_SECS  Todo list freshness window (default: 3600)

EXAMPLES:
    pomodoros add \"write report\" --date 2024-01-10
    pomodoros done 1704873600000
    pomodoros timer 20
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Show todos split into today and the rest of the week.
    List,

    /// Add a todo.
    Add {
        content: String,
        /// Day in YYYY-MM-DD form (default: today).
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Mark a todo as completed.
    Done { id: String },

    /// Mark a todo as not completed.
    Undone { id: String },

    /// Change a todo's content or date.
    Edit {
        id: String,
        #[arg(short, long)]
        content: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Remove a todo.
    Delete { id: String },

    /// Run a Pomodoro session.
    ///
    /// Type `p` then Enter to pause, `r` to resume, `q` to abandon.
    Timer {
        /// Session length in minutes.
        #[arg(value_parser = parse_session_length)]
        minutes: SessionLength,
    },

    /// Show today's completed sessions.
    Harvest,
}

fn parse_session_length(raw: &str) -> Result<SessionLength, String> {
    let minutes: u32 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number of minutes"))?;
    SessionLength::try_from(minutes).map_err(|m| format!("{m} is not one of 20, 30 or 60"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run(cli.command))
}

async fn run(command: Command) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let jar = Arc::new(
        CookieJar::open(config.cookie_path()).context("Failed to open cookie jar")?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    debug!(server = %config.server_url, jar = %config.cookie_path().display(), "Client configured");

    match command {
        Command::Timer { minutes } => run_timer(minutes, jar, clock).await,
        Command::Harvest => {
            let harvest = HarvestCounter::load(jar, clock).context("Failed to load harvest")?;
            println!("{} today {}", harvest.count(), harvest.tomatoes());
            Ok(())
        }
        command => {
            let api = TodoApi::new(&config.server_url, jar.clone())
                .context("Failed to create HTTP client")?;
            let mut cache = TodoCache::from_jar(api, &jar, clock.clone(), config.cache_stale_after);
            run_todo_command(command, &mut cache, clock.as_ref()).await
        }
    }
}

async fn run_todo_command(command: Command, cache: &mut TodoCache, clock: &dyn Clock) -> Result<()> {
    let outcome = match command {
        Command::List => {
            let todos = cache.todos().await;
            print_buckets(&TodoBuckets::split(todos, clock.today()));
            return Ok(());
        }
        Command::Add { content, date } => {
            let date = date.unwrap_or_else(|| clock.today().format(DATE_FORMAT).to_string());
            cache.add(NewTodo::new(content, date)).await
        }
        Command::Done { id } => cache.update(&id, TodoPatch::completed(true)).await,
        Command::Undone { id } => cache.update(&id, TodoPatch::completed(false)).await,
        Command::Edit { id, content, date } => {
            let patch = TodoPatch {
                content,
                date,
                completed: None,
            };
            cache.update(&id, patch).await
        }
        Command::Delete { id } => cache.delete(&id).await,
        Command::Timer { .. } | Command::Harvest => return Ok(()),
    };

    match outcome {
        MutationOutcome::Applied(todo) => {
            println!("{}", format_todo(&todo));
            Ok(())
        }
        MutationOutcome::Rejected(_) | MutationOutcome::Failed => {
            if let Some(err) = cache.last_error() {
                debug!(error = %err, "Mutation did not apply");
            }
            bail!("{}", cache.error_message().unwrap_or("Request failed."))
        }
        MutationOutcome::Ignored => bail!("No such todo in the current list"),
    }
}

fn print_buckets(buckets: &TodoBuckets) {
    println!("Today");
    if buckets.today.is_empty() {
        println!("  (nothing)");
    }
    for todo in &buckets.today {
        println!("  {}", format_todo(todo));
    }

    println!("This week");
    if buckets.weekly.is_empty() {
        println!("  (nothing)");
    }
    for todo in &buckets.weekly {
        println!("  {:>5}  {}", todo.month_day(), format_todo(todo));
    }
}

fn format_todo(todo: &Todo) -> String {
    let mark = if todo.completed { "x" } else { " " };
    format!("[{mark}] {}  ({})", todo.content, todo.id)
}

/// Runs one session in the foreground until it completes or is abandoned.
async fn run_timer(length: SessionLength, jar: Arc<CookieJar>, clock: Arc<dyn Clock>) -> Result<()> {
    let harvest = HarvestCounter::load(jar, clock).context("Failed to load harvest")?;
    let service = TimerService::new(harvest);
    let mut updates = service.subscribe();

    service.select(length);
    service.start();
    render(&service.snapshot());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *updates.borrow_and_update();
                if snapshot.completed_sessions > 0 {
                    println!("\rSession complete! Today: {}", service.tomatoes());
                    break;
                }
                // A session may straddle midnight.
                service.refresh_day();
                render(&snapshot);
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match line.trim() {
                        "p" => {
                            service.pause();
                        }
                        "r" => {
                            service.resume();
                        }
                        "q" => {
                            service.reset();
                            println!("Session abandoned.");
                            break;
                        }
                        _ => {}
                    },
                    Ok(None) | Err(_) => stdin_open = false,
                }
            }
            _ = &mut ctrl_c => {
                service.reset();
                println!("\nSession abandoned.");
                break;
            }
        }
    }

    Ok(())
}

fn render(snapshot: &TimerSnapshot) {
    let label = match snapshot.state {
        TimerState::Running => "running",
        TimerState::Paused => "paused ",
        TimerState::Idle => "idle   ",
    };
    print!("\r{label} {:>5}", format_remaining(snapshot.remaining_secs));
    let _ = io::stdout().flush();
}

/// Logs go to stderr at `warn` unless `RUST_LOG` says otherwise.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}
