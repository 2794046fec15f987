use anyhow::{anyhow, bail, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use portsort_core::{LogLevel, StopFlag, RESULTS_DIR};
use scrape::{ScrapeEvent, ScrapeOptions, PROCESSING_LOG_PREFIX};
use services::{store, ServiceTable};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tracing::{debug, info, subscriber::set_global_default, warn, Level};
use tracing_subscriber::EnvFilter;

mod config;
mod report;

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::new())
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    // already set when embedded in tests
    let _ = set_global_default(subscriber);
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat { Text, Json, Jsonl }

impl OutputFormat {
    fn from_config(s: &str) -> Self {
        match s { "json" => OutputFormat::Json, "jsonl" => OutputFormat::Jsonl, _ => OutputFormat::Text }
    }
}

#[derive(Debug, Parser)]
#[command(name = "portsort", version, about = "Sort credential dump lines into per-service files by port")]
struct Cli {
    /// Optional config file (YAML). If omitted, loads ./portsort.yaml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Service definitions (JSON). Default: ./services_config.json, created if missing.
    #[arg(long, global = true, value_name = "FILE")]
    services: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv). Default INFO.
    #[arg(short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Decrease log verbosity (-q).
    #[arg(short = 'q', action = ArgAction::Count, global = true)]
    quiet: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Scrape every .txt file in a directory into per-service result files
    Run {
        /// Directory holding the dump files (not searched recursively)
        dir: PathBuf,
        /// Output directory (default: "RESULT LIST")
        #[arg(long, value_name = "DIR")]
        results_dir: Option<PathBuf>,
        /// Summary format: text, json, or jsonl
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
        /// Also write the summary to this file (overwrites)
        #[arg(long, value_name = "FILE")]
        summary: Option<PathBuf>,
        /// Write the --summary file as CSV
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
    /// Inspect or edit the service definitions
    Services {
        #[command(subcommand)]
        cmd: ServicesCmd,
    },
}

#[derive(Debug, Subcommand)]
enum ServicesCmd {
    /// Show the validated service table
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Write the built-in default services
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Add a service
    Add {
        #[arg(long)]
        name: String,
        /// Comma-separated ports (e.g., 2082,2083)
        #[arg(long)]
        ports: String,
        /// Output file name (default: <name>.txt)
        #[arg(long)]
        file: Option<String>,
        /// Display icon hint for front-ends
        #[arg(long)]
        icon: Option<String>,
    },
    /// Remove a service by name
    Remove { name: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose.saturating_add(1).saturating_sub(cli.quiet));
    let loaded_cfg = config::load_config(cli.config.as_deref()).unwrap_or_default();
    let services_path = cli
        .services
        .clone()
        .or_else(|| loaded_cfg.services.clone())
        .unwrap_or_else(|| PathBuf::from(store::CONFIG_FILE));

    match cli.command {
        Commands::Version => {
            println!("portsort {} (core {})", env!("CARGO_PKG_VERSION"), portsort_core::version());
        }
        Commands::Run { dir, results_dir, format, summary, csv } => {
            let results_dir = results_dir
                .or_else(|| loaded_cfg.results_dir.clone())
                .unwrap_or_else(|| PathBuf::from(RESULTS_DIR));
            let format = format
                .or_else(|| loaded_cfg.format.as_deref().map(OutputFormat::from_config))
                .unwrap_or(OutputFormat::Text);
            if csv && summary.is_none() {
                bail!("--csv requires --summary <FILE>");
            }
            run_scrape(&dir, &services_path, results_dir, format, summary.as_deref(), csv)?;
        }
        Commands::Services { cmd } => services_cmd(cmd, &services_path)?,
    }
    Ok(())
}

fn run_scrape(
    dir: &Path,
    services_path: &Path,
    results_dir: PathBuf,
    format: OutputFormat,
    summary_out: Option<&Path>,
    csv: bool,
) -> Result<()> {
    let records = store::load_or_init(services_path)?;
    let table = Arc::new(ServiceTable::validate(&records)?);
    info!(services = %services_path.display(), count = table.len(), "service table loaded");

    let started_at = now_rfc3339();
    let started = Instant::now();
    let stop = StopFlag::new();
    let ctrlc_stop = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received Ctrl+C, stopping after the current file");
        ctrlc_stop.request_stop();
    }) {
        warn!(error = %e, "Ctrl+C handler not installed; the run cannot be interrupted cleanly");
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<ScrapeEvent>();
    let handle = scrape::start_with_stop_flag(dir.to_path_buf(), table.clone(), ScrapeOptions { results_dir }, stop, tx)?;

    // the sender lives in the worker; the channel closes when the run ends
    let mut current = String::new();
    while let Some(ev) = rx.blocking_recv() {
        match ev {
            ScrapeEvent::Log { message, level } => {
                if let Some(name) = message.strip_prefix(PROCESSING_LOG_PREFIX) {
                    current = name.to_string();
                }
                render_log(&message, level);
            }
            ScrapeEvent::Progress { done, total } => eprintln!("{}", progress_line(done, total, &current)),
            ScrapeEvent::CountChanged { service, count } => debug!(%service, count, "new match"),
            ScrapeEvent::Finished(_) => {}
            // reported once, through the error returned below
            ScrapeEvent::Failed(msg) => debug!(error = %msg, "worker reported failure"),
        }
    }
    let summary = handle.join().map_err(|e| anyhow!("scrape failed: {}", e))?;
    let times = report::RunTimes {
        started_at,
        ended_at: now_rfc3339(),
        duration_ms: started.elapsed().as_millis(),
    };

    let rendered = match format {
        OutputFormat::Text => report::summary_text(&table, &summary),
        OutputFormat::Json => serde_json::to_string_pretty(&report::summary_json(dir, &table, &summary, &times))? + "\n",
        OutputFormat::Jsonl => serde_json::to_string(&report::summary_json(dir, &table, &summary, &times))? + "\n",
    };
    print!("{}", rendered);

    if let Some(path) = summary_out {
        let mut w = BufWriter::new(File::create(path)?);
        if csv {
            report::write_csv(&mut w, &table, &summary)?;
        } else {
            w.write_all(rendered.as_bytes())?;
        }
        w.flush()?;
    }
    Ok(())
}

fn progress_line(done: usize, total: usize, file: &str) -> String {
    format!("[{}/{}] {}", done, total, file).trim_end().to_string()
}

fn render_log(message: &str, level: LogLevel) {
    eprintln!("{:<7} {}", level, message);
}

fn services_cmd(cmd: ServicesCmd, path: &Path) -> Result<()> {
    match cmd {
        ServicesCmd::List { format } => {
            let table = ServiceTable::validate(&store::load_or_init(path)?)?;
            match format {
                OutputFormat::Text => {
                    for svc in table.iter() {
                        println!("{}: {} -> {}", svc.name, svc.ports.join(","), svc.output_file);
                    }
                }
                OutputFormat::Json => {
                    let defs: Vec<_> = table.iter().collect();
                    println!("{}", serde_json::to_string_pretty(&defs)?);
                }
                OutputFormat::Jsonl => {
                    for svc in table.iter() {
                        println!("{}", serde_json::to_string(svc)?);
                    }
                }
            }
        }
        ServicesCmd::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            store::save(path, &store::default_records())?;
            println!("wrote default services to {}", path.display());
        }
        ServicesCmd::Add { name, ports, file, icon } => {
            let mut records = store::load_or_init(path)?;
            store::add_service(&mut records, &name, &ports, file, icon)?;
            ServiceTable::validate(&records)?;
            store::save(path, &records)?;
            println!("added service '{}'", name.trim());
        }
        ServicesCmd::Remove { name } => {
            let mut records = store::load_or_init(path)?;
            let removed = store::remove_service(&mut records, &name)?;
            store::save(path, &records)?;
            println!("removed service '{}' (ports {})", removed.name, removed.ports.join(","));
        }
    }
    Ok(())
}
