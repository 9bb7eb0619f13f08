use clap::{Parser, ValueEnum};
use console::{Term, set_colors_enabled, style};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::signal;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ntpclock::{BackgroundSync, ClientConfig, NtpClient, SyncReport, fmt};

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "ntpclock")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch the current time from the first NTP server that answers")]
#[command(long_about = Some(
    "Query NTP servers in order and print the first answer.\n\
     \n\
     Examples:\n\
       ntpclock\n\
       ntpclock time.google.com 192.0.2.10:1123\n\
       ntpclock --add-server ntp.example.org --timeout 2000 --json\n\
       ntpclock --watch --interval 60"
))]
struct Args {
    /// Servers to try, in order (replaces the configured list)
    #[arg(index = 1)]
    servers: Vec<String>,

    /// Append a server after the configured ones (repeatable)
    #[arg(short = 'a', long = "add-server")]
    add_server: Vec<String>,

    /// Per-server timeout in milliseconds
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Output format: text or json
    #[arg(short = 'f', long, default_value = "text", value_enum)]
    format: OutputFormat,

    /// Alias for JSON output
    #[arg(short = 'j', long)]
    json: bool,

    /// Pretty-print JSON
    #[arg(short = 'p', long)]
    pretty: bool,

    /// Disable colored output
    #[arg(long = "no-color", alias = "nocolor")]
    no_color: bool,

    /// Show every attempt and debug logs
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Keep running and re-sync periodically until Ctrl-C
    #[arg(short = 'w', long)]
    watch: bool,

    /// Seconds between syncs in watch mode
    #[arg(short = 'i', long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Read settings from this file instead of the default config.toml
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "ntpclock=debug" } else { "ntpclock=error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn fail(term: &Term, msg: &str, code: i32) -> ! {
    term.write_line(&style(format!("Error: {msg}")).red().bold().to_string())
        .ok();
    process::exit(code);
}

fn output(term: &Term, report: &SyncReport, args: &Args, short: bool) {
    match args.format {
        OutputFormat::Json => match fmt::json::to_json(report, args.pretty) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serializing: {}", e),
        },
        OutputFormat::Text if short && !args.verbose => {
            term.write_line(&fmt::text::render_short(report)).ok();
        }
        OutputFormat::Text => {
            term.write_line(&fmt::text::render_report(report, args.verbose))
                .ok();
        }
    }
}

#[tokio::main]
async fn main() {
    let mut args = Args::parse();

    // alias --json
    if args.json {
        args.format = OutputFormat::Json;
    }
    let want_color = args.format == OutputFormat::Text
        && io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none()
        && !args.no_color;
    set_colors_enabled(want_color);
    init_logging(args.verbose);

    let term = Term::stdout();

    if args.interval.is_some() && !args.watch {
        fail(&term, "--interval requires --watch", 2);
    }
    if args.pretty && args.format == OutputFormat::Text {
        term.write_line(
            &style("--pretty has no effect with text output")
                .yellow()
                .to_string(),
        )
        .ok();
    }

    let loaded = match &args.config {
        Some(path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => fail(&term, &e.to_string(), 2),
    };
    if !args.servers.is_empty() {
        config.servers = args.servers.clone();
    }
    config.servers.extend(args.add_server.iter().cloned());
    if let Some(ms) = args.timeout {
        config.timeout = Duration::from_millis(ms);
    }
    if let Some(secs) = args.interval {
        config.interval = Duration::from_secs(secs);
    }
    if config.servers.is_empty() {
        fail(&term, "no servers configured", 2);
    }
    debug!(?config, "effective configuration");

    let sync = BackgroundSync::new(NtpClient::from_config(&config));

    loop {
        let task = match sync.start() {
            Ok(task) => task,
            Err(e) => fail(&term, &e.to_string(), 1),
        };
        let report = tokio::select! {
            res = task.wait() => match res {
                Ok(report) => report,
                Err(e) => fail(&term, &e.to_string(), 1),
            },
            _ = signal::ctrl_c() => break,
        };
        sync.acknowledge();
        output(&term, &report, &args, args.watch);

        if !args.watch {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {},
            _ = signal::ctrl_c() => break,
        }
    }

    process::exit(if sync.is_connected() { 0 } else { 1 });
}
