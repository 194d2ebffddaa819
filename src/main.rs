//! CLI entry point for `mailextract`.

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailextract::config::Config;
use mailextract::error::ExtractError;
use mailextract::extract::{self, SearchRequest};
use mailextract::materialize::{MaterializeOptions, Materializer};
use mailextract::model::headers::RepeatedHeaders;
use mailextract::model::report::RunSummary;
use mailextract::session::{ImapSession, Mailbox};

/// Download matching IMAP messages into one directory per message:
/// headers, text and HTML bodies, attachments and delivery-status reports.
#[derive(Parser)]
#[command(
    name = "mailextract",
    version,
    subcommand_negates_reqs = true,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// IMAP server hostname
    #[arg(value_name = "HOSTNAME", required = true)]
    hostname: Option<String>,

    /// Account user name
    #[arg(value_name = "USERNAME", required = true)]
    username: Option<String>,

    /// List the available folders instead of downloading
    #[arg(short = 'l', long)]
    list_folders: bool,

    /// Subject search pattern (empty matches everything)
    #[arg(short, long, value_name = "PATTERN", default_value = "")]
    subject: String,

    /// Body search pattern (`*` matches everything)
    #[arg(short, long, value_name = "PATTERN", default_value = "*")]
    body: String,

    /// Password; prompted for without echo when omitted
    #[arg(short, long, env = "MAILEXTRACT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// IMAP folder to search [default: INBOX, or the config's default_folder]
    #[arg(short, long, value_name = "NAME")]
    folder: Option<String>,

    /// Directory receiving one subdirectory per message [default: emails]
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// IMAP over TLS port [default: 993]
    #[arg(long)]
    port: Option<u16>,

    /// Keep every value of repeated headers (e.g. Received) as a list
    #[arg(long)]
    all_header_values: bool,

    /// Print the folder list or the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Print per-message and per-part debug output to stdout (stderr with --json)
    #[arg(long)]
    debug: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = mailextract::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = if cli.debug {
        "debug"
    } else {
        match cli.verbose {
            0 => config.general.log_level.as_str(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    setup_logging(log_level, &config, debug_to_stdout(&cli));

    match &cli.command {
        Some(Commands::Completions { shell }) => cmd_completions(*shell),
        Some(Commands::Manpage) => cmd_manpage(),
        None => cmd_run(&cli, &config),
    }
}

/// `--debug` traces go to stdout unless stdout carries JSON.
fn debug_to_stdout(cli: &Cli) -> bool {
    cli.debug && !cli.json
}

/// Set up tracing with console output and optional file logging.
fn setup_logging(level: &str, config: &Config, to_stdout: bool) {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let console = if to_stdout {
        BoxMakeWriter::new(std::io::stdout)
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };
    let console_layer = tracing_subscriber::fmt::layer().with_writer(console);

    // Try to set up file logging
    let log_dir = mailextract::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailextract.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to console only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailextract", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Connect, then either list folders or download matching messages.
fn cmd_run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let hostname = cli.hostname.as_deref().context("HOSTNAME is required")?;
    let username = cli.username.as_deref().context("USERNAME is required")?;

    let password = match &cli.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password(format!("Password for {username}@{hostname}: "))
            .context("Could not read password")?,
    };

    let port = cli.port.unwrap_or(config.imap.port);
    if !cli.json {
        println!("  Connecting to `{hostname}` as {username}...");
    }
    let mut session = ImapSession::connect(hostname, port, username, &password)?;

    if cli.list_folders {
        let folders = session.list_folders()?;
        session.close()?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&folders)?);
        } else {
            for folder in &folders {
                println!("  {folder}");
            }
        }
        return Ok(());
    }

    let request = SearchRequest {
        folder: cli
            .folder
            .clone()
            .unwrap_or_else(|| config.imap.default_folder.clone()),
        subject: cli.subject.clone(),
        body: cli.body.clone(),
    };
    let materializer = Materializer::new(MaterializeOptions {
        root: cli
            .output
            .clone()
            .unwrap_or_else(|| config.output.root_dir.clone()),
        repeated_headers: if cli.all_header_values {
            RepeatedHeaders::All
        } else {
            config.output.repeated_headers
        },
    });

    let pb = if cli.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(0)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Downloading [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let result = extract::download(&mut session, &materializer, &request, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    });
    pb.finish_and_clear();

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            if let ExtractError::FolderNotFound { available, .. } = &e {
                eprintln!("  Available folders:");
                for name in available {
                    eprintln!("    {name}");
                }
            }
            return Err(e.into());
        }
    };
    session.close()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Print the run summary as a human-readable table.
fn print_summary(summary: &RunSummary) {
    use humansize::{format_size, BINARY};

    println!();
    println!(
        "  Downloaded {} email(s) from {} to {}",
        summary.messages.len(),
        summary.folder,
        summary.root.display()
    );
    println!("  {:<20} {}", "Files written", summary.files_written());
    println!("  {:<20} {}", "Files skipped", summary.files_skipped());
    println!(
        "  {:<20} {}",
        "Bytes written",
        format_size(summary.bytes_written(), BINARY)
    );
    println!();
}
