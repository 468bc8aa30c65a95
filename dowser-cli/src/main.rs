mod display;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dowser_core::colors::CatppuccinExt;
use dowser_core::{
    DocumentReport, LinkChecker, LinkStatus, OutputFormat, ProgressCallback, RedirectMode,
    StatusResolver,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dowser")]
#[command(about = "Link checker for blog posts - extracts every URL from a document and probes it")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human or json)
    #[arg(short, long, default_value = "human")]
    format: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Maximum simultaneous probes
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Wall-clock budget for a whole document, in seconds
    #[arg(long)]
    deadline: Option<u64>,

    /// Redirect handling (native or manual)
    #[arg(long, default_value = "native")]
    redirects: String,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every link in one or more documents
    Check {
        /// Files to scan; reads stdin when none are given
        files: Vec<PathBuf>,
    },
    /// Probe a single URL
    Url {
        /// URL to probe (https:// is assumed when no scheme is given)
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, routed through the progress display
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(display::ProgressWriterFactory::new())
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let output_format: OutputFormat = match cli.format.parse() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("{} {}", "Error:".ctp_red(), e);
            std::process::exit(1);
        }
    };

    let redirect_mode: RedirectMode = match cli.redirects.parse() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{} {}", "Error:".ctp_red(), e);
            std::process::exit(1);
        }
    };

    let resolver = StatusResolver::builder()
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_follower(redirect_mode.follower())
        .build()?;

    let mut checker = LinkChecker::with_resolver(resolver).with_concurrency(cli.concurrency);
    if let Some(secs) = cli.deadline {
        checker = checker.with_deadline(Duration::from_secs(secs));
    }

    debug!(
        timeout = cli.timeout,
        concurrency = cli.concurrency,
        redirects = %cli.redirects,
        "checker configured"
    );

    execute_command(cli.command, checker, output_format).await
}

async fn execute_command(
    command: Commands,
    checker: LinkChecker,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let formatter = dowser_core::get_formatter(output_format);

    match command {
        Commands::Check { files } => {
            let documents = load_documents(&files);

            let mut checked_any = false;
            let mut all_good = true;

            for (source, text) in &documents {
                let statuses = check_with_progress(&checker, text, output_format).await;
                let report = DocumentReport::new(source.clone(), statuses);
                if !report.has_links() {
                    continue;
                }
                checked_any = true;
                if !report.all_good() {
                    all_good = false;
                }
                println!("{}", formatter.format_report(&report));
            }

            if !checked_any {
                eprintln!("No links found.");
            } else if !all_good {
                std::process::exit(2);
            }
        }
        Commands::Url { url } => {
            let url = if url.starts_with("http://") || url.starts_with("https://") {
                url
            } else {
                format!("https://{}", url)
            };

            let spinner = matches!(output_format, OutputFormat::Human)
                .then(|| display::Spinner::new(&format!("Probing {}...", url)));

            let status = checker.resolver().resolve(&url).await;

            if let Some(spinner) = spinner {
                spinner.finish();
            }

            println!("{}", formatter.format_status(&status));

            if !status.good() {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}

/// Read every input up front so a bad path fails the run before any
/// network traffic happens.
fn load_documents(files: &[PathBuf]) -> Vec<(String, String)> {
    if files.is_empty() {
        match std::io::read_to_string(std::io::stdin()) {
            Ok(text) => return vec![("stdin".to_string(), text)],
            Err(e) => {
                eprintln!("{} reading stdin: {}", "Error:".ctp_red(), e);
                std::process::exit(1);
            }
        }
    }

    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        match std::fs::read_to_string(file) {
            Ok(text) => documents.push((file.display().to_string(), text)),
            Err(e) => {
                eprintln!("{} {}: {}", "Error:".ctp_red(), file.display(), e);
                std::process::exit(1);
            }
        }
    }
    documents
}

async fn check_with_progress(
    checker: &LinkChecker,
    text: &str,
    output_format: OutputFormat,
) -> Vec<LinkStatus> {
    if output_format != OutputFormat::Human {
        return checker.check_document(text).await;
    }

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("Progress bar template is hardcoded and should be valid")
            .progress_chars("█▓░"),
    );
    display::set_check_progress_bar(progress.clone());

    let bar = progress.clone();
    let callback: ProgressCallback = Box::new(move |completed, total, url| {
        bar.set_length(total as u64);
        bar.set_position(completed as u64);
        bar.set_message(url.to_string());
    });

    let statuses = checker
        .check_document_with_progress(text, Some(callback))
        .await;

    progress.finish_and_clear();
    display::clear_check_progress_bar();

    statuses
}
