//! docreattach - reattach 1Password documents to the items that link them.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use docreattach::config::{DEFAULT_OP_PATH, DEFAULT_REATTACH_TAG};
use docreattach::filter::{Filters, ListFilter};
use docreattach::prompt::{Prompter, StdinPrompter};
use docreattach::{cleanup, factory, reattach, BackendType, Config, Options, RunOutcome};
use tracing_subscriber::{fmt, EnvFilter};

/// Reattach 1Password documents to the items that were converted to
/// standalone documents during the upgrade to 1Password 7.
///
/// Document references are replaced with file attachments, and the
/// standalone documents and references are removed.
#[derive(Debug, Parser)]
#[command(name = "docreattach", version)]
struct Cli {
    /// Don't change anything, only report what would be done
    #[arg(long)]
    dry_run: bool,

    /// Delete reattached documents instead of archiving them
    #[arg(long)]
    delete_docs: bool,

    /// Ask before reattaching each document (implies --verbose,
    /// --generate-share-links and --confirm-before-modifying)
    #[arg(long)]
    supervise: bool,

    /// Ask once before starting to modify the vault
    #[arg(long)]
    confirm_before_modifying: bool,

    /// Print progress and detailed summaries
    #[arg(long)]
    verbose: bool,

    /// Item titles must contain one of these strings
    #[arg(long, num_args = 0..)]
    item_whitelist: Vec<String>,

    /// Item titles must contain none of these strings
    #[arg(long, num_args = 0..)]
    item_blacklist: Vec<String>,

    /// Document titles must contain one of these strings
    #[arg(long, num_args = 0..)]
    doc_whitelist: Vec<String>,

    /// Document titles must contain none of these strings
    #[arg(long, num_args = 0..)]
    doc_blacklist: Vec<String>,

    /// Items must carry one of these tags
    #[arg(long, num_args = 0..)]
    tag_whitelist: Vec<String>,

    /// Items must carry none of these tags
    #[arg(long, num_args = 0..)]
    tag_blacklist: Vec<String>,

    /// Path to the op command line tool
    #[arg(long, env = "OP_CLI_PATH", default_value = DEFAULT_OP_PATH)]
    op_cli_path: String,

    /// 1Password account to use
    #[arg(long, env = "OP_ACCOUNT")]
    account: Option<String>,

    /// Fetch share links for items; they appear in prompts and the report
    #[arg(long)]
    generate_share_links: bool,

    /// Tag added to items that received documents
    #[arg(long, default_value = DEFAULT_REATTACH_TAG)]
    reattach_tag: String,

    /// Clean up standalone documents left over from the 1Password 7
    /// upgrade instead of following references
    #[arg(long)]
    cleanup_documents: bool,

    /// Directory the CSV report is written to
    #[arg(long, default_value = ".")]
    report_dir: PathBuf,

    /// Check at most this many items
    #[arg(long)]
    max_items: Option<usize>,

    /// Don't offer a cleanup run after reattaching
    #[arg(long)]
    no_follow_up: bool,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            dry_run: self.dry_run,
            archive_docs: !self.delete_docs,
            supervise: self.supervise,
            confirm_before_modifying: self.confirm_before_modifying,
            verbose: self.verbose,
            generate_share_links: self.generate_share_links,
            reattach_tag: self.reattach_tag.clone(),
            filters: Filters {
                items: ListFilter::new(self.item_whitelist.clone(), self.item_blacklist.clone()),
                documents: ListFilter::new(self.doc_whitelist.clone(), self.doc_blacklist.clone()),
                tags: ListFilter::new(self.tag_whitelist.clone(), self.tag_blacklist.clone()),
            },
            report_dir: self.report_dir.clone(),
            max_items: self.max_items,
        }
        .normalized()
    }

    fn config(&self) -> Config {
        let config = Config::new(BackendType::OnePassword).with_op_path(&self.op_cli_path);
        match self.account {
            Some(ref account) => config.with_option("account", account),
            None => config,
        }
    }
}

fn print_outcome(outcome: &RunOutcome) {
    if let Some(ref path) = outcome.report {
        println!("Report written to {}", path.display());
    }
}

async fn run(cli: &Cli) -> docreattach::Result<()> {
    let options = cli.options();

    docreattach::init();
    let mut backend = factory::new_backend(cli.config())?;
    backend.init().await?;
    tracing::debug!(backend = backend.name(), "backend ready");

    let mut prompter = StdinPrompter;

    if cli.cleanup_documents {
        let outcome = cleanup::run(backend.as_mut(), &mut prompter, &options).await?;
        print_outcome(&outcome);
        return Ok(());
    }

    let outcome = reattach::run(backend.as_mut(), &mut prompter, &options).await?;
    print_outcome(&outcome);

    if cli.no_follow_up || outcome.ledger.cancelled {
        return Ok(());
    }

    if prompter.confirm(
        "Would you like to follow up with additional cleaning up of 1P v7 documents?",
        true,
    )? {
        let outcome = cleanup::run(backend.as_mut(), &mut prompter, &options).await?;
        print_outcome(&outcome);
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose || cli.supervise {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
