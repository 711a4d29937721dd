// Copyright 2026 Oxide Computer Company

//! `git-file-id`: deterministic file identifiers from Git metadata.

mod commands;

use camino::Utf8PathBuf;
use clap::{ArgAction, Args, Parser, Subcommand};
use git_file_id::{
    Algorithm, BatchInputError, Encoding, IdentifierOptions, IdentifyError,
    ShortForm,
};
use git_file_id_backend::{BatchError, EnvError};
use std::process::ExitCode;
use tracing::{Level, subscriber::set_global_default};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "git-file-id",
    version,
    about = "Generate unique, deterministic file identifiers from Git metadata"
)]
struct Opts {
    /// Increase log verbosity (-v, -vv, -vvv). Default WARN.
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Decrease log verbosity.
    #[arg(short = 'q', long, action = ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Identify a file in a local Git repository.
    Local {
        /// The file path, relative to the repository root or absolute.
        file: String,
        /// A path inside the repository.
        #[arg(long, default_value = ".")]
        repo: Utf8PathBuf,
        #[command(flatten)]
        identifier: IdentifierArgs,
        #[command(flatten)]
        output: SingleOutputArgs,
    },

    /// Identify a file through the GitHub API.
    Github {
        /// The repository owner.
        owner: String,
        /// The repository name.
        repo: String,
        /// The file path within the repository.
        file: String,
        /// The branch to read.
        #[arg(long, default_value = git_file_id::DEFAULT_BRANCH)]
        branch: String,
        #[command(flatten)]
        github: GitHubArgs,
        #[command(flatten)]
        identifier: IdentifierArgs,
        #[command(flatten)]
        output: SingleOutputArgs,
    },

    /// Identify every file listed in a JSON batch input file.
    Batch {
        /// A JSON array of batch inputs.
        input: Utf8PathBuf,
        /// Write results here instead of standard output.
        #[arg(long, short = 'o')]
        output: Option<Utf8PathBuf>,
        /// Also write a manifest of the successful results.
        #[arg(long, value_name = "FILE")]
        write_manifest: Option<Utf8PathBuf>,
        /// Print progress to standard error.
        #[arg(long)]
        progress: bool,
        /// Stop at the first failed file.
        #[arg(long)]
        fail_fast: bool,
        #[command(flatten)]
        batch: BatchArgs,
        #[command(flatten)]
        github: GitHubArgs,
        #[command(flatten)]
        identifier: IdentifierArgs,
    },

    /// Compare the files in a batch input file with a previous manifest.
    Diff {
        /// A JSON array of batch inputs.
        input: Utf8PathBuf,
        /// The previous manifest.
        manifest: Utf8PathBuf,
        /// Write the change report here instead of standard output.
        #[arg(long, short = 'o')]
        output: Option<Utf8PathBuf>,
        #[command(flatten)]
        batch: BatchArgs,
        #[command(flatten)]
        github: GitHubArgs,
        #[command(flatten)]
        identifier: IdentifierArgs,
    },

    /// Show a file's identifier, metadata and repository.
    Info {
        /// The file path, relative to the repository root or absolute.
        file: String,
        /// A path inside the repository.
        #[arg(long, default_value = ".")]
        repo: Utf8PathBuf,
        #[command(flatten)]
        identifier: IdentifierArgs,
    },
}

#[derive(Debug, Args)]
struct IdentifierArgs {
    /// The digest algorithm.
    #[arg(long, default_value_t = Algorithm::Sha256)]
    algorithm: Algorithm,
    /// The digest encoding.
    #[arg(long, default_value_t = Encoding::Hex)]
    encoding: Encoding,
    /// The number of digest characters in the short form.
    #[arg(long, value_name = "N")]
    truncate: Option<usize>,
    /// Keep the algorithm prefix on the short form.
    #[arg(long)]
    prefixed_short: bool,
}

impl IdentifierArgs {
    fn to_options(&self) -> IdentifierOptions {
        IdentifierOptions {
            algorithm: self.algorithm,
            encoding: self.encoding,
            truncate: self.truncate,
            short_form: if self.prefixed_short {
                ShortForm::Prefixed
            } else {
                ShortForm::Digest
            },
        }
    }
}

#[derive(Debug, Args)]
struct SingleOutputArgs {
    /// Print only the short identifier.
    #[arg(long, conflicts_with = "json")]
    short: bool,
    /// Print the identifier and metadata as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// The maximum number of files processed at once.
    #[arg(long, default_value_t = git_file_id_backend::DEFAULT_CONCURRENCY)]
    concurrency: usize,
}

#[derive(Debug, Args)]
struct GitHubArgs {
    /// A GitHub token. Defaults to $GITHUB_TOKEN.
    #[arg(long)]
    token: Option<String>,
}

fn init_tracing(verbose: u8, quiet: u8) {
    let level = match i16::from(verbose) - i16::from(quiet) {
        ..=-1 => Level::ERROR,
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

    // Only fails if a subscriber is already installed.
    let _ = set_global_default(subscriber);
}

/// Returns true if `err` is one of the library's domain errors, as
/// opposed to an unexpected failure.
fn is_domain_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause.is::<IdentifyError>()
            || cause.is::<BatchError>()
            || cause.is::<BatchInputError>()
            || cause.is::<EnvError>()
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let opts = Opts::parse();
    init_tracing(opts.verbose, opts.quiet);

    match commands::run(opts.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_domain_error(&err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("unexpected error: {err:#}");
            ExitCode::from(2)
        }
    }
}
