use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "polygraph",
    version,
    about = "Polyglot code graph builder",
    after_help = r#"Examples:
  polygraph index --repo .
  polygraph index --repo ../shop --name shop --no-ignore
  polygraph scan --repo .
  polygraph workspace --repo .
  polygraph overview --repo .
  polygraph check --repo .
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Index the repository into the graph database and exit.
    Index {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
        /// Repo name recorded on every row; defaults to the directory name.
        #[arg(long)]
        name: Option<String>,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
    /// List scanned files and detected languages without writing anything.
    Scan {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
    /// Show detected workspace roots.
    Workspace {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
    /// Print entity and edge counts for the published graph version.
    Overview {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Verify no rows carry a version tag other than the published one.
    Check {
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        name: Option<String>,
    },
}
