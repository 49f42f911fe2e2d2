mod cmd_config;
mod cmd_hook;
mod cmd_install;
mod cmd_scan;
mod cmd_tracker;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use hookjira_core::HookPaths;

#[derive(Parser)]
#[command(
    name = "hookjira",
    version,
    about = "Push commit-message issue references to Jira"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one changeset (called from a git or hg hook)
    Hook {
        /// Repository root (default: discovered from the current directory)
        #[arg(long)]
        repo: Option<PathBuf>,
        /// Changeset id (default: $HG_NODE, then HEAD for git)
        #[arg(long)]
        rev: Option<String>,
        /// Branch the changeset was pushed to (default: from the repository)
        #[arg(long)]
        branch: Option<String>,
        /// Version control system: git or hg (default: detected)
        #[arg(long)]
        vcs: Option<String>,
    },
    /// Show the references and comments a description would produce, without
    /// contacting the tracker
    Scan {
        /// Description text (default: read from --file or stdin)
        text: Option<String>,
        /// Read the description from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
        #[arg(long)]
        repo: Option<PathBuf>,
        /// Print the references as JSON
        #[arg(long)]
        json: bool,
    },
    /// Install hookjira hooks into a repository
    Install {
        #[arg(long)]
        repo: Option<PathBuf>,
        #[arg(long)]
        vcs: Option<String>,
    },
    /// Remove hookjira hooks from a repository
    Uninstall {
        #[arg(long)]
        repo: Option<PathBuf>,
        #[arg(long)]
        vcs: Option<String>,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
        #[arg(long, global = true)]
        repo: Option<PathBuf>,
    },
    /// Talk to the issue tracker
    Tracker {
        #[command(subcommand)]
        cmd: cmd_tracker::TrackerCmd,
        #[arg(long, global = true)]
        repo: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.cmd {
        Command::Hook {
            repo,
            rev,
            branch,
            vcs,
        } => {
            let root = repo_root(&cwd, repo);
            if let Err(e) = cmd_hook::execute(&root, rev, branch.as_deref(), vcs.as_deref()) {
                eprintln!("jira error: {e:#}");
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Scan {
            text,
            file,
            repo,
            json,
        } => cmd_scan::execute(&repo_root(&cwd, repo), text, file.as_deref(), json),
        Command::Install { repo, vcs } => {
            cmd_install::install(&repo_root(&cwd, repo), vcs.as_deref())
        }
        Command::Uninstall { repo, vcs } => {
            cmd_install::uninstall(&repo_root(&cwd, repo), vcs.as_deref())
        }
        Command::Config { cmd, repo } => cmd_config::run(cmd, &repo_root(&cwd, repo)),
        Command::Tracker { cmd, repo } => cmd_tracker::run(cmd, &repo_root(&cwd, repo)),
    }
}

/// Explicit `--repo`, else the enclosing repository of `cwd`, else `cwd`.
fn repo_root(cwd: &Path, explicit: Option<PathBuf>) -> PathBuf {
    match explicit {
        Some(path) if path.is_absolute() => path,
        Some(path) => cwd.join(path),
        None => HookPaths::find_repo_root(cwd).unwrap_or_else(|| cwd.to_path_buf()),
    }
}

/// Log to stderr so hook stdout only carries the status lines.
/// Filter from `HOOKJIRA_LOG`, default `warn`.
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("HOOKJIRA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
