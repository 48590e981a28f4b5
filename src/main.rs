use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use weft::commands::{feature, init, plan};
use weft::models::Status;
use weft::plan::SchedulePolicy;
use weft::validation::{clap_id_validator, clap_name_validator};
use weft::worktree::TeardownPlan;

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "Coordinate feature branches and worktrees across many repositories", long_about = None)]
#[command(version)]
struct Cli {
    /// Workspace root (defaults to the nearest directory holding .weft.json)
    #[arg(short, long, global = true, value_name = "DIR")]
    workspace: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover repositories and write a fresh workspace document
    Init,

    /// Manage features
    Feature {
        #[command(subcommand)]
        command: FeatureCommands,
    },

    /// Show conflicts between features and the order they can run in
    Plan {
        /// Which of two conflicting features runs first: list-order or oldest-first
        #[arg(long)]
        policy: Option<SchedulePolicy>,
    },
}

#[derive(Subcommand)]
enum FeatureCommands {
    /// Create a feature and a worktree in each of its repositories
    Create {
        /// Human-readable feature name
        #[arg(value_parser = clap_name_validator)]
        name: String,

        /// Repositories the feature spans (comma separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        repos: Vec<String>,

        /// Record the feature without creating worktrees
        #[arg(long)]
        no_worktrees: bool,
    },

    /// Create any missing worktrees for an existing feature
    Provision {
        #[arg(value_parser = clap_id_validator)]
        feature_id: String,
    },

    /// Show every feature and its per-repository status
    Status,

    /// Set one repository's status within a feature
    Update {
        #[arg(value_parser = clap_id_validator)]
        feature_id: String,

        /// Repository to update
        repository: String,

        /// New status: pending, in-progress or completed
        status: Status,
    },

    /// Promote pending repositories whose worktrees show work to in-progress
    Refresh {
        #[arg(value_parser = clap_id_validator)]
        feature_id: String,
    },

    /// Tear down a feature's worktrees and remove it from the workspace
    Complete {
        #[arg(value_parser = clap_id_validator)]
        feature_id: String,

        /// remove-worktrees, merge (merge then remove) or full (merge, remove, delete branch)
        #[arg(short, long, default_value = "remove-worktrees")]
        action: TeardownPlan,

        /// Keep the feature record after teardown
        #[arg(long)]
        keep: bool,

        /// Complete even if some repositories are unfinished
        #[arg(short, long)]
        force: bool,

        /// Remove worktrees even when they hold uncommitted changes
        #[arg(long)]
        force_remove: bool,
    },

    /// Run a command in every worktree of a feature
    Run {
        #[arg(value_parser = clap_id_validator)]
        feature_id: String,

        /// Kill the command after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Command to run, after `--`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show timing, progress and git statistics for a feature
    Stats {
        #[arg(value_parser = clap_id_validator)]
        feature_id: String,
    },

    /// Delete features along with their worktrees and branches
    Cleanup {
        /// Features to delete
        #[arg(value_parser = clap_id_validator)]
        feature_ids: Vec<String>,

        /// Delete every feature
        #[arg(long, conflicts_with = "feature_ids")]
        all: bool,

        /// Remove worktrees even when they hold uncommitted changes
        #[arg(long)]
        force_remove: bool,
    },

    /// Force-delete leftover feature branches in every repository
    PruneBranches {
        /// List the branches without deleting them
        #[arg(long)]
        dry_run: bool,
    },
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "weft=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let workspace = cli.workspace.as_deref();

    match cli.command {
        Commands::Init => init::execute(workspace),
        Commands::Plan { policy } => plan::execute(workspace, policy),
        Commands::Feature { command } => match command {
            FeatureCommands::Create {
                name,
                repos,
                no_worktrees,
            } => feature::create::execute(workspace, &name, &repos, no_worktrees),
            FeatureCommands::Provision { feature_id } => {
                feature::create::provision(workspace, &feature_id)
            }
            FeatureCommands::Status => feature::status::execute(workspace),
            FeatureCommands::Update {
                feature_id,
                repository,
                status,
            } => feature::update::execute(workspace, &feature_id, &repository, status),
            FeatureCommands::Refresh { feature_id } => {
                feature::update::refresh(workspace, &feature_id)
            }
            FeatureCommands::Complete {
                feature_id,
                action,
                keep,
                force,
                force_remove,
            } => feature::complete::execute(workspace, &feature_id, action, keep, force, force_remove),
            FeatureCommands::Run {
                feature_id,
                timeout,
                command,
            } => feature::run::execute(workspace, &feature_id, &command, timeout),
            FeatureCommands::Stats { feature_id } => feature::stats::execute(workspace, &feature_id),
            FeatureCommands::Cleanup {
                feature_ids,
                all,
                force_remove,
            } => feature::cleanup::execute(workspace, &feature_ids, all, force_remove),
            FeatureCommands::PruneBranches { dry_run } => feature::prune::execute(workspace, dry_run),
        },
    }
}
