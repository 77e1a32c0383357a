//! tally daemon: operator entry point for the vote-casting stores.

mod app;

use clap::Parser;
use std::path::PathBuf;

use tally_utils::LogFormat;
use tally_voting::{ReentryPolicy, VotingConfig};

#[derive(Parser)]
#[command(name = "tally-daemon", about = "Retrospective vote casting over LMDB and SQLite")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "TALLY_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of the authoritative LMDB environment.
    #[arg(long, env = "TALLY_LMDB_PATH")]
    lmdb_path: Option<PathBuf>,

    /// SQLite file of the shadow store.
    #[arg(long, env = "TALLY_SQLITE_PATH")]
    sqlite_path: Option<PathBuf>,

    /// Per-member vote cap on a single group.
    #[arg(long, env = "TALLY_MAX_VOTES_PER_GROUP")]
    max_votes_per_group: Option<u32>,

    /// Behavior for votes beyond the cap.
    #[arg(long, value_enum, env = "TALLY_REENTRY_POLICY")]
    reentry_policy: Option<PolicyArg>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TALLY_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TALLY_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PolicyArg {
    Reject,
    NoopSuccess,
}

impl From<PolicyArg> for ReentryPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Reject => ReentryPolicy::Reject,
            PolicyArg::NoopSuccess => ReentryPolicy::NoopSuccess,
        }
    }
}

#[derive(clap::Subcommand)]
enum Command {
    /// Create a meeting: one budget per user in LMDB and empty groups in both
    /// stores.
    Seed {
        #[arg(long)]
        meeting: String,
        /// Comma-separated user ids.
        #[arg(long, value_delimiter = ',', required = true)]
        users: Vec<String>,
        /// Comma-separated group ids.
        #[arg(long, value_delimiter = ',', required = true)]
        groups: Vec<String>,
        /// Budget per user; defaults to `total_votes` from the config.
        #[arg(long)]
        votes: Option<u32>,
    },
    /// Cast one vote.
    Cast {
        #[arg(long)]
        meeting: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        group: String,
    },
    /// Seed a fresh meeting and hammer it with concurrent voters.
    Simulate {
        #[arg(long, default_value = "sim")]
        meeting: String,
        #[arg(long, default_value_t = 32)]
        voters: usize,
        #[arg(long, default_value_t = 4)]
        groups: usize,
        /// Attempts per voter; defaults to one more than the budget.
        #[arg(long)]
        attempts: Option<u32>,
    },
    /// Compare every group record of the two stores.
    Reconcile,
}

fn load_config(cli: &Cli) -> anyhow::Result<VotingConfig> {
    let mut config = match &cli.config {
        Some(path) => VotingConfig::from_toml_file(path)?,
        None => VotingConfig::default(),
    };
    if let Some(path) = &cli.lmdb_path {
        config.lmdb_path = path.clone();
    }
    if let Some(path) = &cli.sqlite_path {
        config.sqlite_path = path.clone();
    }
    if let Some(cap) = cli.max_votes_per_group {
        config.max_votes_per_group = cap;
    }
    if let Some(policy) = cli.reentry_policy {
        config.reentry_policy = policy.into();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tally_utils::init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("loaded config from {}", path.display());
    }

    let app = app::App::open(&config)?;
    let outcome = run(&app, cli.command, &config).await;
    let alerts = app.close().await?;
    if alerts > 0 {
        tracing::warn!(alerts, "consistency alerts were raised");
    }
    outcome
}

async fn run(app: &app::App, command: Command, config: &VotingConfig) -> anyhow::Result<()> {
    match command {
        Command::Seed {
            meeting,
            users,
            groups,
            votes,
        } => {
            let votes = votes.unwrap_or(config.total_votes);
            app.seed(&meeting, &users, &groups, votes)?;
            println!(
                "seeded meeting {meeting}: {} users with {votes} votes, {} groups",
                users.len(),
                groups.len()
            );
        }
        Command::Cast {
            meeting,
            user,
            group,
        } => {
            let receipt = app.cast(&meeting, &user, &group)?;
            println!("{receipt:?}");
        }
        Command::Simulate {
            meeting,
            voters,
            groups,
            attempts,
        } => {
            let attempts = attempts.unwrap_or(config.total_votes + 1);
            let summary = app.simulate(&meeting, voters, groups, attempts).await?;
            println!("{summary}");
            print!("{}", app.metrics().encode()?);
        }
        Command::Reconcile => {
            let report = app.reconcile()?;
            println!(
                "checked {} groups: {} drifted",
                report.groups_checked,
                report.drifts.len()
            );
            for drift in &report.drifts {
                println!("  {drift}");
            }
            if !report.is_consistent() {
                anyhow::bail!("stores are not consistent");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        std::fs::write(&path, "max_votes_per_group = 7\ntotal_votes = 9\n").unwrap();
        let cli = Cli::parse_from([
            "tally-daemon",
            "--config",
            path.to_str().unwrap(),
            "--max-votes-per-group",
            "2",
            "--reentry-policy",
            "noop-success",
            "--log-format",
            "json",
            "reconcile",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.max_votes_per_group, 2);
        assert_eq!(config.total_votes, 9);
        assert_eq!(config.reentry_policy, ReentryPolicy::NoopSuccess);
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
