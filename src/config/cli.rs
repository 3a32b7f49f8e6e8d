use clap::{Args, Parser, Subcommand};

use crate::domain::model::{FillType, LedgerReason};

#[derive(Debug, Clone, Parser)]
#[command(name = "guild-fill")]
#[command(about = "Fill-provider priority and assignment engine for transport activities")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "guild-fill.toml")]
    pub config: String,

    /// Override the data directory from the config
    #[arg(long)]
    pub data_dir: Option<String>,

    /// User id the command runs as
    #[arg(long, default_value_t = 0)]
    pub caller: u64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON logs
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Import activities and signups from a JSON seed file
    Import {
        #[arg(long)]
        file: String,
    },
    /// Provider commands
    #[command(subcommand)]
    Provider(ProviderCommand),
    /// Add a ledger entry for a provider
    Points(PointsArgs),
    /// Transport pair commands
    #[command(subcommand)]
    Pair(PairCommand),
    /// Fill assignment commands
    #[command(subcommand)]
    Assign(AssignCommand),
    /// Delete an activity and everything scoped to it
    RemoveActivity {
        #[arg(long)]
        activity: u64,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub slots: bool,
    #[arg(long)]
    pub weight: bool,
    #[arg(long)]
    pub slots_origin: Option<String>,
    #[arg(long)]
    pub slots_target: Option<String>,
    #[arg(long)]
    pub weight_origin: Option<String>,
    #[arg(long)]
    pub weight_target: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProviderCommand {
    /// List active providers by priority
    List,
    /// Register the caller as a provider
    Register(ProfileArgs),
    /// Update the caller's provider profile
    Update {
        #[arg(long)]
        provider: u64,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    Deactivate {
        #[arg(long)]
        provider: u64,
    },
    Reactivate {
        #[arg(long)]
        provider: u64,
    },
    /// Show ledger entries and priority
    Ledger {
        #[arg(long)]
        provider: u64,
    },
}

#[derive(Debug, Clone, Args)]
pub struct PointsArgs {
    #[arg(long)]
    pub provider: u64,
    #[arg(long, allow_hyphen_values = true)]
    pub points: i64,
    #[arg(long, default_value = "manual_adjustment")]
    pub reason: LedgerReason,
    #[arg(long)]
    pub activity: Option<u64>,
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum PairCommand {
    Create {
        #[arg(long)]
        activity: u64,
        #[arg(long)]
        fighter: u64,
        #[arg(long)]
        transporter: u64,
    },
    Update {
        #[arg(long)]
        pair: u64,
        #[arg(long)]
        fighter: u64,
        #[arg(long)]
        transporter: u64,
    },
    Delete {
        #[arg(long)]
        pair: u64,
    },
    /// Pair signups whose preferred-partner hints reference each other
    Match {
        #[arg(long)]
        activity: u64,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum AssignCommand {
    List {
        #[arg(long)]
        activity: u64,
    },
    /// Assign providers to every pair by priority
    Auto {
        #[arg(long)]
        activity: u64,
    },
    Create {
        #[arg(long)]
        activity: u64,
        #[arg(long)]
        pair: u64,
        #[arg(long)]
        provider: u64,
        #[arg(long)]
        fill_type: FillType,
    },
    Delete {
        #[arg(long)]
        assignment: u64,
    },
}
