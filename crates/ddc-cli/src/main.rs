use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ddc")]
#[command(about = "Drawdown-capped walk-forward strategy research", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (later files override earlier ones)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List catalog strategies with their base grid sizes
    Strategies,

    /// Full-period backtest of one strategy next to buy-and-hold
    Backtest {
        /// Daily OHLCV CSV
        #[arg(long)]
        data: String,

        /// Catalog strategy name (see `ddc strategies`)
        #[arg(long)]
        strategy: String,

        /// Parameter override, repeatable: --param regime_len=150
        #[arg(long = "param")]
        params: Vec<String>,

        /// Multiply the signal by this factor, in (0, 1]
        #[arg(long)]
        risk_scale: Option<f64>,

        /// Layered config paths in merge order (costs are read from here)
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Walk-forward optimize one strategy, then test consensus params on the holdout
    WalkForward {
        #[arg(long)]
        data: String,

        #[arg(long)]
        strategy: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Drawdown-capped selection across strategies and risk scales
    Select {
        #[arg(long)]
        data: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Drawdown cap in percent (20 => -20%); overrides constraints.dd_cap
        #[arg(long)]
        dd_cap: Option<f64>,

        /// Comma-separated risk scales; overrides risk_scales
        #[arg(long)]
        risk_scales: Option<String>,

        /// Output directory for selection_report.json (default: exports/select/<run_id>)
        #[arg(long)]
        out: Option<String>,

        /// Fail instead of warn on config keys nothing reads
        #[arg(long, default_value_t = false)]
        strict_config: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => commands::inspect::config_hash(&paths),

        Commands::Strategies => commands::inspect::list_strategies(),

        Commands::Backtest {
            data,
            strategy,
            params,
            risk_scale,
            config_paths,
        } => commands::backtest::run_backtest_cmd(
            &data,
            &strategy,
            &params,
            risk_scale,
            &config_paths,
        ),

        Commands::WalkForward {
            data,
            strategy,
            config_paths,
        } => commands::walk_forward::run_walk_forward_cmd(&data, &strategy, &config_paths),

        Commands::Select {
            data,
            config_paths,
            dd_cap,
            risk_scales,
            out,
            strict_config,
        } => commands::select::run_select_cmd(commands::select::SelectArgs {
            data,
            config_paths,
            dd_cap_pct: dd_cap,
            risk_scales,
            out,
            strict_config,
        }),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
