use attrflow_core::EdgeDiscovery;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::error::Result;
use crate::scenario::Scenario;

/// Explicit flags override `ATTRFLOW_DEMO_*` environment variables, which
/// override the defaults.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "attrflow-demo",
    about = "Walk a seven-attribute program through lazy, memoized recomputation",
    version
)]
pub struct Cli {
    /// Value written to a1 during the walkthrough.
    #[arg(
        long,
        env = "ATTRFLOW_DEMO_A1",
        default_value_t = 9,
        allow_negative_numbers = true
    )]
    pub a1: i64,

    /// Value written to a6 during the walkthrough.
    #[arg(
        long,
        env = "ATTRFLOW_DEMO_A6",
        default_value_t = 4,
        allow_negative_numbers = true
    )]
    pub a6: i64,

    /// How dependents are discovered: 'eager' or 'lazy'.
    #[arg(long, env = "ATTRFLOW_DEMO_EDGES", default_value_t = EdgeDiscovery::Eager)]
    pub edges: EdgeDiscovery,

    /// Print the report as JSON.
    #[arg(long, env = "ATTRFLOW_DEMO_JSON")]
    pub json: bool,

    /// Log engine activity at debug level unless RUST_LOG says otherwise.
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    #[must_use]
    pub fn scenario(&self) -> Scenario {
        Scenario {
            a1: self.a1,
            a6: self.a6,
            edges: self.edges,
        }
    }
}

/// Install the stderr log subscriber. A second call is a no-op.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run(&cli)
}

pub fn run(cli: &Cli) -> Result<()> {
    let report = cli.scenario().run()?;
    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render());
    }
    report.check()
}
