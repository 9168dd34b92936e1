use crate::demo::{run_demo, DemoArgs};
use crate::ledger::{run_settlement_compute, run_stats, SettlementComputeArgs, StatsArgs};
use crate::server;
use arkflow::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "ArkFlow Fleet Ledger",
    about = "Run the ArkFlow fleet back office and its settlement tooling from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Work with weekly driver settlements
    Settlement {
        #[command(subcommand)]
        command: SettlementCommand,
    },
    /// Print dashboard totals for a stored ledger
    Stats(StatsArgs),
    /// Run an end-to-end demo: onboarding, assignment, settlement and dashboard
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum SettlementCommand {
    /// Compute a settlement from its components without storing it
    Compute(SettlementComputeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Settlement {
            command: SettlementCommand::Compute(args),
        } => run_settlement_compute(args),
        Command::Stats(args) => run_stats(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
