use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use loyalty_orchestrator::classifier::failure_report;
use loyalty_orchestrator::{telemetry, BaseConfig, EnrollmentOutcome, LedgerOrchestrator};

#[derive(Parser)]
#[command(name = "loyalty", version, about = "Loyalty points token orchestrator")]
struct Cli {
    #[command(flatten)]
    config: BaseConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll the admin registrar into the wallet and stop
    EnrollAdmin,
    /// Run the full workflow: enroll, initialize, mint, distribute, approve, settle
    Run,
    /// Read-only view of the ledger as one wallet identity
    Balances {
        #[arg(long, default_value = "admin")]
        identity: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    telemetry::init();

    let cli = Cli::parse();
    if let Err(err) = execute(cli).await {
        eprintln!("{}", failure_report(&err));
        std::process::exit(1);
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let mut config = cli.config;
    config.resolve_profile()?;
    info!(
        "Configuration: backend={:?}, wallet_path={}, channel={}, contract={}",
        config.backend, config.wallet_path, config.channel, config.contract
    );

    let mut orchestrator = LedgerOrchestrator::initialize(&config)?;

    match cli.command {
        Commands::EnrollAdmin => {
            match orchestrator.enrollment.enroll_admin().await? {
                EnrollmentOutcome::Enrolled(identity) => {
                    println!("Enrolled '{}' ({})", identity.name, identity.msp_id)
                }
                EnrollmentOutcome::AlreadyPresent(identity) => {
                    println!("'{}' already present in wallet", identity.name)
                }
                EnrollmentOutcome::RegisteredRemotely => {
                    println!("'{}' is registered but has no local credential", config.admin_id)
                }
            }
        }
        Commands::Run => {
            let report = orchestrator.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Balances { identity } => {
            let snapshot = orchestrator.inspect(&identity).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    info!("Loyalty orchestrator finished");
    Ok(())
}
