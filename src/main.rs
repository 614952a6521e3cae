use clap::{Parser, Subcommand};
use cnssync::{check_for_update, sync, verify_data, CiOutput, SyncConfig};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "cnssync")]
#[command(about = "Sync the CNS11643 open-data reference tables", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a newer release is available and emit pipeline outputs
    Check {
        /// Report an update regardless of the recorded version
        #[arg(long)]
        force: bool,
    },
    /// Download, unpack and record the configured files
    Sync,
    /// Verify the directory and file layout of the synced data
    Verify {
        /// Skip metadata validation (for checking data synced elsewhere)
        #[arg(long)]
        skip_metadata: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("cnssync={}", log_level))
        .init();

    let mut config = SyncConfig::from_env();

    match args.command {
        Command::Check { force } => {
            config.force_download |= force;
            let target = std::env::var_os("GITHUB_OUTPUT").filter(|v| !v.is_empty());
            let output = CiOutput::new(target.map(Into::into));
            run_check(&config, &output).await
        }
        Command::Sync => match sync(&config).await {
            Ok(report) => {
                info!(
                    "Synced {} files, release version {}",
                    report.files.len(),
                    report.release_version
                );
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                error!("❌ Sync failed: {}", e);
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Verify { skip_metadata } => {
            let report = verify_data(&config, skip_metadata);
            Ok(if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn run_check(config: &SyncConfig, output: &CiOutput) -> anyhow::Result<ExitCode> {
    info!("🔍 Checking for CNS11643 data updates");

    let decision = match check_for_update(config).await {
        Ok(decision) => decision,
        Err(e) => {
            error!("❌ Could not fetch remote state: {}", e);
            output.set("has_update", "false")?;
            return Ok(ExitCode::FAILURE);
        }
    };

    output.set("has_update", &decision.has_update.to_string())?;
    output.set("new_version", &decision.remote_version)?;
    output.set("current_version", &decision.local_version)?;
    output.set("api_modified_date", &decision.remote_modified_date)?;
    Ok(ExitCode::SUCCESS)
}
