use clap::{Parser, Subcommand};
use railwatch::{
    cmd::{check, reset},
    config::AppConfig,
    supervisor::Supervisor,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding `app.yaml`.
    #[arg(long, global = true, default_value = "configs")]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the notification service until interrupted.
    Run,
    /// Clears the persisted known set outside the scheduled window.
    Reset,
    /// Fetches one snapshot and prints which trains are new, without
    /// notifying or persisting anything.
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    tracing::debug!(config_dir = %cli.config_dir, "Loading application configuration...");
    let config = AppConfig::new(Some(cli.config_dir.as_str()))?;

    match cli.command {
        Commands::Run => run_supervisor(config).await?,
        Commands::Reset => reset::execute(&config).await?,
        Commands::Check => check::execute(&config).await?,
    }

    Ok(())
}

async fn run_supervisor(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(
        snapshot_url = %config.snapshot.url,
        channels = config.channels.len(),
        "Configuration loaded."
    );

    let supervisor = Supervisor::builder().config(config).build().await?;
    supervisor.run().await?;
    Ok(())
}
