use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

use provider_failover::config::{default_config, load_config, CredentialSource, EnvCredentials, ProxyConfig};
use provider_failover::observability::logging;
use provider_failover::orchestrator::{ClientCommand, PatternDetector, ProcessLauncher, RetryOrchestrator};

#[derive(Parser)]
#[command(name = "failover-cli")]
#[command(about = "Run an inference client with rate-limit retries, or inspect the failover proxy", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the proxy's request counters
    Stats {
        /// Proxy base URL; defaults to the configured bind address
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Run a client command, re-running it while it reports rate limiting
    Run {
        /// File fed to the client on stdin
        #[arg(short, long)]
        prompt_file: Option<PathBuf>,

        /// Append the client's combined output to this file
        #[arg(short, long)]
        output_file: Option<PathBuf>,

        /// Override orchestrator.max_attempts
        #[arg(short, long)]
        max_attempts: Option<u32>,

        /// Client program and arguments, after `--`
        #[arg(last = true, required = true)]
        client: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };
    logging::init_logging(&config.observability.log_level);

    match cli.command {
        Commands::Stats { url } => {
            let url = url.unwrap_or_else(|| format!("http://{}", config.listener.bind_address));
            let res = reqwest::Client::new()
                .get(format!("{}{}", url.trim_end_matches('/'), config.listener.health_path))
                .send()
                .await?;
            print_response(res).await
        }
        Commands::Run {
            prompt_file,
            output_file,
            max_attempts,
            client,
        } => run_client(&config, prompt_file, output_file, max_attempts, client).await,
    }
}

async fn run_client(
    config: &ProxyConfig,
    prompt_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    max_attempts: Option<u32>,
    client: Vec<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let Some((program, args)) = client.split_first() else {
        return Err("no client command given".into());
    };
    let command = ClientCommand {
        program: program.clone(),
        args: args.to_vec(),
        prompt_file,
        output_file,
    };

    let launcher = ProcessLauncher::new(
        command,
        PatternDetector::from_config(&config.orchestrator),
        &config.orchestrator,
        &config.credentials,
    );
    let credentials = EnvCredentials::new(&config.credentials).load();
    let max_attempts = max_attempts.unwrap_or(config.orchestrator.max_attempts);
    let orchestrator = RetryOrchestrator::new(launcher, max_attempts, &credentials)?;

    match orchestrator.run().await {
        Ok(report) => {
            tracing::info!(spawns = report.spawns(), "Client succeeded");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, "Client run failed");
            eprintln!("Error: {}", e);
            Ok(ExitCode::from(e.exit_code().clamp(1, 255) as u8))
        }
    }
}

async fn print_response(res: reqwest::Response) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(ExitCode::FAILURE);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(ExitCode::SUCCESS)
}
