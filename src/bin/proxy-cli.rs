use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Management CLI for the Rust Reverse Proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness probe (always 200 while the process is up)
    Healthz,
    /// Readiness probe (200 iff some route has an alive backend)
    Readyz,
    /// List every route's backends, liveness, inflight count, and circuit-breaker state
    Backends,
    /// Dump raw Prometheus metrics exposition
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Healthz => print_text(client.get(format!("{}/healthz", cli.url)).send().await?).await?,
        Commands::Readyz => print_json(client.get(format!("{}/readyz", cli.url)).send().await?).await?,
        Commands::Backends => print_json(client.get(format!("{}/backends", cli.url)).send().await?).await?,
        Commands::Metrics => print_text(client.get(format!("{}/metrics", cli.url)).send().await?).await?,
    }

    Ok(())
}

async fn print_json(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let body = res.text().await?;
    println!("{body}");
    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
