use clap::{Parser, Subcommand};
use serde_json::Value;
use std::time::Duration;
use url::Url;

#[derive(Parser)]
#[command(name = "claim-cli")]
#[command(about = "Command-line client for the QR claim service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the claim page state for a code
    Status { code: String },
    /// Submit a claim for a code
    Claim {
        code: String,
        /// Poll until the claim is confirmed or failed
        #[arg(long)]
        wait: bool,
        /// Poll interval in milliseconds when waiting
        #[arg(long, default_value_t = 2000)]
        interval_ms: u64,
    },
    /// Discard the current attempt and start over
    Reset { code: String },
    /// Show the service wallet
    Wallet,
    /// Show the claim contract and its balances
    Contract,
    /// Ask the contract whether a code is still valid
    Check { code: String },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = Url::parse(&cli.url)?;

    match cli.command {
        Commands::Status { code } => {
            let res = client.get(endpoint(&base, &["claims", code.as_str()])?).send().await?;
            print_response(res).await?;
        }
        Commands::Claim {
            code,
            wait,
            interval_ms,
        } => {
            let res = client.post(endpoint(&base, &["claims", code.as_str()])?).send().await?;
            let accepted = res.status() == reqwest::StatusCode::ACCEPTED;
            print_response(res).await?;

            if wait && accepted {
                loop {
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                    let json: Value = client
                        .get(endpoint(&base, &["claims", code.as_str()])?)
                        .send()
                        .await?
                        .json()
                        .await?;
                    let status = json["view"]["attempt"]["status"].as_str().unwrap_or_default();
                    if status == "Confirmed" || status == "Failed" {
                        println!("{}", serde_json::to_string_pretty(&json)?);
                        break;
                    }
                    eprintln!("status: {status}");
                }
            }
        }
        Commands::Reset { code } => {
            let res = client
                .post(endpoint(&base, &["claims", code.as_str(), "reset"])?)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Wallet => {
            let res = client.get(endpoint(&base, &["wallet"])?).send().await?;
            print_response(res).await?;
        }
        Commands::Contract => {
            let res = client.get(endpoint(&base, &["contract"])?).send().await?;
            print_response(res).await?;
        }
        Commands::Check { code } => {
            let res = client
                .get(endpoint(&base, &["contract", "codes", code.as_str()])?)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(endpoint(&base, &["health"])?).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// `base` with `segments` appended, each percent-encoded as a single path segment.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, Box<dyn std::error::Error>> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| format!("'{base}' cannot be used as a base URL"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }
    if !status.is_success() {
        eprintln!("Error: service returned status {status}");
    }
    Ok(())
}
