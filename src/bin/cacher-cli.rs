use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "cacher-cli")]
#[command(about = "Query a running api-cacher instance", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full service status
    Status,
    /// Upstream connection status only
    Connection,
    /// Cached payload
    Data,
    /// Backup copy with metadata
    Backup,
    /// Show or update the configuration
    Config {
        #[arg(long)]
        fetch_interval: Option<u64>,
        #[arg(long)]
        rate_limit: Option<bool>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Stream status events until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/status", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Connection => {
            let res = client.get(format!("{}/status/connection", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Data => {
            let res = client.get(format!("{}/data", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Backup => {
            let res = client.get(format!("{}/backup", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Config { fetch_interval, rate_limit, description } => {
            let mut update = serde_json::Map::new();
            if let Some(interval) = fetch_interval {
                update.insert("fetch_interval_seconds".into(), interval.into());
            }
            if let Some(enabled) = rate_limit {
                update.insert("rate_limit_enabled".into(), enabled.into());
            }
            if let Some(description) = description {
                update.insert("api_description".into(), description.into());
            }

            let res = if update.is_empty() {
                client.get(format!("{}/config", base)).send().await?
            } else {
                client.post(format!("{}/config", base)).json(&update).send().await?
            };
            print_response(res).await?;
        }
        Commands::Watch => {
            let res = client
                .get(format!("{}/events", base))
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .send()
                .await?;
            if !res.status().is_success() {
                eprintln!("Error: event stream returned status {}", res.status());
                return Ok(());
            }

            let mut stream = res.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                for line in String::from_utf8_lossy(&chunk).lines() {
                    if !line.is_empty() && !line.starts_with(':') {
                        println!("{}", line);
                    }
                }
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: api-cacher returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
