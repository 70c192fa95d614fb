use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "bank-cli")]
#[command(about = "Operator CLI for the OnlineBank service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness ping
    Ping,
    /// Overall status (UP / DEGRADED / DOWN)
    Health,
    /// Full health report
    Detailed,
    /// Database connectivity and pool state
    Database,
    /// API call statistics
    Metrics,
    /// Readiness probe result
    Ready,
    /// Liveness probe result
    Live,
    /// List clients
    Clients {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
        /// Free-text search over names, account and phone
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show one client
    Client { id: i64 },
    /// Client counts per currency
    Currencies,
    /// Client counts per nationality
    Nationalities,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Ping => print_text(client.get(format!("{base}/health/ping")).send().await?).await?,
        Commands::Health => print_response(client.get(format!("{base}/health")).send().await?).await?,
        Commands::Detailed => {
            print_response(client.get(format!("{base}/health/detailed")).send().await?).await?
        }
        Commands::Database => {
            print_response(client.get(format!("{base}/health/database")).send().await?).await?
        }
        Commands::Metrics => {
            print_response(client.get(format!("{base}/health/metrics")).send().await?).await?
        }
        Commands::Ready => print_status(client.get(format!("{base}/health/ready")).send().await?),
        Commands::Live => print_status(client.get(format!("{base}/health/live")).send().await?),
        Commands::Clients { page, size, query } => {
            let mut params = vec![("page", page.to_string()), ("size", size.to_string())];
            let path = match query {
                Some(q) => {
                    params.push(("query", q));
                    "search"
                }
                None => "",
            };
            let res = client
                .get(format!("{base}/api/clients/{path}").trim_end_matches('/').to_string())
                .query(&params)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Client { id } => {
            print_response(client.get(format!("{base}/api/clients/{id}")).send().await?).await?
        }
        Commands::Currencies => {
            let res = client
                .get(format!("{base}/api/clients/statistics/currency"))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Nationalities => {
            let res = client
                .get(format!("{base}/api/clients/statistics/nationality"))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn print_status(res: reqwest::Response) {
    let status = res.status();
    if status.is_success() {
        println!("OK ({status})");
    } else {
        eprintln!("NOT OK ({status})");
    }
}

async fn print_text(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", res.text().await?);
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{body}");
    } else {
        eprintln!("Error: service returned status {status}");
        eprintln!("{body}");
    }
    Ok(())
}
