use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the WaSpeed webhook gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health
    Status,
    /// List stored webhook events
    Webhooks {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 50)]
        limit: u64,
        /// Filter by event type
        #[arg(long)]
        event_id: Option<String>,
    },
    /// Show one stored event
    Show { id: String },
    /// Event statistics by type and day
    Stats {
        /// Start day, YYYY-MM-DD
        #[arg(long)]
        data_inicio: Option<String>,
        /// End day (inclusive), YYYY-MM-DD
        #[arg(long)]
        data_fim: Option<String>,
    },
    /// Delete one stored event
    Delete { id: String },
    /// Delete every event in a window
    Purge {
        #[arg(long)]
        data_inicio: Option<String>,
        #[arg(long)]
        data_fim: Option<String>,
        #[arg(long)]
        event_id: Option<String>,
    },
    /// Show the aggregate for one contact number
    Contact { number: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Webhooks {
            page,
            limit,
            event_id,
        } => {
            let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
            if let Some(event_id) = event_id {
                query.push(("eventID", event_id));
            }
            let res = client
                .get(format!("{}/api/webhooks", cli.url))
                .query(&query)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Show { id } => {
            let res = client
                .get(format!("{}/api/webhooks/{}", cli.url, id))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Stats {
            data_inicio,
            data_fim,
        } => {
            let query = window_query(data_inicio, data_fim, None);
            let res = client
                .get(format!("{}/api/estatisticas", cli.url))
                .query(&query)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Delete { id } => {
            let res = client
                .delete(format!("{}/api/webhooks/{}", cli.url, id))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Purge {
            data_inicio,
            data_fim,
            event_id,
        } => {
            let query = window_query(data_inicio, data_fim, event_id);
            let res = client
                .delete(format!("{}/api/webhooks", cli.url))
                .query(&query)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Contact { number } => {
            let res = client
                .get(format!("{}/api/contatos/{}", cli.url, number))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn window_query(
    data_inicio: Option<String>,
    data_fim: Option<String>,
    event_id: Option<String>,
) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(inicio) = data_inicio {
        query.push(("dataInicio", inicio));
    }
    if let Some(fim) = data_fim {
        query.push(("dataFim", fim));
    }
    if let Some(event_id) = event_id {
        query.push(("eventID", event_id));
    }
    query
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
