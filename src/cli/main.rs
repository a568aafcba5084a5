use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder};

#[derive(Parser)]
#[command(name = "medsearch-cli")]
#[command(about = "Medicine Search CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "MEDSEARCH_ENDPOINT", default_value = "http://localhost:3001")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,

    /// List available categories and manufacturers
    Filters,

    /// Suggest medicine names for a prefix
    Autocomplete {
        #[arg(value_name = "PREFIX")]
        prefix: String,
    },

    /// Search medicines
    Search {
        #[arg(short, long)]
        query: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        manufacturer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let endpoint = cli.endpoint.trim_end_matches('/');

    let request = match cli.command {
        Commands::Health => client.get(format!("{}/health", endpoint)),

        Commands::Filters => client.get(format!("{}/api/filters", endpoint)),

        Commands::Autocomplete { prefix } => client
            .get(format!("{}/api/autocomplete", endpoint))
            .query(&[("q", prefix)]),

        Commands::Search {
            query,
            category,
            manufacturer,
        } => {
            let params: Vec<(&str, String)> = [
                ("q", query),
                ("category", category),
                ("manufacturer", manufacturer),
            ]
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();

            client
                .get(format!("{}/api/search", endpoint))
                .query(&params)
        }
    };

    print_response(request).await
}

async fn print_response(request: RequestBuilder) -> anyhow::Result<()> {
    let response = request.send().await.context("Failed to reach server")?;
    let status = response.status();

    let body: serde_json::Value = response
        .json()
        .await
        .context("Server returned a non-JSON body")?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        anyhow::bail!("Request failed with status {}", status);
    }
    Ok(())
}
