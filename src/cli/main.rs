use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use incident_report::{
    api::dto::{CreateIncidentRequest, UpdateIncidentRequest},
    client::{IncidentClient, ListRequest},
    models::{Category, Status},
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "incident-cli")]
#[command(about = "Incident report API client", version, long_about = None)]
struct Cli {
    #[arg(short, long, env = "INCIDENT_API_URL", default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List incidents
    List {
        #[arg(short, long)]
        category: Option<Category>,

        #[arg(short = 'S', long)]
        status: Option<Status>,

        /// Case-insensitive match on title or description
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// created_at, updated_at or title
        #[arg(long)]
        sort_by: Option<String>,

        /// asc or desc
        #[arg(long)]
        sort_order: Option<String>,

        #[arg(short, long)]
        page: Option<u32>,

        #[arg(short = 's', long)]
        page_size: Option<u32>,
    },

    /// Get incident details
    Get {
        #[arg(value_name = "INCIDENT_ID")]
        id: String,
    },

    /// Report a new incident
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        #[arg(short, long)]
        category: Category,

        #[arg(short = 'S', long)]
        status: Option<Status>,
    },

    /// Replace an incident's fields
    Update {
        #[arg(value_name = "INCIDENT_ID")]
        id: String,

        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        description: String,

        #[arg(short, long)]
        category: Category,

        #[arg(short = 'S', long)]
        status: Status,
    },

    /// Delete an incident
    Delete {
        #[arg(value_name = "INCIDENT_ID")]
        id: String,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = IncidentClient::new(cli.endpoint);

    match cli.command {
        Commands::List {
            category,
            status,
            search,
            sort_by,
            sort_order,
            page,
            page_size,
        } => {
            let page = client
                .list(&ListRequest {
                    category,
                    status,
                    search,
                    sort_by,
                    sort_order,
                    page,
                    page_size,
                })
                .await
                .context("Failed to list incidents")?;
            print_json(&page)?;
        }

        Commands::Get { id } => {
            let incident = client
                .get(&id)
                .await
                .with_context(|| format!("Failed to fetch incident {}", id))?;
            print_json(&incident)?;
        }

        Commands::Create {
            title,
            description,
            category,
            status,
        } => {
            let incident = client
                .create(&CreateIncidentRequest {
                    title,
                    description,
                    category,
                    status,
                })
                .await
                .context("Failed to create incident")?;
            print_json(&incident)?;
        }

        Commands::Update {
            id,
            title,
            description,
            category,
            status,
        } => {
            let incident = client
                .update(
                    &id,
                    &UpdateIncidentRequest {
                        title,
                        description,
                        category,
                        status,
                    },
                )
                .await
                .with_context(|| format!("Failed to update incident {}", id))?;
            print_json(&incident)?;
        }

        Commands::Delete { id } => {
            client
                .delete(&id)
                .await
                .with_context(|| format!("Failed to delete incident {}", id))?;
            println!("Deleted incident {}", id);
        }

        Commands::Health => {
            let health = client.health().await.context("Health check failed")?;
            print_json(&health)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
