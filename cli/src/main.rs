//! Bizlens CLI
//!
//! Maintenance commands for the Bizlens review analytics backend.
//!
//! # Usage
//!
//! ```bash
//! bizlens --help
//! bizlens ping
//! bizlens drop-collections --target reseñas --target tips
//! bizlens buckets --from 2023-01-01 --to 2023-03-31 --interval week
//! ```

#![deny(unsafe_code)]

mod collections;

use anyhow::Context;
use clap::{Parser, Subcommand};
use collections::{plan_drops, DEFAULT_TARGETS, SKIPPED_DATABASE};
use mongodb::bson::{doc, Document};
use mongodb::Client;
use shared::config::DEFAULT_TIMEZONE;
use shared::time::{Calendar, Interval};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bizlens CLI - maintenance commands for the review analytics backend
#[derive(Parser)]
#[command(name = "bizlens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// MongoDB connection string
    #[arg(
        short,
        long,
        env = "BIZLENS_MONGO_URI",
        default_value = "mongodb://localhost:27017"
    )]
    mongo_uri: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that MongoDB is reachable
    Ping {
        /// Database to run the ping against
        #[arg(long, env = "BIZLENS_DB_NAME", default_value = "bizlens")]
        database: String,
    },

    /// Drop matching collections from every database except `local`
    DropCollections {
        /// Actually drop; without this flag only the plan is printed
        #[arg(long)]
        execute: bool,

        /// Collection names to match, compared after normalisation
        #[arg(long = "target")]
        targets: Vec<String>,
    },

    /// Print the label axis for a range
    Buckets {
        /// Range start
        #[arg(long)]
        from: Option<String>,

        /// Range end (default: now)
        #[arg(long)]
        to: Option<String>,

        /// Bucket size: day, week or month
        #[arg(long, default_value = "month")]
        interval: Interval,

        /// IANA time zone used for bucketing
        #[arg(long, env = "BIZLENS_TIMEZONE", default_value_t = DEFAULT_TIMEZONE.name().to_string())]
        timezone: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bizlens=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Ping { database }) => ping(&cli.mongo_uri, &database).await?,
        Some(Commands::DropCollections { execute, targets }) => {
            let targets = if targets.is_empty() {
                DEFAULT_TARGETS.iter().map(ToString::to_string).collect()
            } else {
                targets
            };
            drop_collections(&cli.mongo_uri, &targets, execute).await?;
        }
        Some(Commands::Buckets {
            from,
            to,
            interval,
            timezone,
        }) => {
            for label in bucket_labels(from.as_deref(), to.as_deref(), interval, &timezone)? {
                println!("{label}");
            }
        }
        None => {
            println!("Bizlens CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

async fn connect(uri: &str) -> anyhow::Result<Client> {
    Client::with_uri_str(uri)
        .await
        .with_context(|| format!("Failed to connect to {uri}"))
}

async fn ping(uri: &str, database: &str) -> anyhow::Result<()> {
    let client = connect(uri).await?;
    client
        .database(database)
        .run_command(doc! { "ping": 1 })
        .await
        .context("MongoDB did not answer ping")?;
    println!("MongoDB at {uri} is reachable");
    Ok(())
}

async fn drop_collections(uri: &str, targets: &[String], execute: bool) -> anyhow::Result<()> {
    let client = connect(uri).await?;
    let databases: Vec<String> = client
        .list_database_names()
        .await
        .context("Failed to list databases")?
        .into_iter()
        .filter(|name| name != SKIPPED_DATABASE)
        .collect();
    tracing::info!(?databases, "Databases found");

    for name in databases {
        let database = client.database(&name);
        let collections = match database.list_collection_names().await {
            Ok(collections) => collections,
            Err(e) => {
                tracing::error!(database = %name, error = %e, "Failed to list collections");
                continue;
            }
        };

        let plan = plan_drops(&collections, targets);
        if plan.is_empty() {
            continue;
        }
        tracing::info!(database = %name, candidates = ?plan, "Matched collections");

        if !execute {
            tracing::info!(database = %name, "Dry run, nothing dropped (pass --execute to drop)");
            continue;
        }

        for collection_name in plan {
            let collection = database.collection::<Document>(&collection_name);
            let result = async {
                let count = collection.count_documents(doc! {}).await?;
                tracing::info!(
                    database = %name,
                    collection = %collection_name,
                    count,
                    "Dropping collection"
                );
                collection.drop().await
            }
            .await;

            match result {
                Ok(()) => {
                    tracing::info!(database = %name, collection = %collection_name, "Dropped");
                }
                Err(e) => tracing::error!(
                    database = %name,
                    collection = %collection_name,
                    error = %e,
                    "Failed to drop collection"
                ),
            }
        }
    }

    if !execute {
        tracing::info!("Finished dry run");
    }
    Ok(())
}

fn bucket_labels(
    from: Option<&str>,
    to: Option<&str>,
    interval: Interval,
    timezone: &str,
) -> anyhow::Result<Vec<String>> {
    let calendar = Calendar::from_zone_name(timezone)?;
    let range = calendar.normalize_range(from, to)?;
    Ok(calendar.axis(&range, interval))
}
