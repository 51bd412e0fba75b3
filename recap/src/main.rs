use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recap::registry::{JobOptions, JobStatus, SummarizeRequest};
use recap::{ApiServer, AppConfig, JobRequest, Language, Services};

#[derive(Parser)]
#[command(name = "recap")]
#[command(about = "Cached summaries and chat over model backends", long_about = None)]
struct Cli {
    /// Config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start API server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Summarize text and wait for the result
    Summarize {
        /// Text to summarize
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,

        /// Read the text from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Resource identifier used as the cache key
        #[arg(short, long)]
        resource: Option<String>,

        /// Output language (en, zh)
        #[arg(short, long, default_value = "en")]
        lang: String,

        /// Ignore any cached result
        #[arg(long)]
        fresh: bool,
    },

    /// Inspect or clear the summary cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache statistics
    Stats,
    /// Delete every cached entry
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "recap=info,recap_store=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let services = Arc::new(Services::from_config(&config).await);
            println!("Starting API server on {}:{}", config.server.host, config.server.port);
            ApiServer::new(config.server.clone(), services).start().await?;
        }

        Commands::Summarize {
            text,
            file,
            resource,
            lang,
            fresh,
        } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {:?}", path))?,
                (None, None) => anyhow::bail!("Either --text or --file is required"),
            };
            let language: Language = lang.parse().map_err(anyhow::Error::msg)?;

            let services = Services::from_config(&config).await;
            let request = JobRequest::Summarize(SummarizeRequest {
                text,
                options: JobOptions {
                    resource_key: resource,
                    language,
                    force_fresh: fresh,
                    ..Default::default()
                },
            });
            request.validate().map_err(anyhow::Error::msg)?;

            let job_id = services.registry.submit(request).await.id;
            println!("Submitted {}", job_id);

            let poll_interval = config.registry.poll_interval();
            loop {
                let job = services.registry.get_status(&job_id).await?;
                match job.status {
                    JobStatus::Completed => {
                        if let Some(result) = job.result {
                            if let Some(cached_at) = result.cached_at {
                                println!(
                                    "(cached {} by {})",
                                    cached_at.format("%Y-%m-%d %H:%M"),
                                    result.model
                                );
                            }
                            println!("{}", result.payload);
                        }
                        break;
                    }
                    JobStatus::Error => {
                        anyhow::bail!(job.error.unwrap_or_else(|| "Job failed".to_string()));
                    }
                    JobStatus::Pending | JobStatus::Processing => {
                        tokio::time::sleep(poll_interval).await;
                    }
                }
            }
        }

        Commands::Cache { action } => {
            let services = Services::from_config(&config).await;

            match action {
                CacheAction::Stats => {
                    let stats = services.cache.stats().await;
                    println!("Cache Statistics:");
                    println!("{}", "=".repeat(50));
                    println!("Entries:     {}", stats.count);
                    println!("Total size:  {} bytes", stats.total_bytes);
                    println!("Avg size:    {} bytes", stats.avg_entry_size());
                    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                        println!("Oldest:      {}", oldest.format("%Y-%m-%d %H:%M"));
                        println!("Newest:      {}", newest.format("%Y-%m-%d %H:%M"));
                    }
                    for entry in &stats.entries {
                        println!(
                            "  {}  {} bytes  {}  {}",
                            entry.created_at.format("%Y-%m-%d %H:%M"),
                            entry.size_bytes,
                            entry.produced_by,
                            entry.key
                        );
                    }
                }
                CacheAction::Clear => {
                    services.cache.clear().await;
                    println!("Cache cleared");
                }
            }
        }
    }

    Ok(())
}
