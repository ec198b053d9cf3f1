//! Colloquy CLI - drive evaluations and serve the evaluation front-end

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use colloquy_core::a2a::{A2aClient, ClientConfig};
use colloquy_core::config::ServiceConfig;
use colloquy_core::harness::{known_domains, StubBackend};
use colloquy_core::llm::OpenAiCompatProvider;
use colloquy_core::service::EvaluationService;

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(about = "Conversational-agent evaluation harness over A2A", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and print a remote agent's card
    Discover {
        /// Agent endpoint URL
        endpoint: String,

        /// Bearer token for authenticated endpoints
        #[arg(long)]
        auth_token: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
    /// List the evaluation domains
    Domains,
    /// Run the evaluation service front-end
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,

        /// URL callers reach the service at (advertised on the agent card)
        #[arg(long)]
        public_url: Option<String>,

        /// Controller LLM model identifier
        #[arg(long, default_value = "gpt-4o")]
        model: String,

        /// Session-service connection string: `memory`, or `file:<dir>`
        /// for a store that survives restarts
        #[arg(long, default_value = "memory")]
        session_backend: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Discover {
            endpoint,
            auth_token,
            timeout,
        } => {
            let mut config = ClientConfig::new(endpoint)?.with_timeout_secs(timeout)?;
            if let Some(token) = auth_token {
                config = config.with_auth_token(token);
            }

            let client = A2aClient::new(config);
            let card = client
                .discover()
                .await
                .context("agent discovery failed")?;
            println!("{}", serde_json::to_string_pretty(&card)?);
        }
        Commands::Domains => {
            for domain in known_domains() {
                println!(
                    "{:<10} {:>3} tasks  {}",
                    domain.name, domain.task_count, domain.description
                );
            }
        }
        Commands::Serve {
            bind,
            public_url,
            model,
            session_backend,
        } => {
            let public_url = public_url.unwrap_or_else(|| format!("http://{bind}"));
            let config = ServiceConfig::new()
                .with_bind_addr(bind)
                .with_public_url(public_url)
                .with_model(model.as_str())
                .with_session_backend(session_backend);

            let provider = Arc::new(
                OpenAiCompatProvider::from_env(Some(model))
                    .context("controller LLM is not configured")?,
            );

            // Until an orchestrator is linked in, only mock-domain runs are
            // served; see StubBackend.
            let service = Arc::new(
                EvaluationService::new(config, provider, Arc::new(StubBackend))
                    .context("failed to assemble the evaluation service")?,
            );
            service.serve().await?;
        }
    }

    Ok(())
}
