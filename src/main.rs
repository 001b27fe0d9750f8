//! # pdf-query CLI (`pdfq`)
//!
//! The `pdfq` binary serves the web UI and exposes the same pipeline from the
//! command line.
//!
//! ## Usage
//!
//! ```bash
//! pdfq --config ./config/pdfq.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfq serve` | Start the web UI at `[server].bind` |
//! | `pdfq check` | Check Pinecone connectivity and whether the index exists |
//! | `pdfq ingest <file.pdf>...` | Extract, chunk, embed and upsert PDFs |
//! | `pdfq ask "<question>"` | Answer a question from the index |
//!
//! Credentials come from flags or the environment and are never written to
//! disk:
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! export PINECONE_API_KEY=...
//! export PINECONE_ENVIRONMENT=gcp-starter
//! pdfq --index docs ingest report.pdf
//! pdfq --index docs ask "What was revenue in Q3?"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use pdf_query::config::{self, Config};
use pdf_query::models::UploadedDocument;
use pdf_query::pipeline::{self, Level, Notice};
use pdf_query::server;
use pdf_query::services::{HostedServices, ServiceFactory};
use pdf_query::session::{check_session, ProviderKind, SessionConfig};

/// pdf-query: chat with your PDFs using hosted embeddings, Pinecone and an
/// LLM.
#[derive(Parser)]
#[command(
    name = "pdfq",
    about = "Ask questions about PDF documents using retrieval-augmented generation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./config/pdfq.toml")]
    config: PathBuf,

    /// Provider variant: openai or gemini. Defaults to `[providers].default`.
    #[arg(long, global = true, env = "PDFQ_PROVIDER")]
    provider: Option<String>,

    /// Provider API key. Falls back to OPENAI_API_KEY or GOOGLE_API_KEY
    /// depending on the provider.
    #[arg(long, global = true, env = "PDFQ_PROVIDER_KEY", hide_env_values = true)]
    provider_key: Option<String>,

    #[arg(long, global = true, env = "PINECONE_API_KEY", hide_env_values = true)]
    pinecone_key: Option<String>,

    #[arg(long, global = true, env = "PINECONE_ENVIRONMENT")]
    pinecone_env: Option<String>,

    /// Pinecone index name.
    #[arg(long, global = true, env = "PINECONE_INDEX")]
    index: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web UI.
    Serve,

    /// Check Pinecone connectivity and report whether the index exists.
    Check,

    /// Extract, chunk, embed and upsert one or more PDF files.
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Answer a question from the index and print the supporting chunks.
    Ask { question: String },
}

impl Cli {
    fn session(&self, config: &Config) -> anyhow::Result<SessionConfig> {
        let provider = match &self.provider {
            Some(p) => p.parse::<ProviderKind>().map_err(anyhow::Error::msg)?,
            None => config.providers.default_kind(),
        };
        let provider_key = self
            .provider_key
            .clone()
            .or_else(|| std::env::var(provider.key_env_var()).ok())
            .unwrap_or_default();
        Ok(SessionConfig::new(
            provider,
            &provider_key,
            self.pinecone_key.as_deref().unwrap_or_default(),
            self.pinecone_env.as_deref().unwrap_or_default(),
            self.index.as_deref().unwrap_or_default(),
        ))
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_notices(notices: &[Notice]) {
    for n in notices {
        match n.level {
            Level::Success | Level::Info => println!("{}", n.text),
            Level::Warning => eprintln!("warning: {}", n.text),
            Level::Error => eprintln!("error: {}", n.text),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let services = HostedServices::new(Arc::new(cfg.clone()));

    match &cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Check => {
            let session = cli.session(&cfg)?;
            let store = services.store(&session)?;
            let status = check_session(&session, store.as_ref()).await?;
            println!("{}", status.message());
        }
        Commands::Ingest { files } => {
            let session = cli.session(&cfg)?;
            let mut documents = Vec::with_capacity(files.len());
            for path in files {
                let bytes = std::fs::read(path)
                    .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                documents.push(UploadedDocument::new(name, bytes));
            }
            let outcome = pipeline::process_uploads(&session, documents, &services, &cfg).await;
            print_notices(&outcome.notices);
            if !outcome.succeeded() {
                anyhow::bail!("ingestion did not complete");
            }
        }
        Commands::Ask { question } => {
            let session = cli.session(&cfg)?;
            let outcome = pipeline::ask(&session, question, &services, &cfg).await;
            print_notices(&outcome.notices);
            match outcome.answer {
                Some(answer) => {
                    println!("{}\n", answer.text.trim());
                    for m in &answer.matches {
                        let page = m.page.map(|p| format!(", page {}", p)).unwrap_or_default();
                        println!(
                            "--- Chunk {} (from: {}{}, score {:.3}) ---",
                            m.rank,
                            m.source_name(),
                            page,
                            m.score
                        );
                        println!("{}\n", m.text);
                    }
                }
                None => anyhow::bail!("no answer"),
            }
        }
    }

    Ok(())
}
