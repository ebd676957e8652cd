use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use contracts_cli::output::{self, OutputFormat};
use contracts_cli::{exit_code, init_tracing};
use contracts_core::{Error, Settings};
use contracts_rag::{IngestMode, Retrieved, Services};

#[derive(Parser)]
#[command(name = "contracts", version, about = "Ask questions about contract PDFs")]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a PDF, chunk and embed it, and store it in a collection
    Ingest {
        /// PDF to ingest (defaults to PDF_PATH)
        pdf: Option<PathBuf>,
        #[arg(long)]
        collection: Option<String>,
        /// Drop the collection first instead of appending to it
        #[arg(long)]
        rebuild: bool,
        /// PDF text extractor (overrides PDF_LOADER)
        #[arg(long)]
        loader: Option<String>,
    },
    /// List collections with their sizes and sample sources
    List,
    /// Show details of one collection
    Info {
        #[arg(long)]
        collection: Option<String>,
    },
    /// Show the chunks most similar to a query
    Retrieve(QueryArgs),
    /// Answer a question from the retrieved chunks
    Rag(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>,
    #[arg(long)]
    collection: Option<String>,
    /// Number of chunks to retrieve (defaults to TOP_K)
    #[arg(short)]
    k: Option<usize>,
}

impl QueryArgs {
    fn text(&self) -> Result<String, Error> {
        let text = self.text.join(" ").trim().to_string();
        if text.is_empty() {
            return Err(Error::InvalidConfig("query must not be empty".to_string()));
        }
        Ok(text)
    }
}

fn collection_or_default(flag: Option<String>, settings: &Settings) -> Result<String, Error> {
    flag.or_else(|| settings.default_collection()).ok_or(Error::MissingSetting("COLLECTION_NAME"))
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let mut settings = Settings::load()?;
    let format = cli.format;

    match cli.command {
        Command::Ingest { pdf, collection, rebuild, loader } => {
            if let Some(loader) = loader {
                settings.pdf_loader = loader;
            }
            let pdf = match pdf {
                Some(path) => path,
                None => settings.require_pdf_path()?.to_path_buf(),
            };
            let collection = collection.unwrap_or_else(|| settings.collection_for(&pdf));
            let mode = if rebuild { IngestMode::Rebuild } else { IngestMode::Append };

            let services = Services::open(settings).await?;
            let ingestor = services.ingestor().await?.with_progress(format == OutputFormat::Text);
            let report = ingestor
                .ingest(&pdf, &collection, mode)
                .await
                .with_context(|| format!("failed to ingest {}", pdf.display()))?;
            match format {
                OutputFormat::Text => Ok(output::ingest_text(&report)),
                OutputFormat::Json => output::json(&report),
            }
        }
        Command::List => {
            let services = Services::open_existing(settings).await?;
            let collections = services.list_collections().await?;
            match format {
                OutputFormat::Text => Ok(output::collections_text(&services.settings().persist_dir, &collections)),
                OutputFormat::Json => output::json(&collections),
            }
        }
        Command::Info { collection } => {
            let collection = collection_or_default(collection, &settings)?;
            let services = Services::open_existing(settings).await?;
            let info = services.collection_info(&collection).await?;
            match format {
                OutputFormat::Text => Ok(output::info_text(&info)),
                OutputFormat::Json => output::json(&info),
            }
        }
        Command::Retrieve(args) => {
            let query = args.text()?;
            let collection = collection_or_default(args.collection.clone(), &settings)?;
            let services = Services::open_existing(settings).await?;
            let hits = services.retrieval().await?.retrieve(&collection, &query, args.k).await?;
            let rows = Retrieved::rows(&hits);
            match format {
                OutputFormat::Text => Ok(output::retrieved_text(&rows)),
                OutputFormat::Json => output::json(&rows),
            }
        }
        Command::Rag(args) => {
            let question = args.text()?;
            settings.require_groq_api_key()?;
            let collection = collection_or_default(args.collection.clone(), &settings)?;
            let services = Services::open_existing(settings).await?;
            let answer = services.rag().await?.answer(&collection, &question, args.k).await?;
            match format {
                OutputFormat::Text => Ok(output::answer_text(&answer)),
                OutputFormat::Json => output::json(&answer),
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("{e}");
    }
    match run(cli).await {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("❌ Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
