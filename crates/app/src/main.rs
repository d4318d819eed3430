use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_chat_core::{
    Answer, AnswerConfig, AutoExtractor, ChunkingConfig, DocumentStore, FailureKind,
    IngestionPipeline, IngestionReport, OpenAiEmbedder, OpenAiGenerator, QueryError, RagAnswerer,
    TextEmbedder, TextGenerator,
};
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "PDF_CHAT_API_BASE", default_value = "https://api.openai.com/v1")]
    api_base: String,

    /// API key for the embedding and generation provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Embedding model
    #[arg(long, default_value = pdf_chat_core::DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Embedding vector dimension reported by the model
    #[arg(long, default_value_t = pdf_chat_core::DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Generation model
    #[arg(long, default_value = pdf_chat_core::DEFAULT_GENERATION_MODEL)]
    generation_model: String,

    /// Chunk window size, in characters
    #[arg(long, default_value_t = pdf_chat_core::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Overlap between consecutive chunks, in characters
    #[arg(long, default_value_t = pdf_chat_core::DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(long, default_value_t = pdf_chat_core::DEFAULT_TOP_K)]
    top_k: usize,

    /// Token budget for generated answers
    #[arg(long, default_value_t = pdf_chat_core::DEFAULT_MAX_ANSWER_TOKENS)]
    max_answer_tokens: u32,

    /// Concurrent embedding requests during ingestion
    #[arg(long, default_value_t = pdf_chat_core::DEFAULT_EMBED_CONCURRENCY)]
    embed_concurrency: usize,

    /// Timeout for each remote call, in seconds
    #[arg(long, default_value = "60")]
    request_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a document and answer a single question.
    Ask {
        /// Document to ingest (PDF, or plain text paginated on form-feed).
        #[arg(long)]
        file: String,
        /// Question to answer from the document.
        #[arg(long)]
        question: String,
    },
    /// Ingest a document and answer questions interactively.
    Chat {
        /// Document to ingest (PDF, or plain text paginated on form-feed).
        #[arg(long)]
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.request_timeout_secs);

    let embedder: Arc<dyn TextEmbedder> = Arc::new(
        OpenAiEmbedder::new(&cli.api_base, cli.api_key.clone(), timeout)?
            .with_model(&cli.embedding_model)
            .with_dimensions(cli.embedding_dimensions),
    );
    let generator: Arc<dyn TextGenerator> = Arc::new(
        OpenAiGenerator::new(&cli.api_base, cli.api_key.clone(), timeout)?
            .with_model(&cli.generation_model),
    );

    let store = Arc::new(DocumentStore::new());
    let chunking = ChunkingConfig::new(cli.chunk_size, cli.chunk_overlap)?;
    let pipeline = IngestionPipeline::new(
        Arc::new(AutoExtractor::default()),
        Arc::clone(&embedder),
        Arc::clone(&store),
        chunking,
    )
    .with_concurrency(cli.embed_concurrency);
    let answerer = RagAnswerer::new(
        Arc::clone(&store),
        embedder,
        generator,
        AnswerConfig {
            top_k: cli.top_k,
            max_output_tokens: cli.max_answer_tokens,
        },
    );

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-chat boot"
    );

    match cli.command {
        Command::Ask { file, question } => {
            let report = ingest_file(&pipeline, &file).await?;
            print_report(&report);

            match answerer.answer(&question).await {
                Ok(answer) => print_answer(&answer),
                Err(error) => anyhow::bail!(describe_query_error(&error)),
            }
        }
        Command::Chat { file } => {
            let report = ingest_file(&pipeline, &file).await?;
            print_report(&report);
            println!("Ask questions about the document. `:open <path>` loads another file, `:quit` exits.");

            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                print!("> ");
                std::io::stdout().flush()?;

                line.clear();
                if stdin.lock().read_line(&mut line)? == 0 {
                    break;
                }
                let input = line.trim();

                if input.is_empty() {
                    continue;
                }
                if input == ":quit" || input == ":q" {
                    break;
                }
                if let Some(path) = input.strip_prefix(":open ") {
                    match ingest_file(&pipeline, path.trim()).await {
                        Ok(report) => print_report(&report),
                        Err(error) => eprintln!("ingest failed: {error:#}"),
                    }
                    continue;
                }

                match answerer.answer(input).await {
                    Ok(answer) => print_answer(&answer),
                    Err(error) => eprintln!("{}", describe_query_error(&error)),
                }
            }
        }
    }

    Ok(())
}

async fn ingest_file(pipeline: &IngestionPipeline, path: &str) -> anyhow::Result<IngestionReport> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {path}"))?;
    let source_name = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
        .to_string();

    let report = pipeline.ingest_bytes(&bytes, &source_name).await?;
    Ok(report)
}

fn print_report(report: &IngestionReport) {
    println!(
        "ingested {}: {} page(s), {} chunk(s), {} indexed",
        report.document_id, report.page_count, report.chunk_count, report.indexed_count
    );

    if !report.failed_chunks.is_empty() {
        let indices = report
            .failed_chunks
            .iter()
            .map(|failed| failed.chunk_index.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("failed chunks: {indices}");
    }
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);
    let pages = answer
        .citation_pages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    println!("citations: page(s) {pages}");
}

/// Keeps quota exhaustion visibly distinct from transient and fatal
/// failures so a caller knows when wait-and-retry will help.
fn describe_query_error(error: &QueryError) -> String {
    match error {
        QueryError::Provider(failure) if failure.kind == FailureKind::QuotaExceeded => {
            format!("provider quota exhausted, wait and retry: {failure}")
        }
        QueryError::Provider(failure) if failure.kind == FailureKind::Transient => {
            format!("transient provider failure, retrying may help: {failure}")
        }
        other => other.to_string(),
    }
}
