use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragline::{
    api,
    app::App,
    config::{self, Config},
    ingest::IngestReport,
    logging,
    retrieval::{AnswerApi, compare},
};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "ragline",
    about = "Index travel documents and answer questions grounded in them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load, chunk, embed and upload every supported file under PATH.
    Ingest { path: PathBuf },
    /// Answer a question from the top indexed chunks; interactive when no question is given.
    Ask { question: Vec<String> },
    /// Run a question through vector and semantic retrieval side by side.
    Compare { question: Vec<String> },
    /// Serve the ask endpoint over HTTP.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_tracing();
    if let Err(err) = run().await {
        tracing::error!(error = %format!("{err:#}"), "Command failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config().context("failed to load configuration")?;
    let app = App::from_config(&config).context("failed to initialize components")?;

    match cli.command {
        Command::Ingest { path } => {
            let report = app
                .pipeline
                .run(&path)
                .await
                .with_context(|| format!("ingestion of {} failed", path.display()))?;
            print_report(&report);
        }
        Command::Ask { question } => {
            let composer = app.composer.clone();
            for_each_question(question, move |question| {
                let composer = composer.clone();
                async move {
                    let record = composer.ask(&question).await?;
                    println!("\nAnswer: {}\n", record.answer);
                    Ok::<(), anyhow::Error>(())
                }
            })
            .await?;
        }
        Command::Compare { question } => {
            let retriever = app.retriever.clone();
            let results_dir = app.results_dir.clone();
            for_each_question(question, move |question| {
                let retriever = retriever.clone();
                let results_dir = results_dir.clone();
                async move {
                    let report = compare(&retriever, &question, &results_dir).await?;
                    println!("\nVector search:\n{}\n", report.vector.content);
                    println!("Semantic search:\n{}\n", report.semantic.content);
                    println!(
                        "Lengths: vector {} / semantic {}",
                        report.vector_length, report.semantic_length
                    );
                    Ok::<(), anyhow::Error>(())
                }
            })
            .await?;
        }
        Command::Serve { port } => serve(&config, app, port).await?,
    }
    Ok(())
}

/// Run `handler` once for the joined argument question, or for each line read from stdin when
/// no question was given. `quit` ends the loop; blank lines are skipped.
async fn for_each_question<F, Fut>(words: Vec<String>, handler: F) -> Result<()>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let question = words.join(" ");
    if !question.trim().is_empty() {
        return handler(question).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Question (or 'quit'): ");
        std::io::stdout().flush().context("failed to flush stdout")?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            return Ok(());
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") {
            return Ok(());
        }
        if line.is_empty() {
            continue;
        }
        if let Err(err) = handler(line.to_string()).await {
            eprintln!("error: {err:#}");
        }
    }
}

fn print_report(report: &IngestReport) {
    println!("Run {}", report.run_id);
    println!("  documents: {}", report.documents_count);
    println!("  chunks:    {}", report.chunks_count);
    println!(
        "  uploaded:  {}/{}",
        report.upload.succeeded, report.upload.attempted
    );
    if !report.upload.failed_ids.is_empty() {
        println!("  rejected:  {}", report.upload.failed_ids.join(", "));
    }
    for failure in &report.extraction_failures {
        println!("  skipped file {}: {}", failure.path.display(), failure.error);
    }
    for failure in &report.chunking_failures {
        println!(
            "  skipped document {} ({}): {}",
            failure.document_index,
            failure.source_path.display(),
            failure.error
        );
    }
    if let Some(path) = &report.stats_path {
        println!("  stats:     {}", path.display());
    }
}

async fn serve(config: &Config, app: App, port: Option<u16>) -> Result<()> {
    let router = api::create_router(app.composer);
    let (listener, port) = bind_listener(port.or(config.server_port))
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, router)
        .await
        .context("server terminated")?;
    Ok(())
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 7071..=7099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 7071-7099",
    ))
}
