use crate::{
    app::{build_recommendation_service, Application},
    config::Config,
    error::Result,
    ml::OpenAiEmbedder,
    models::{RecommendationResult, RetrievalHit},
    scripts::run_ingestion,
    services::{ChromaCollection, RecommendationOptions, Retriever, SummaryIndex},
};
use clap::{Parser, Subcommand};
use console::style;
use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

#[derive(Parser)]
#[command(name = "smart-librarian")]
#[command(about = "Retrieval-augmented book recommendations over a Chroma collection")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Embed the book summaries and upsert them into the collection
    Ingest {
        /// Run a test query after ingesting
        #[arg(long)]
        probe: Option<String>,
        /// Number of probe results to show
        #[arg(long = "top-k", visible_alias = "top_k", default_value_t = 5)]
        top_k: usize,
    },
    /// Ask for recommendations interactively
    Chat {
        /// Candidates handed to the model (defaults to the configured top_k)
        #[arg(long = "top-k")]
        top_k: Option<usize>,
        /// Print the retrieved candidates before each answer
        #[arg(long)]
        show_retrieval: bool,
    },
    /// Show the nearest books for a query
    Retrieve {
        query: String,
        #[arg(long = "top-k", default_value_t = 5)]
        top_k: usize,
    },
    /// Print the detailed summary for a title
    Summary { title: String },
    /// Serve the HTTP API
    Serve,
}

/// Words that end the interactive loop.
pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

fn print_hits(hits: &[RetrievalHit]) {
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{} {}",
            style(format!("{}.", i + 1)).bold(),
            style(&hit.title).bold()
        );
        println!(
            "   {}",
            style(format!(
                "distance: {:.3}, similarity: {:.3}",
                hit.distance, hit.similarity
            ))
            .dim()
        );
    }
}

fn print_result(result: &RecommendationResult, show_retrieval: bool) {
    if show_retrieval && !result.hits.is_empty() {
        println!("{}", style("Candidați (retrieval)").cyan());
        print_hits(&result.hits);
        println!();
    }
    println!("{}", result.render());
}

async fn run_chat(config: &Config, top_k: Option<usize>, show_retrieval: bool) -> Result<()> {
    let service = build_recommendation_service(config).await?;
    let mut options = RecommendationOptions::from_config(config);
    if let Some(top_k) = top_k {
        options.top_k = top_k;
    }

    println!("Type your question (or 'exit'):");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", style(">").green());
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        if is_exit_command(&line) {
            break;
        }

        let result = service.recommend(&line, &options).await?;
        print_result(&result, show_retrieval);
    }
    Ok(())
}

async fn run_retrieve(config: &Config, query: &str, top_k: usize) -> Result<()> {
    let embedder = Arc::new(OpenAiEmbedder::from_config(config)?);
    let store = Arc::new(ChromaCollection::from_config(config).await?);
    let hits = Retriever::new(embedder, store).retrieve(query, top_k).await?;

    println!("Query: {}", query);
    print_hits(&hits);
    Ok(())
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Ingest { probe, top_k } => run_ingestion(&config, probe.as_deref(), top_k).await,
        Commands::Chat {
            top_k,
            show_retrieval,
        } => run_chat(&config, top_k, show_retrieval).await,
        Commands::Retrieve { query, top_k } => run_retrieve(&config, &query, top_k).await,
        Commands::Summary { title } => {
            let summaries = SummaryIndex::load(&config.data_path)?;
            println!("{}", summaries.get_summary_by_title(&title));
            Ok(())
        }
        Commands::Serve => Application::new(&config).run().await,
    }
}
