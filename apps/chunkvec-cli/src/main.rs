use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use chunkvec_core::config::{expand_path, Config, Settings};
use chunkvec_core::{Chunk, TextSplitter};
use chunkvec_embed::default_embedder;
use chunkvec_text::{CharacterSplitter, RecursiveSplitter, TextFileLoader};
use chunkvec_vector::{SearchOptions, VectorStore};

/// Split text files into retrieval chunks and query them by similarity.
#[derive(Parser, Debug)]
#[command(name = "chunkvec", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split documents and print one JSON chunk per line.
    Split {
        /// A .txt file or a directory of them; defaults to `data.raw_txt_dir`.
        path: Option<PathBuf>,
        #[command(flatten)]
        chunking: ChunkArgs,
    },
    /// Build an in-memory store from documents and rank chunks against a query.
    Query {
        query: String,
        /// A .txt file or a directory of them; defaults to `data.raw_txt_dir`.
        #[arg(long)]
        path: Option<PathBuf>,
        /// Number of hits to print.
        #[arg(short, long, default_value_t = 4)]
        k: usize,
        #[command(flatten)]
        chunking: ChunkArgs,
    },
}

#[derive(Args, Debug)]
struct ChunkArgs {
    #[arg(long, value_enum, default_value_t = SplitterKind::Recursive)]
    splitter: SplitterKind,
    /// Overrides `chunking.chunk_size`.
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Overrides `chunking.chunk_overlap`.
    #[arg(long)]
    chunk_overlap: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SplitterKind {
    Recursive,
    Character,
}

fn build_splitter(args: &ChunkArgs, settings: &Settings) -> anyhow::Result<Box<dyn TextSplitter>> {
    let chunking = settings.chunking.clone().with_overrides(args.chunk_size, args.chunk_overlap);
    let (size, overlap) = (chunking.chunk_size, chunking.chunk_overlap);
    Ok(match args.splitter {
        SplitterKind::Character => Box::new(CharacterSplitter::new(size, overlap)?),
        SplitterKind::Recursive => {
            let splitter = RecursiveSplitter::new(size, overlap)?;
            match chunking.separators {
                Some(separators) => Box::new(splitter.with_separators(separators)),
                None => Box::new(splitter),
            }
        }
    })
}

fn resolve_path(path: Option<PathBuf>, settings: &Settings) -> anyhow::Result<PathBuf> {
    path.or_else(|| settings.data.raw_txt_dir.as_deref().map(expand_path))
        .ok_or_else(|| anyhow!("no input path given and data.raw_txt_dir is not configured"))
}

fn load_chunks(path: &PathBuf, splitter: &dyn TextSplitter) -> anyhow::Result<Vec<Chunk>> {
    let documents = TextFileLoader::new(path)
        .load()
        .with_context(|| format!("loading {}", path.display()))?;
    info!(documents = documents.len(), path = %path.display(), "loaded documents");

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(ProgressStyle::with_template("{spinner} splitting [{bar:30}] {pos}/{len} {msg}")?);
    let mut chunks = Vec::new();
    for (i, doc) in documents.iter().enumerate() {
        if let Some(metadata) = &doc.metadata {
            pb.set_message(metadata.source.clone());
        }
        chunks.extend(splitter.split_document(i, doc));
        pb.inc(1);
    }
    pb.finish_and_clear();
    info!(chunks = chunks.len(), "split documents");
    Ok(chunks)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Config::load()?.settings()?;

    match cli.command {
        Command::Split { path, chunking } => {
            let path = resolve_path(path, &settings)?;
            let splitter = build_splitter(&chunking, &settings)?;
            for chunk in load_chunks(&path, splitter.as_ref())? {
                println!("{}", serde_json::to_string(&chunk)?);
            }
        }
        Command::Query { query, path, k, chunking } => {
            let path = resolve_path(path, &settings)?;
            let splitter = build_splitter(&chunking, &settings)?;
            let chunks = load_chunks(&path, splitter.as_ref())?;

            let store = VectorStore::new(default_embedder(&settings.embedding)?);
            store.build_from_chunks(&chunks).await?;
            info!(records = store.len(), "store ready");

            let options = SearchOptions::default().with_metadata();
            for hit in store.search_by_text_async(&query, k, &options).await? {
                let (source, index) = hit
                    .metadata
                    .as_ref()
                    .map_or(("?", 0), |m| (m.source.as_str(), m.chunk_index.unwrap_or(0)));
                println!("{:>7.4}  {}#{}  {}", hit.score, source, index, hit.key.replace('\n', " "));
            }
        }
    }
    Ok(())
}
