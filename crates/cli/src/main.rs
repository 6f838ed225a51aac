//! Hybrid retrieval CLI
//!
//! Command-line interface for the hybrid retrieval engine: ingest
//! documents, build graph/tree indexes, and query them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hyrag_core::{Chunk, RetrievalMode};
use hyrag_engine::{Ingestor, Retriever, TeiClient};
use hyrag_store::{init_memory, init_persistent, Repository};
use std::collections::HashMap;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Hybrid retrieval engine - vector, graph, and tree search over documents
#[derive(Parser)]
#[command(name = "hyrag")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database path (defaults to ~/.hyrag/data)
    #[arg(short, long)]
    db_path: Option<PathBuf>,

    /// Use in-memory database (for testing)
    #[arg(long)]
    memory: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a document: split into chunks, embed, and store
    Ingest {
        /// Document identifier
        doc_id: String,

        /// Path to a text file (reads from stdin if not provided)
        path: Option<PathBuf>,
    },

    /// Build retrieval indexes over an ingested document
    Build {
        /// Document identifier
        doc_id: String,

        /// Build only the co-occurrence graph
        #[arg(long)]
        graph: bool,

        /// Build only the hierarchical tree
        #[arg(long)]
        tree: bool,
    },

    /// Query a document
    Query {
        /// Document identifier
        doc_id: String,

        /// Query text
        query: String,

        /// Retrieval mode: vector, graph, raptor, or hybrid
        /// (picked from the query wording if not given)
        #[arg(short, long)]
        mode: Option<String>,

        /// Maximum results
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },

    /// List ingested documents
    Docs,

    /// Show database statistics
    Stats,

    /// Show the embedding dimension from the active embeddings provider
    EmbeddingDim {
        /// Optional text to embed (defaults to "dimension probe")
        text: Option<String>,
    },

    /// Delete the local database (fresh start)
    ResetDb {
        /// Database path (defaults to ~/.hyrag/data)
        #[arg(short, long)]
        db_path: Option<PathBuf>,
    },
}

fn default_db_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".hyrag");
    path.push("data");
    path
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::EmbeddingDim { text } = &cli.command {
        let tei = TeiClient::from_env();
        let tei_ok = tei.health().await.unwrap_or(false);
        if !tei_ok {
            eprintln!("Error: embeddings service is not reachable.");
            eprintln!("  TEI (embeddings): {}", tei.base_url());
            anyhow::bail!("Embeddings service unavailable");
        }

        use hyrag_engine::EmbeddingProvider;
        let probe = text.clone().unwrap_or_else(|| "dimension probe".to_string());
        let embedding = tei.embed(&probe).await?;
        println!("Embedding dimension: {}", embedding.len());
        return Ok(());
    }

    // Setup logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::ResetDb { db_path } = &cli.command {
        let path = db_path.clone().unwrap_or_else(default_db_path);

        if path.exists() {
            std::fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove db at {}", path.display()))?;
            println!("✓ Removed database at {}", path.display());
        } else {
            println!("Database not found at {}, nothing to remove", path.display());
        }
        return Ok(());
    }

    // Resolve the retrieval mode up front: bad mode strings should fail
    // before any service or database work
    let resolved_mode = match &cli.command {
        Commands::Query { query, mode, .. } => Some(match mode {
            Some(m) => m.parse::<RetrievalMode>()?,
            None => {
                let routed = RetrievalMode::route(query);
                info!("Auto-routed query to {} mode", routed);
                routed
            }
        }),
        _ => None,
    };

    let db = if cli.memory {
        info!("Using in-memory database");
        init_memory().await?
    } else {
        let db_path = cli.db_path.clone().unwrap_or_else(default_db_path);

        // Ensure directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Using database at: {}", db_path.display());
        init_persistent(&db_path).await?
    };

    let repo = Repository::new(db);
    let tei = TeiClient::from_env();

    // Graph-mode queries never embed; everything else that touches a
    // query or document does
    let needs_tei = match (&cli.command, resolved_mode) {
        (Commands::Ingest { .. }, _) => true,
        (Commands::Query { .. }, Some(RetrievalMode::Graph)) => false,
        (Commands::Query { .. }, _) => true,
        _ => false,
    };

    if needs_tei {
        let tei_ok = tei.health().await.unwrap_or(false);
        if !tei_ok {
            eprintln!("Error: embeddings service is not reachable.");
            eprintln!("  TEI (embeddings): {}", tei.base_url());
            eprintln!("Start it with: docker compose up -d");
            anyhow::bail!("Embeddings service unavailable");
        }
    }

    match cli.command {
        Commands::Ingest { doc_id, path } => {
            cmd_ingest(repo, tei, doc_id, path).await?;
        }
        Commands::Build {
            doc_id,
            graph,
            tree,
        } => {
            cmd_build(repo, tei, doc_id, graph, tree).await?;
        }
        Commands::Query {
            doc_id,
            query,
            top_k,
            ..
        } => {
            let mode = resolved_mode.unwrap_or(RetrievalMode::Hybrid);
            cmd_query(repo, tei, doc_id, query, mode, top_k).await?;
        }
        Commands::Docs => {
            cmd_docs(repo).await?;
        }
        Commands::Stats => {
            cmd_stats(repo).await?;
        }
        Commands::EmbeddingDim { .. } => {
            // Handled before database init.
        }
        Commands::ResetDb { .. } => {
            // Handled before database init.
        }
    }

    Ok(())
}

async fn cmd_ingest(
    repo: Repository,
    tei: TeiClient,
    doc_id: String,
    path: Option<PathBuf>,
) -> Result<()> {
    let text = match path {
        Some(p) => std::fs::read_to_string(&p)
            .with_context(|| format!("Failed to read file: {}", p.display()))?,
        None => {
            eprintln!("Enter document text (Ctrl+D to finish):");
            let stdin = io::stdin();
            let lines: Vec<String> = stdin.lock().lines().filter_map(|l| l.ok()).collect();
            lines.join("\n")
        }
    };

    if text.trim().is_empty() {
        anyhow::bail!("Document text cannot be empty");
    }

    let ingestor = Ingestor::new(repo, Arc::new(tei));
    let chunks = ingestor.ingest_text(&doc_id, &text).await?;

    println!("✓ Ingested {} chunks for document {}", chunks.len(), doc_id);
    println!("  Next: hyrag build {}", doc_id);

    Ok(())
}

async fn cmd_build(
    repo: Repository,
    tei: TeiClient,
    doc_id: String,
    graph_only: bool,
    tree_only: bool,
) -> Result<()> {
    let retriever = Retriever::new(repo, Arc::new(tei));
    let build_graph = graph_only || !tree_only;
    let build_tree = tree_only || !graph_only;

    if build_graph {
        let graph = retriever.build_graph(&doc_id).await?;
        println!(
            "✓ Graph built: {} entities, {} edges",
            graph.entity_count(),
            graph.edge_count()
        );
    }

    if build_tree {
        let tree = retriever.build_tree(&doc_id).await?;
        println!(
            "✓ Tree built: {} nodes across {} levels",
            tree.node_count(),
            tree.depth()
        );
    }

    Ok(())
}

async fn cmd_query(
    repo: Repository,
    tei: TeiClient,
    doc_id: String,
    query: String,
    mode: RetrievalMode,
    top_k: usize,
) -> Result<()> {
    let retriever = Retriever::new(repo.clone(), Arc::new(tei));
    let results = retriever.retrieve(&doc_id, &query, mode, top_k).await?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    let chunks: HashMap<_, _> = repo
        .list_chunks(&doc_id)
        .await?
        .into_iter()
        .map(|c: Chunk| (c.id.clone(), c.text))
        .collect();

    println!("Found {} results ({} mode):\n", results.len(), mode);
    for r in &results {
        let text = chunks.get(&r.chunk_id).map(String::as_str).unwrap_or("");
        let preview: String = text.chars().take(200).collect();

        println!(
            "{}. [{}] {} (score: {:.4})",
            r.rank, r.source, r.chunk_id, r.score
        );
        println!(
            "   {}{}",
            preview,
            if text.chars().count() > 200 { "..." } else { "" }
        );
        println!();
    }

    Ok(())
}

async fn cmd_docs(repo: Repository) -> Result<()> {
    let doc_ids = repo.list_doc_ids().await?;

    if doc_ids.is_empty() {
        println!("No documents yet. Add one with: hyrag ingest <doc-id> <file>");
        return Ok(());
    }

    println!("Documents ({}):", doc_ids.len());
    for doc_id in doc_ids {
        let chunks = repo.list_chunks(&doc_id).await?;
        println!("  • {} ({} chunks)", doc_id, chunks.len());
    }

    Ok(())
}

async fn cmd_stats(repo: Repository) -> Result<()> {
    let stats = repo.get_stats().await?;

    println!("Database Statistics:");
    println!("  • Documents: {}", stats.doc_count);
    println!("  • Chunks: {}", stats.chunk_count);
    println!("  • Graph indexes: {}", stats.graph_count);
    println!("  • Tree indexes: {}", stats.tree_count);

    Ok(())
}
