use crate::config::AdvisorConfig;
use advisor_indexer::{DocumentScanner, IngestStats};
use advisor_rag::{
    build_generator, Answer, Bootstrap, GenerationProvider, RagEngine, StubGenerator,
};
use advisor_vector_store::{build_embedder, IndexStats, SnapshotStore};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build an engine over the configured snapshot. Only `ask` needs a real
/// generation provider; the other commands never call one.
fn build_engine(config: &AdvisorConfig, with_generation: bool) -> Result<RagEngine> {
    let api_key = config.api_key.as_deref();
    let embedder = build_embedder(&config.embedding, api_key)
        .context("Failed to create embedding provider")?;
    let generator: Arc<dyn GenerationProvider> = if with_generation {
        build_generator(&config.generation, api_key)
            .context("Failed to create generation provider")?
    } else {
        Arc::new(StubGenerator)
    };

    let engine = RagEngine::new(&config.engine_config(), embedder, generator)?
        .with_snapshot(SnapshotStore::new(&config.storage.index_path));
    Ok(engine)
}

fn progress_bar(len: usize, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

#[derive(Serialize)]
struct IngestReport {
    stats: IngestStats,
    index: IndexStats,
}

pub async fn run_ingest(
    config: &AdvisorConfig,
    kb: Option<PathBuf>,
    docs: &[PathBuf],
    json: bool,
) -> Result<()> {
    let engine = build_engine(config, false)?;

    // A missing or corrupt snapshot is rebuilt from the configured knowledge
    // base before anything is appended to it
    let mut total = IngestStats::new();
    let kb_built = match bootstrap(&engine, &config.storage.kb_path).await? {
        Bootstrap::Rebuilt(stats) => {
            total.merge(stats);
            true
        }
        Bootstrap::Loaded { chunks } => {
            log::info!("Appending to existing index ({chunks} chunks)");
            false
        }
        Bootstrap::Empty => false,
    };

    // With no explicit inputs, ingest the configured knowledge base; skip it
    // when the bootstrap has just built the index from it
    let kb = kb
        .or_else(|| docs.is_empty().then(|| config.storage.kb_path.clone()))
        .filter(|path| !(kb_built && *path == config.storage.kb_path));

    if let Some(kb_path) = &kb {
        let stats = engine
            .ingest_knowledge_base(kb_path)
            .await
            .with_context(|| format!("Failed to ingest knowledge base {}", kb_path.display()))?;
        total.merge(stats);
    }

    let mut files = Vec::new();
    for root in docs {
        let scanner = DocumentScanner::new(root);
        for path in scanner.scan()? {
            let source = scanner.source_name(&path);
            files.push((path, source));
        }
    }

    let pb = progress_bar(files.len(), json || files.is_empty());
    for (path, source) in &files {
        pb.set_message(source.clone());
        let documents = advisor_indexer::load_document(path, source).await?;
        let stats = engine
            .ingest(&documents)
            .await
            .with_context(|| format!("Failed to ingest {}", path.display()))?;
        total.merge(stats);
        pb.inc(1);
    }
    pb.finish_and_clear();

    engine.save().await.context("Failed to save index")?;
    let index = engine.stats().await;

    if json {
        let report = IngestReport {
            stats: total,
            index,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Ingested {} documents into {} chunks in {}ms ({} lines skipped)",
            total.documents, total.chunks, total.time_ms, total.skipped_lines
        );
        println!(
            "Index now holds {} chunks from {} sources",
            index.chunks, index.sources
        );
    }
    Ok(())
}

pub async fn run_ask(
    config: &AdvisorConfig,
    question: &str,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    let engine = build_engine(config, true)?;
    bootstrap(&engine, &config.storage.kb_path).await?;

    let answer = engine.ask_with_k(question, k).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer);
    }
    Ok(())
}

pub async fn run_stats(config: &AdvisorConfig, json: bool) -> Result<()> {
    let engine = build_engine(config, false)?;
    if engine.load().await?.is_none() {
        log::warn!(
            "No usable index at {}; run `advisor ingest` first",
            config.storage.index_path.display()
        );
    }

    let stats = engine.stats().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Chunks:    {}", stats.chunks);
        println!("Sources:   {}", stats.sources);
        println!("Model:     {}", stats.model_id);
        println!("Dimension: {}", stats.dimension);
    }
    Ok(())
}

pub async fn run_rebuild(config: &AdvisorConfig, kb: Option<PathBuf>, json: bool) -> Result<()> {
    let kb = kb.unwrap_or_else(|| config.storage.kb_path.clone());
    // The old snapshot stays in place until the rebuilt index replaces it
    let engine = build_engine(config, false)?;
    let stats = engine
        .rebuild(Some(&kb))
        .await
        .with_context(|| format!("Failed to rebuild from {}", kb.display()))?;
    engine.save().await.context("Failed to save index")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "Rebuilt index from {}: {} chunks in {}ms",
            kb.display(),
            stats.chunks,
            stats.time_ms
        );
    }
    Ok(())
}

async fn bootstrap(engine: &RagEngine, kb_path: &Path) -> Result<Bootstrap> {
    let outcome = engine.bootstrap(Some(kb_path)).await?;
    match &outcome {
        Bootstrap::Loaded { chunks } => log::debug!("Loaded index with {chunks} chunks"),
        Bootstrap::Rebuilt(stats) => log::info!(
            "Built index from {} ({} chunks)",
            kb_path.display(),
            stats.chunks
        ),
        Bootstrap::Empty => log::warn!("Index is empty; answers will lack context"),
    }
    Ok(outcome)
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);
    if answer.citations.is_empty() {
        return;
    }
    println!();
    println!("Sources:");
    for (i, source) in answer.citations.iter().enumerate() {
        println!("  {}. {source}", i + 1);
    }
}
