//! citecheck binary
//!
//! Reads a plain-text paper, resolves its references and asks a language
//! model whether each citation supports the sentence it appears in.

mod cli;
mod render;
mod settings;

use std::sync::Arc;

use citecheck_core::http::HttpError;
use citecheck_core::{
    ArxivSource, BibliographicSearch, CitationChecker, CrossrefSource, PagedText, Progress,
    ProgressCallback, Stage,
};
use citecheck_llm::{get_models, get_providers, LlmJudge};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Format, SourceKind};
use crate::settings::AppConfig;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_providers() {
    for provider in get_providers() {
        println!("{:<12} {} ({})", provider.id, provider.name, provider.description);
        for model in get_models(provider.id) {
            let marker = if model.is_default { "*" } else { " " };
            println!("  {} {}", marker, model.id);
        }
    }
}

fn build_search(config: &AppConfig) -> Result<Arc<dyn BibliographicSearch>, HttpError> {
    let timeout = config.check.timeout();
    let search: Arc<dyn BibliographicSearch> = match config.search.source {
        SourceKind::Arxiv => Arc::new(ArxivSource::new(timeout)?),
        SourceKind::Crossref => {
            let mut source = CrossrefSource::new(timeout)?;
            if let Some(mailto) = &config.search.mailto {
                source = source.with_mailto(mailto.clone());
            }
            Arc::new(source)
        }
    };
    info!("Resolving references against {}", search.metadata().name);
    Ok(search)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_providers {
        print_providers();
        return Ok(());
    }
    let Some(path) = args.file.clone() else {
        return Err("no document given".into());
    };

    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_args(&args);
    debug!(?config, "Effective configuration");

    let api_key = args
        .api_key
        .clone()
        .ok_or("CITECHECK_API_KEY is not set (or pass --api-key)")?;
    let judge = LlmJudge::new(config.judge.clone(), api_key)?;
    info!(provider = %config.judge.provider, model = judge.model(), "Using judge");

    let search = build_search(&config)?;
    let checker = CitationChecker::new(config.check.clone(), search, Arc::new(judge))?;

    let text = std::fs::read_to_string(&path)?;
    let document = PagedText::from_text(&text);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current batch");
            on_signal.cancel();
        }
    });

    let on_progress = |progress: &Progress| {
        let stage = match progress.stage {
            Stage::Resolving => "resolving",
            Stage::Verifying => "verifying",
        };
        debug!(stage, completed = progress.completed, total = progress.total, "Progress");
    };
    let progress: &ProgressCallback = &on_progress;

    let report = checker.check_with(&document, &cancel, Some(progress)).await?;
    if !report.complete {
        warn!("Run was cancelled; the report covers finished work only");
    }

    let name = path.display().to_string();
    let generated_at = chrono::Utc::now();
    let rendered = match args.format {
        Format::Text => render::render_text(&report, &name, generated_at),
        Format::Json => render::render_json(&report, &name, generated_at)?,
    };

    match &args.output {
        Some(out) => {
            std::fs::write(out, rendered)?;
            info!("Report written to {}", out.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
