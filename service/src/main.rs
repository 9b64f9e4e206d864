use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use color_eyre::eyre;
use dialoguer::Input;
use tracing::trace;

use indexing::{FileFilter, FilesystemWatcher, IndexingService, WordTokenizer};

mod config;

use config::Config;

const MAX_RESULTS_SHOWN: usize = 10;

fn main() -> ExitCode {
    if let Err(error) = run() {
        eprintln!("{error:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .map_err(|e| eyre::eyre!(e))?;

    let config_path = std::env::args()
        .nth(1)
        .ok_or_else(|| eyre::eyre!("usage: service <config-file>"))?;
    let config = Config::load(&config_path)?;

    // A single shared service backs both the one-time startup index and the live watch: both
    // ultimately write into one index and serve one search surface, so they share one
    // `FileFilter::for_service()` policy rather than the watcher's narrower default.
    let service = Arc::new(IndexingService::new(
        Box::new(WordTokenizer::new()),
        FileFilter::for_service(),
    ));
    service.index_directory(&config.index_directory);

    let watcher = FilesystemWatcher::start(Arc::clone(&service), &config.watch_directory, true)?;

    repl(&service)?;

    watcher.stop();
    Ok(())
}

fn repl(service: &IndexingService) -> eyre::Result<()> {
    loop {
        let input: String = Input::new().interact_text()?;
        let trimmed = input.trim();

        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            return Ok(());
        }

        let terms: Vec<String> = trimmed.split_whitespace().map(str::to_string).collect();
        if terms.is_empty() {
            continue;
        }

        let start = Instant::now();
        let mut results = service.search_all(&terms);
        results.truncate(MAX_RESULTS_SHOWN);

        for result in &results {
            println!(" - {}:{} ({})", result.path.display(), result.line, result.matched_text);
        }
        println!(" :: {} match(es) shown (max {MAX_RESULTS_SHOWN})", results.len());

        trace!(?terms, duration = ?start.elapsed(), "query executed");
    }
}
