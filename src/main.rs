use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use activity_search::config::{self, Config};
use activity_search::SemanticSearchService;

mod cli;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = cli::Args::parse();

    let base_path = config::default_base_path()?;
    let mut config = Config::load_with(&base_path).context("failed to load config")?;
    if let Some(dataset) = args.dataset {
        config.dataset = Some(dataset);
    }
    config.eager |= args.eager;

    let loader = Arc::new(config.model_loader());
    let service = SemanticSearchService::new(config.search_config(), loader)?;

    match args.command {
        cli::Command::Search {
            query,
            top_k,
            scores,
            count,
        } => {
            if scores {
                let results = service.semantic_search_with_scores(&query, top_k)?;
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }

            let items = service.semantic_search(&query, top_k)?;
            if count {
                println!("{} activities found", items.len());
            } else {
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
            Ok(())
        }

        cli::Command::Stats {} => {
            service.initialize()?;

            let stats = serde_json::json!({
                "dataset": config.dataset_source().to_string(),
                "model": config.semantic_search.model,
                "rows": service.indexed_count(),
                "dimensions": service.dimensions(),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}
