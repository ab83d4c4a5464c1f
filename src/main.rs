// src/main.rs

use color_eyre::eyre::{Result, WrapErr, eyre};
use std::path::Path;
use tracing::info;

mod app;
mod cli;
mod config;
mod core;
mod export;
mod logging;
mod storage;

use app::App;
use cli::{CommandLine, Commands, OutputFormat, ResultsAction};
use export::{ExportQuery, batch_to_csv, export_csv};
use storage::ResultQuery;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let commands = CommandLine::parse_args();

    let config = crate::config::Config::load().wrap_err("Failed to load configuration")?;
    let log_path = logging::initialize_logging(&config.logging)?;
    info!(log = %log_path.display(), "Starting {}.", env!("CARGO_PKG_NAME"));

    let app = App::new(config).await?;

    match commands.command {
        Commands::Scan {
            domain,
            input,
            output,
            format,
            concurrency,
            save,
        } => {
            let mut inputs: Vec<String> = domain.into_iter().collect();
            if let Some(path) = input {
                inputs.extend(read_input_file(&path).await?);
            }
            eprintln!("Scanning {} domains...", inputs.len());

            let report = app.scan(inputs, concurrency.map(usize::from)).await;
            eprintln!(
                "Scan complete: {} succeeded, {} failed.",
                report.summary.succeeded, report.summary.failed
            );

            if save {
                let persisted = app.persist(&report).await;
                for (domain, id) in &persisted.stored {
                    eprintln!("Saved {domain} as #{id}");
                }
                for (domain, reason) in &persisted.failed {
                    eprintln!("Failed to save result for {domain}: {reason}");
                }
            }

            let rendered = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&report)?,
                OutputFormat::Csv => batch_to_csv(&report.results)?,
            };
            emit(&rendered, output.as_deref()).await
        }
        Commands::Results { action } => match action {
            ResultsAction::List {
                domain,
                since,
                limit,
            } => {
                let rows = app
                    .store
                    .list(&ResultQuery {
                        domain,
                        since,
                        limit: Some(limit),
                        offset: 0,
                    })
                    .await?;
                emit(&serde_json::to_string_pretty(&rows)?, None).await
            }
            ResultsAction::Export {
                domain,
                since,
                limit,
                offset,
                output,
            } => {
                let csv = export_csv(
                    app.store.as_ref(),
                    ExportQuery {
                        domain,
                        since,
                        limit,
                        offset,
                    },
                )
                .await?;
                emit(&csv, output.as_deref()).await
            }
            ResultsAction::Delete { id } => {
                if app.store.delete(id).await? {
                    println!("{{\"deleted\":true}}");
                    Ok(())
                } else {
                    Err(eyre!("Result not found"))
                }
            }
        },
    }
}

/// Reads one domain per line, skipping blanks.
async fn read_input_file(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("Input file not found: {}", path.display()))?;
    let domains: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    eprintln!("Loaded {} domains from {}", domains.len(), path.display());
    Ok(domains)
}

async fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, rendered)
                .await
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Results written to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
