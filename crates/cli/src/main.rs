//! Tabula CLI
//!
//! Derives column-level lineage from lineage tables and publishes it, together
//! with glossary terms, to the metadata catalog.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tabula_client::CatalogClient;
use tabula_emitter::Emitter;
use tabula_lineage::{derive_from_path, glossary, GlossaryPlan, DEFAULT_JOB_NAMESPACE};
use tracing_subscriber::EnvFilter;

mod config;

use config::PipelineConfig;

#[derive(Parser)]
#[command(name = "tabula")]
#[command(version, about = "Column-level lineage publisher", long_about = None)]
struct Cli {
    /// Path to the pipeline config file
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive and emit lineage for every configured source
    Run,

    /// Validate a lineage table and print the derived events without emitting
    Check {
        /// Lineage table to derive
        path: PathBuf,

        /// Job namespace of the derived events
        #[arg(short, long, default_value = DEFAULT_JOB_NAMESPACE)]
        namespace: String,
    },

    /// Publish glossary terms and attach them to dataset fields
    Glossary {
        /// JSON file with the glossary definitions
        #[arg(short, long, default_value = "glossary_terms.json")]
        file: PathBuf,

        /// Attach terms through one schema update per dataset
        #[arg(long)]
        per_dataset: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_pipeline(&cli.config),
        Commands::Check { path, namespace } => check_table(&path, &namespace),
        Commands::Glossary { file, per_dataset } => {
            publish_glossary(&cli.config, &file, per_dataset)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn connect(config: &PipelineConfig) -> Result<CatalogClient> {
    let client_config = config.client_config()?;
    tracing::info!(catalog = %client_config.base_url, "Using catalog");
    CatalogClient::new(client_config).context("failed to create catalog client")
}

fn run_pipeline(config_path: &Path) -> Result<()> {
    let config = PipelineConfig::from_file(config_path)?;
    if config.lineage_sources.is_empty() {
        bail!("no lineage sources configured in {}", config_path.display());
    }

    let emitter = Emitter::new(connect(&config)?)
        .with_job_namespace(&config.job_namespace)
        .with_dataset_facts(config.emit_dataset_facts)
        .with_failure_policy(config.failure_policy());

    let report = emitter.process_batch(&config.lineage_sources)?;

    for source in &report.sources {
        match &source.failure {
            None => println!(
                "{}: {} job(s) emitted",
                source.source.name,
                source.emitted.len()
            ),
            Some(failure) => println!("{}: FAILED ({})", source.source.name, failure.message),
        }
    }

    if !report.is_success() {
        bail!(
            "{} of {} lineage source(s) failed",
            report.failed_count(),
            report.sources.len()
        );
    }
    Ok(())
}

fn check_table(path: &Path, namespace: &str) -> Result<()> {
    let events = derive_from_path(namespace, path)
        .with_context(|| format!("lineage table {} is invalid", path.display()))?;

    tracing::info!(
        path = %path.display(),
        jobs = events.len(),
        "Lineage table is valid"
    );
    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}

fn publish_glossary(config_path: &Path, file: &Path, per_dataset: bool) -> Result<()> {
    let config = PipelineConfig::from_file(config_path)?;
    let entries = glossary::load_entries_from_path(file)
        .with_context(|| format!("failed to load glossary from {}", file.display()))?;

    let owner = config.glossary_owner.as_deref();
    let plan = if per_dataset {
        GlossaryPlan::per_dataset(&entries, owner)
    } else {
        GlossaryPlan::per_field(&entries, owner)
    };

    let emitter = Emitter::new(connect(&config)?);
    let sent = emitter.emit_glossary(&plan)?;
    println!("{} glossary fact(s) published for {} term(s)", sent, entries.len());
    Ok(())
}
