// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HDDS Prometheus bridge CLI
//!
//! # Usage
//!
//! ```bash
//! # Write a sample mapping configuration
//! hdds-prometheus gen-config --output mapper.yaml
//!
//! # Check a mapping configuration
//! hdds-prometheus validate --config mapper.yaml
//!
//! # Show the metrics a configuration yields for a schema
//! hdds-prometheus plan --config mapper.yaml --schema sensor.yaml
//!
//! # Replay recorded samples and print the exposition
//! hdds-prometheus render --config mapper.yaml --schema sensor.yaml --samples samples.json
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use hdds_dynamic::schema::SchemaDocument;
use hdds_dynamic::TypeDescriptor;
use hdds_prometheus::replay::{load_samples, to_samples};
use hdds_prometheus::{Mapper, MapperConfig, MetricRegistry, MonitorProcessor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// HDDS Prometheus bridge
#[derive(Parser, Debug)]
#[command(name = "hdds-prometheus")]
#[command(about = "HDDS Prometheus bridge - map DDS samples to Prometheus metrics")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "mapper.yaml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Print the metrics a configuration yields for a schema
    Plan {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,

        /// Schema file path (YAML)
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Replay recorded samples and print the exposition text
    Render {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,

        /// Schema file path (YAML)
        #[arg(short, long)]
        schema: PathBuf,

        /// Recorded samples (JSON array)
        #[arg(long)]
        samples: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::GenConfig { output } => cmd_gen_config(&output),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Plan { config, schema } => cmd_plan(&config, &schema),
        Commands::Render {
            config,
            schema,
            samples,
        } => cmd_render(&config, &schema, &samples),
    }
}

fn load_schema(path: &Path) -> anyhow::Result<Arc<TypeDescriptor>> {
    SchemaDocument::from_file(path)
        .and_then(|doc| doc.build())
        .with_context(|| format!("loading schema {}", path.display()))
}

fn load_config(path: &Path) -> anyhow::Result<MapperConfig> {
    MapperConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))
}

fn cmd_gen_config(output: &Path) -> anyhow::Result<()> {
    let yaml = MapperConfig::example().to_yaml()?;

    // Add comments
    let content = format!(
        r#"# HDDS Prometheus bridge mapping
# Generated by hdds-prometheus gen-config
#
# enable_auto_map: true exposes every numeric member and ignores `metrics`.

{}"#,
        yaml
    );

    std::fs::write(output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(path: &Path) -> anyhow::Result<()> {
    match MapperConfig::from_file(path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!(
                "Mode: {}",
                if config.enable_auto_map {
                    "auto-map"
                } else {
                    "declared"
                }
            );
            println!("Ignore: {:?}", config.ignore);
            println!("Instance info: {:?}", config.instance_info);
            println!("Metrics: {}", config.metrics.len());
            for (name, entry) in &config.metrics {
                println!(
                    "  {} -> {} ({})",
                    name,
                    entry.data_path,
                    entry.metric_type.as_deref().unwrap_or("gauge")
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_plan(config_path: &Path, schema_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let root = load_schema(schema_path)?;

    let mut mapper = Mapper::new(config);
    mapper.bind_type(root.clone());

    println!("Type: {}", root.name);
    println!("Metrics: {}", mapper.store().len());
    for (name, spec) in mapper.store().iter() {
        println!();
        println!("{} ({})", name, spec.kind);
        println!("  data_path:   {}", spec.data_path);
        match spec.data_type {
            Some(kind) => println!("  data_type:   {}", kind.idl_name()),
            None => println!("  data_type:   <unresolved>"),
        }
        for (key, path) in spec.key_map.iter() {
            println!("  key:         {} = {}", key, path);
        }
        for (list, path) in spec.collection_map.iter() {
            println!("  collection:  {} = {}", list, path);
        }
    }
    Ok(())
}

fn cmd_render(config_path: &Path, schema_path: &Path, samples_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let root = load_schema(schema_path)?;
    let recorded = load_samples(samples_path)
        .with_context(|| format!("loading samples {}", samples_path.display()))?;
    let samples = to_samples(&root, &recorded)?;

    let registry = Arc::new(MetricRegistry::new());
    let mut processor = MonitorProcessor::new(config, registry);
    processor.on_input_enabled(root);
    let report = processor.on_data_available(&samples);

    print!("{}", processor.exposition()?);
    eprintln!(
        "{} sample(s): {} series pushed, {} fallback(s), {} skipped, {} failed",
        samples.len(),
        report.pushed,
        report.fallbacks,
        report.skipped,
        report.failed
    );
    Ok(())
}
