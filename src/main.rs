use clap::Parser;
use intact_dx::app::convert::{convert, ConvertOptions};
use intact_dx::config::toml_config::{DxConfig, RegistryKind};
use intact_dx::core::imex_central::{BatchReport, ImexCentralManager};
use intact_dx::domain::ports::PublicationRegistry;
use intact_dx::formats::mitab::MitabVersion;
use intact_dx::utils::error::{DxError, ErrorSeverity, Result};
use intact_dx::utils::{logger, validation::Validate};
use intact_dx::{
    CliConfig, Command, EtlEngine, HttpRegistry, InMemoryRegistry, JsonStore,
    LocalStorage, UniprotExportPipeline,
};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let log_settings = logger::LogSettings::new(cli.verbose, cli.json_logs || config.monitoring.json_logs);
    if let Err(e) = logger::init_logger(log_settings) {
        eprintln!("⚠️ {}", e);
    }
    tracing::info!("Starting intact-dx");
    tracing::debug!("CLI: {:?}", cli);

    if let Err(e) = run(&cli, config).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

/// Reads the TOML file (if any), applies command-line overrides and validates.
fn load_config(cli: &CliConfig) -> Result<DxConfig> {
    let mut config = match &cli.config {
        Some(path) => DxConfig::from_file(path)?,
        None => DxConfig::default(),
    };
    if let Some(dataset) = &cli.dataset {
        config.store.dataset = dataset.clone();
    }
    if cli.monitor {
        config.monitoring.enabled = true;
    }
    if let Command::UniprotExport {
        output,
        threshold,
        bundle,
    } = &cli.command
    {
        if let Some(output) = output {
            config.output.directory = output.clone();
        }
        if let Some(threshold) = threshold {
            config.export.miscore.threshold = *threshold;
        }
        if bundle.is_some() {
            config.output.bundle = bundle.clone();
        }
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: &CliConfig, config: DxConfig) -> Result<()> {
    match &cli.command {
        Command::UniprotExport { .. } => {
            if config.monitoring_enabled() {
                tracing::info!("🔍 System monitoring enabled");
            }
            let store = Arc::new(JsonStore::load(&config.store.dataset)?);
            let storage = LocalStorage::new(&config.output.directory);
            let monitoring = config.monitoring_enabled();
            let pipeline =
                UniprotExportPipeline::new(storage, store, config.export, config.output)?;
            let output = EtlEngine::new_with_monitoring(pipeline, monitoring).run().await?;
            println!("✅ UniProt export completed");
            println!("📁 Output saved to: {}", output);
            Ok(())
        }
        Command::ImexAssign { .. } | Command::ImexSync { .. } => {
            let store = JsonStore::load(&config.store.dataset)?;
            let outcome = match config.registry.kind {
                RegistryKind::Memory => {
                    tracing::warn!("⚠️ Using the in-memory registry, ids are not kept remotely");
                    let registry = InMemoryRegistry::new(config.registry.first_number);
                    run_imex(&cli.command, &config, &store, &registry).await
                }
                RegistryKind::Http => match config.registry.endpoint.as_deref() {
                    Some(endpoint) => {
                        let registry = HttpRegistry::new(
                            endpoint,
                            config.registry.timeout(),
                            config.registry.credentials(),
                        )?;
                        run_imex(&cli.command, &config, &store, &registry).await
                    }
                    None => {
                        return Err(DxError::MissingConfigError {
                            field: "registry.endpoint".to_string(),
                        })
                    }
                },
            };
            // Publications handled before a failure keep their ids.
            if config.store.write_back {
                store.flush().await?;
                tracing::info!("💾 Dataset updated: {}", config.store.dataset);
            }
            outcome
        }
        Command::Convert {
            from,
            to,
            input,
            output,
            mitab_version,
            publications,
        } => {
            let version = match mitab_version {
                Some(v) => MitabVersion::parse(v).ok_or_else(|| DxError::InvalidConfigValueError {
                    field: "--mitab-version".to_string(),
                    value: v.clone(),
                    reason: "Expected 2.5 or 2.7".to_string(),
                })?,
                None => config.output.version()?,
            };
            let options = ConvertOptions {
                mitab_version: version,
                mitab_header: config.output.mitab_header,
                publications: publications.clone(),
            };
            let data = tokio::fs::read(input).await?;
            let converted = convert(&data, *from, *to, &options)?;
            if let Some(parent) = output.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(output, &converted).await?;
            println!("✅ Converted {} -> {}", input.display(), output.display());
            Ok(())
        }
    }
}

async fn run_imex<R: PublicationRegistry>(
    command: &Command,
    config: &DxConfig,
    store: &JsonStore,
    registry: &R,
) -> Result<()> {
    let manager = ImexCentralManager::new(store, registry);
    match command {
        Command::ImexAssign {
            publications,
            no_sync,
        } => {
            let batch = manager.assign_each(publications, !*no_sync).await;
            for report in &batch.synchronized {
                println!(
                    "🏷️ {} -> {} ({} interactions)",
                    report.publication_ac,
                    report.imex_id.as_deref().unwrap_or("-"),
                    report.interactions_assigned
                );
            }
            report_failures(&batch)?;
        }
        Command::ImexSync {
            publications,
            all,
            assign_missing,
        } => {
            if *all {
                let batch = manager
                    .update_all(*assign_missing || config.imex.assign_missing)
                    .await?;
                println!(
                    "🔄 {} synchronized, {} skipped, {} failed",
                    batch.synchronized.len(),
                    batch.skipped.len(),
                    batch.failed.len()
                );
                report_failures(&batch)?;
            } else {
                if publications.is_empty() {
                    return Err(DxError::ValidationError {
                        message: "give publication ACs or --all".to_string(),
                    });
                }
                for ac in publications {
                    let report = manager.sync_publication(ac).await?;
                    println!(
                        "🔄 {} {}",
                        ac,
                        if report.changed() { "updated" } else { "already in sync" }
                    );
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn report_failures(batch: &BatchReport) -> Result<()> {
    for (ac, error) in &batch.failed {
        eprintln!("❌ {}: {}", ac, error);
    }
    if batch.failed.is_empty() {
        Ok(())
    } else {
        Err(DxError::ProcessingError {
            message: format!("{} publications failed", batch.failed.len()),
        })
    }
}
