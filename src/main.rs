use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use landed_cost::adapters::repository_from_config;
use landed_cost::app::commands::{self, CostOverrides};
use landed_cost::config::{CliConfig, Command};
use landed_cost::domain::model::{DocumentKind, ShipmentStatus};
use landed_cost::domain::ports::{ConfigProvider, Repository};
use landed_cost::utils::error::ErrorSeverity;
use landed_cost::utils::logger;
use landed_cost::utils::validation::Validate;
use landed_cost::{CostSummary, ExportEngine, ExportPipeline, LocalStorage, TomlConfig};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting landed-cost");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = load_config(&cli.config)?;

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command, config).await {
        tracing::error!(
            "Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 4,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<TomlConfig> {
    if !Path::new(path).exists() {
        tracing::warn!("Config file {} not found, using defaults", path);
        return Ok(TomlConfig::default());
    }
    tracing::info!("Loading configuration from {}", path);
    TomlConfig::from_file(path).with_context(|| format!("Failed to load config file '{}'", path))
}

async fn run(command: Command, config: TomlConfig) -> landed_cost::Result<()> {
    let now = Utc::now();
    match command {
        Command::Calc(args) => {
            let overrides = CostOverrides {
                input: args.input,
                fob: args.fob,
                tax_rate: args.tax_rate,
                exchange_rate: args.exchange_rate,
            };
            let summary = match &args.shipment {
                Some(reference) => {
                    let repository = repository_from_config(&config.source)?;
                    commands::store_cost_record(
                        repository.as_ref(),
                        reference,
                        &overrides,
                        config.blank_cost_inputs(),
                        now,
                    )
                    .await?
                }
                None => commands::calculate_only(&overrides, config.blank_cost_inputs())?,
            };

            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Command::Alerts { date } => {
            let repository = repository_from_config(&config.source)?;
            let (today, alerts) = commands::current_alerts(
                repository.as_ref(),
                &config.alert_thresholds(),
                date,
                now,
            )
            .await?;
            if alerts.is_empty() {
                println!("No alerts as of {}", today);
            }
            for alert in alerts {
                println!(
                    "[{:<8}] {:<16} {:<20} {}",
                    alert.severity.as_str(),
                    alert.shipment_code,
                    alert.kind.as_str(),
                    alert.message
                );
            }
        }
        Command::Report { json } => {
            let repository = repository_from_config(&config.source)?;
            let report = commands::build_report(
                repository.as_ref(),
                config.business_name(),
                &config.alert_thresholds(),
                now,
            )
            .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }
        Command::Export {
            output_path,
            no_documents,
        } => {
            let mut config = config;
            if let Some(path) = output_path {
                config.export.output_path = path;
            }
            if no_documents {
                config.export.include_documents = false;
            }

            let repository = repository_from_config(&config.source)?;
            let storage = LocalStorage::new(config.export.output_path.clone());
            let pipeline = ExportPipeline::new(repository, storage, config).as_of(now);
            let engine = ExportEngine::new(pipeline);

            let output_path = engine.run().await?;
            println!("✅ Export completed: {}", output_path);
        }
        Command::Status { shipment, status } => {
            let status: ShipmentStatus = status.parse()?;
            let repository = repository_from_config(&config.source)?;
            let updated = repository.update_status(&shipment, status).await?;
            println!("{} is now {}", updated.code, updated.status);
        }
        Command::Attach {
            shipment,
            kind,
            file,
        } => {
            let kind: DocumentKind = kind.parse()?;
            let repository = repository_from_config(&config.source)?;
            let document =
                commands::attach_document(repository.as_ref(), &shipment, kind, &file, now).await?;
            println!(
                "Attached {} to {} as {}",
                document.file_name, shipment, kind
            );
        }
    }

    Ok(())
}

fn print_summary(summary: &CostSummary) {
    println!("FOB value:         {:>14.2}", summary.fob_value);
    for (name, value) in &summary.breakdown {
        if *value != 0.0 {
            println!("  + {:<22} {:>10.2}", name, value);
        }
    }
    println!("Additional costs:  {:>14.2}", summary.additional_costs);
    println!("Total cost:        {:>14.2}", summary.total_cost);
    println!(
        "Coefficient:       {:>14.4}  ({:.2}% overhead)",
        summary.coefficient, summary.overhead_pct
    );
    let refundable: f64 = summary.refundable.values().sum();
    if refundable != 0.0 {
        println!("Refundable (excluded): {:>10.2}", refundable);
    }
}
