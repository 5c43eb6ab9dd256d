use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "landed-cost")]
#[command(about = "Shipment tracking, import cost coefficients and exports")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "landed-cost.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Compute the cost coefficient for a set of inputs
    Calc(CalcArgs),
    /// List threshold alerts for all shipments
    Alerts {
        /// Evaluate as of this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
    },
    /// Print the executive report
    Report {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Build the spreadsheet/ZIP export
    Export {
        /// Override the export directory
        #[arg(long)]
        output_path: Option<String>,
        /// Leave attached documents out of the archive
        #[arg(long)]
        no_documents: bool,
    },
    /// Move a shipment to another status
    Status {
        /// Shipment id or code
        shipment: String,
        /// preparing, in_transit, in_customs or delivered
        status: String,
    },
    /// Attach a document to a shipment
    Attach {
        /// Shipment id or code
        shipment: String,
        /// invoice, packing_list, bill_of_lading, dua or other
        kind: String,
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct CalcArgs {
    /// JSON or TOML file with cost inputs
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Recalculate and store the cost record of this shipment (id or code)
    #[arg(long)]
    pub shipment: Option<String>,

    #[arg(long)]
    pub fob: Option<f64>,

    #[arg(long)]
    pub tax_rate: Option<f64>,

    #[arg(long)]
    pub exchange_rate: Option<f64>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}
