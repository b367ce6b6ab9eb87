use clap::{Parser, Subcommand};

/// RoadSense Store - processed telemetry ingestion and live fan-out
#[derive(Parser)]
#[command(name = "roadsense-store")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the server (default)
    Serve,

    /// Print the most recently stored records
    List {
        /// Number of records to show
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },
}
