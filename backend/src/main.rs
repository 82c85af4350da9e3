//! Tablemerge CLI - Turn panel query results into a single table
//!
//! # Main Commands
//!
//! ```bash
//! tablemerge transform data.json --panel panel.json       # Datasets → table (JSON)
//! tablemerge transform a.csv b.csv --panel panel.json -f text
//! tablemerge serve                                        # Start HTTP server
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! tablemerge transforms                                   # List transforms
//! tablemerge columns data.json --transform json           # Selectable columns
//! tablemerge validate panel.json --data data.json         # Schema checks
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tablemerge::{
    describe_columns, load_all_datasets, load_panel, transform_data_to_table, validate_datasets,
    validate_panel_config, write_output, Config, OutputFormat, TransformRegistry,
};

#[derive(Parser)]
#[command(name = "tablemerge")]
#[command(about = "Merge and reshape panel query results into one table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a panel's transform over datasets
    Transform {
        /// Dataset files: JSON arrays of datasets, or CSV tables
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Panel configuration file
        #[arg(short, long)]
        panel: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the columns a transform offers for some datasets
    Columns {
        /// Dataset files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Transform identifier
        #[arg(short, long)]
        transform: String,
    },

    /// List registered transforms
    Transforms,

    /// Validate a panel configuration (and optionally its datasets)
    Validate {
        /// Panel configuration file
        panel: PathBuf,

        /// Dataset files to check against the panel's transform
        #[arg(short, long)]
        data: Vec<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: TABLEMERGE_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    let cli = Cli::parse();
    let registry = TransformRegistry::with_config(&config);

    let result = match cli.command {
        Commands::Transform {
            inputs,
            panel,
            format,
            output,
        } => cmd_transform(&registry, &inputs, &panel, format, output.as_deref()),

        Commands::Columns { inputs, transform } => cmd_columns(&registry, &inputs, &transform),

        Commands::Transforms => cmd_transforms(&registry),

        Commands::Validate { panel, data } => cmd_validate(&panel, &data),

        Commands::Serve { port } => cmd_serve(registry, port.unwrap_or(config.port)).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_transform(
    registry: &TransformRegistry,
    inputs: &[PathBuf],
    panel_path: &Path,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let panel = load_panel(panel_path)?;
    let data = load_all_datasets(inputs)?;
    eprintln!("📄 Loaded {} dataset(s) from {} file(s)", data.len(), inputs.len());

    if let Err(errors) = validate_datasets(&panel.transform, &data) {
        return Err(format_errors("Invalid datasets", &errors).into());
    }

    let table = transform_data_to_table(registry, &data, &panel)?;
    write_output(&table, format, output)?;

    if let Some(path) = output {
        eprintln!("💾 Saved to: {}", path.display());
    }
    Ok(())
}

fn cmd_columns(
    registry: &TransformRegistry,
    inputs: &[PathBuf],
    transform: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = load_all_datasets(inputs)?;
    let columns = describe_columns(registry, transform, &data)?;
    println!("{}", serde_json::to_string_pretty(&columns)?);
    Ok(())
}

fn cmd_transforms(registry: &TransformRegistry) -> Result<(), Box<dyn std::error::Error>> {
    println!("📋 Transforms:\n");
    for (id, description) in registry.list() {
        println!("   {:<26} {}", id, description);
    }
    Ok(())
}

fn cmd_validate(panel_path: &Path, data_paths: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", panel_path.display());

    let content = std::fs::read_to_string(panel_path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    if let Err(errors) = validate_panel_config(&value) {
        return Err(format_errors("Invalid panel configuration", &errors).into());
    }
    eprintln!("   ✅ Panel configuration valid");

    if !data_paths.is_empty() {
        let transform = value["transform"].as_str().unwrap_or_default();
        let data = load_all_datasets(data_paths)?;
        if let Err(errors) = validate_datasets(transform, &data) {
            return Err(format_errors("Invalid datasets", &errors).into());
        }
        eprintln!("   ✅ {} dataset(s) valid for '{}'", data.len(), transform);
    }

    Ok(())
}

async fn cmd_serve(registry: TransformRegistry, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    tablemerge::server::start_server(port, registry).await?;
    Ok(())
}

fn format_errors(title: &str, errors: &[String]) -> String {
    let mut message = format!("{} ({} error(s))", title, errors.len());
    for err in errors.iter().take(10) {
        message.push_str("\n   - ");
        message.push_str(err);
    }
    message
}
