//! Command-line argument definitions.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `generate` | Generate a table for the given columns and prompt |
//! | `models` | List the model catalog |
//!
//! ```bash
//! # Offline demo rows
//! skugen generate --columns 颜色,尺寸 --prompt "夏季T恤" --rows 3 --mock
//!
//! # Continue an exported table and save as CSV
//! skugen generate --seed table.json --prompt "秋季款" --rows 10 --output more.csv
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Generate synthetic SKU tables with a chat-completion model.
///
/// The API key is read from SKUGEN_API_KEY (or DEEPSEEK_API_KEY), also from a
/// `.env` file in the working directory.
#[derive(Debug, Parser)]
#[command(name = "skugen", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate rows and print a preview, optionally exporting them.
    Generate(GenerateArgs),
    /// List the models available for --model.
    Models(ModelsArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Column labels, comma separated or repeated.
    #[arg(short, long, value_delimiter = ',', conflicts_with_all = ["columns_file", "seed"])]
    pub columns: Vec<String>,

    /// File with one column label per line.
    #[arg(long, value_name = "PATH", conflicts_with = "seed")]
    pub columns_file: Option<PathBuf>,

    /// What the rows describe, e.g. "夏季T恤".
    #[arg(short, long)]
    pub prompt: String,

    /// Number of rows to generate.
    #[arg(short, long, default_value_t = 10)]
    pub rows: usize,

    /// Serve deterministic mock rows instead of calling the model.
    #[arg(long)]
    pub mock: bool,

    /// Model display name or identifier (see `skugen models`).
    #[arg(short, long)]
    pub model: Option<String>,

    /// JSON table (array of objects) to continue from. Its columns are reused.
    #[arg(long, value_name = "PATH")]
    pub seed: Option<PathBuf>,

    /// Write the rows to this file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Export format. Defaults to the --output extension, else csv.
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,

    /// Ask for one response body instead of a token stream.
    #[arg(long)]
    pub no_stream: bool,

    /// Rows shown in the terminal preview (0 disables it).
    #[arg(long, default_value_t = 10)]
    pub preview: usize,

    /// Wall-clock limit in seconds for the whole generation.
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub timeout: Option<f64>,
}

#[derive(Debug, Args)]
pub struct ModelsArgs {
    /// Print the catalog as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}
