//! Command-line interface for the splitter.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{SplitConfig, DEFAULT_CHUNK_SIZE_MB};
use crate::error::Result;
use crate::splitting::{split_xml_with, FlushPolicy};

/// XML Splitter - Split large XML documents into size-bounded chunk files.
#[derive(Parser)]
#[command(name = "xml-splitter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split an XML file into chunk files of roughly equal size.
    Split {
        /// Source XML document
        input: PathBuf,

        /// Directory for the chunk files (created if missing)
        output: PathBuf,

        /// Target chunk size in megabytes
        #[arg(short = 's', long, default_value_t = DEFAULT_CHUNK_SIZE_MB)]
        chunk_size_mb: f64,

        /// Keep only the first N direct children of each record
        #[arg(short = 'm', long)]
        max_children: Option<usize>,

        /// Flush before (pre-check) or after (post-check) the record that crosses the threshold
        #[arg(short, long, default_value_t = FlushPolicy::PreCheck)]
        policy: FlushPolicy,

        /// Zero-pad chunk numbers to this many digits (e.g. 3 gives chunk_001.xml)
        #[arg(long, default_value_t = 0)]
        index_width: usize,
    },

    /// Split using settings from a YAML config file.
    Run {
        /// Path to the YAML config file
        config: PathBuf,
    },
}

impl Commands {
    /// Turn the parsed command into a split configuration.
    pub fn into_config(self) -> Result<SplitConfig> {
        match self {
            Self::Split {
                input,
                output,
                chunk_size_mb,
                max_children,
                policy,
                index_width,
            } => {
                let config = SplitConfig::new(input, output)
                    .with_chunk_size_mb(chunk_size_mb)
                    .with_max_children(max_children)
                    .with_policy(policy)
                    .with_index_width(index_width);
                config.validate()?;
                Ok(config)
            }
            Self::Run { config } => SplitConfig::from_yaml_file(&config),
        }
    }
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.command.into_config()?;
    split_command(&config)
}

/// Execute a split with progress output.
fn split_command(config: &SplitConfig) -> Result<()> {
    println!(
        "{} {} into {} ({} MB per chunk, {})",
        style("Splitting").bold(),
        style(config.input_file.display()).cyan(),
        style(config.output_dir.display()).cyan(),
        config.chunk_size_mb,
        config.policy
    );
    if let Some(limit) = config.max_children_per_element {
        println!("  Keeping the first {limit} children of each record");
    }
    println!();

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message("Reading records...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let summary = match split_xml_with(config, |chunk| {
        pb.set_message(format!(
            "Wrote {} ({} records)",
            chunk.path.display(),
            chunk.element_count
        ));
    }) {
        Ok(summary) => summary,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();

    println!("  Root: <{}>", style(&summary.root.name).green());
    println!("  Records: {}", summary.element_count);
    println!("  Chunks: {}", style(summary.chunk_count()).green().bold());
    println!("  Bytes written: {}", summary.total_bytes());
    if summary.chunk_count() == 0 {
        println!(
            "  {}",
            style("Root element has no children, no chunks written").yellow()
        );
    }

    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        config.output_dir.display()
    );

    Ok(())
}
