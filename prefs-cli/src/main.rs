/*!
Prefs CLI - inspect, verify and convert preference documents.

Documents are handled as plain node trees; no classes are registered, so
any well-formed document can be read regardless of the program that wrote it.
*/

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use prefs_core::{CompressionKind, Node, Prefs, PrefsConfig};
use tabled::{Table, Tabled};
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "prefs")]
#[command(about = "Inspect and convert preference documents")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit log events as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Input documents are gzip-compressed
    #[arg(short = 'z', long, global = true)]
    gzip_input: bool,

    /// Context configuration (JSON)
    #[arg(short, long, global = true, env = "PREFS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the node tree of a document
    Show {
        /// Document to read
        file: PathBuf,
    },
    /// Check that a document parses
    Verify {
        /// Document to read
        file: PathBuf,
    },
    /// Re-encode a document
    Convert {
        /// Document to read
        input: PathBuf,
        /// Document to write
        output: PathBuf,
        /// Compress the output with gzip
        #[arg(long)]
        gzip: bool,
        /// Write compact instead of indented JSON
        #[arg(long)]
        compact: bool,
    },
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Depth")]
    depth: usize,
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Properties")]
    properties: String,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    if cli.log_json {
        prefs_core::init_observability(true, cli.verbose)?;
    } else {
        prefs_core::init_logging(cli.verbose)?;
    }

    if !prefs_core::check_version!() {
        anyhow::bail!("prefs-core {} is not compatible with this tool", prefs_core::VERSION);
    }

    let base_config = load_config(cli.config.as_deref())?;
    let input_config = input_config(&base_config, cli.gzip_input);

    match cli.command {
        Commands::Show { file } => show_document(input_config, &file)?,
        Commands::Verify { file } => verify_document(input_config, &file)?,
        Commands::Convert {
            input,
            output,
            gzip,
            compact,
        } => {
            let output_config = output_config(base_config, gzip, compact);
            convert_document(input_config, output_config, &input, &output)?
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PrefsConfig, anyhow::Error> {
    let Some(path) = path else {
        return Ok(PrefsConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = PrefsConfig::from_json(&text)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Configuration for reading; `--gzip-input` forces gzip, otherwise the file's setting stays
fn input_config(base: &PrefsConfig, gzip_input: bool) -> PrefsConfig {
    if gzip_input {
        base.clone().with_compression(CompressionKind::Gzip)
    } else {
        base.clone()
    }
}

/// Configuration for writing; flags only override when given
fn output_config(base: PrefsConfig, gzip: bool, compact: bool) -> PrefsConfig {
    let mut config = base;
    if gzip {
        config = config.with_compression(CompressionKind::Gzip);
    }
    if compact {
        config = config.with_pretty(false);
    }
    config
}

fn path_str(path: &Path) -> Result<&str, anyhow::Error> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("Path is not valid UTF-8: {}", path.display()))
}

fn read_document(config: PrefsConfig, file: &Path) -> Result<(Prefs, Node), anyhow::Error> {
    let mut prefs: Prefs = Prefs::with_config(config)?;
    let root = prefs.node_from_file(path_str(file)?)?;
    Ok((prefs, root))
}

fn show_document(config: PrefsConfig, file: &Path) -> Result<(), anyhow::Error> {
    info!("Showing document: {}", file.display());

    let (_prefs, root) = read_document(config, file)?;
    let size = std::fs::metadata(file).map(|m| format_size(m.len())).unwrap_or_else(|_| "Unknown".into());

    println!("Document: {}", file.display());
    println!("  Root: <{}>", root.tag());
    println!("  Nodes: {}", root.subtree_len());
    println!("  Size: {size}");

    let table = Table::new(collect_rows(&root));
    println!("{table}");
    Ok(())
}

fn verify_document(config: PrefsConfig, file: &Path) -> Result<(), anyhow::Error> {
    info!("Verifying document: {}", file.display());

    match read_document(config, file) {
        Ok((_prefs, root)) => {
            println!("✓ Document is valid ({} nodes, root <{}>)", root.subtree_len(), root.tag());
            Ok(())
        }
        Err(e) => {
            error!("✗ Failed to verify document: {}", e);
            Err(e)
        }
    }
}

fn convert_document(
    input_config: PrefsConfig,
    output_config: PrefsConfig,
    input: &Path,
    output: &Path,
) -> Result<(), anyhow::Error> {
    info!("Converting {} -> {}", input.display(), output.display());

    let (_input_prefs, root) = read_document(input_config, input)?;
    let writer: Prefs = Prefs::with_config(output_config)?;
    writer
        .node_to_file(&root, path_str(output)?)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✓ Wrote {} nodes to {}", root.subtree_len(), output.display());
    Ok(())
}

/// Flatten a tree into table rows, depth first in document order
fn collect_rows(root: &Node) -> Vec<NodeRow> {
    let mut rows = Vec::new();
    let mut stack = vec![(0, root.clone())];

    while let Some((depth, node)) = stack.pop() {
        let properties = node
            .properties()
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        rows.push(NodeRow {
            depth,
            tag: node.tag(),
            properties,
        });

        for child in node.children().into_iter().rev() {
            stack.push((depth + 1, child));
        }
    }

    rows
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
