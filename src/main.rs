//! Process Figures CLI
//!
//! Usage:
//!   process-figures [OPTIONS] [FILE]
//!
//! Options:
//!   -s, --skin <FILE>     Skin file for symbol and link styles (TOML format)
//!   -c, --config <FILE>   Layout configuration (TOML format)
//!   -g, --geometry        Print the persisted geometry of every element instead of SVG
//!       --outline         Draw shapes and connections only
//!       --embedded        Omit the XML declaration
//!   -v, --verbose         Log layout decisions to stderr
//!   -h, --help            Print help

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

use process_figures::{render_svg, Document, EngineConfig, Skin, SvgConfig};

#[derive(Parser)]
#[command(name = "process-figures")]
#[command(about = "Lay out and render process diagram documents")]
struct Cli {
    /// Input document (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Skin file for symbol and link styles (TOML format)
    #[arg(short, long)]
    skin: Option<PathBuf>,

    /// Layout configuration (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the persisted geometry of every element instead of SVG
    #[arg(short, long)]
    geometry: bool,

    /// Draw shapes and connections only
    #[arg(long)]
    outline: bool,

    /// Omit the XML declaration
    #[arg(long)]
    embedded: bool,

    /// Log layout decisions to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let skin = match &cli.skin {
        Some(path) => Skin::from_file(path).unwrap_or_else(|e| {
            fail(&format!("Error loading skin '{}': {}", path.display(), e))
        }),
        None => Skin::default(),
    };

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).unwrap_or_else(|e| {
            fail(&format!("Error loading config '{}': {}", path.display(), e))
        }),
        None => EngineConfig::default(),
    };

    let source = match &cli.input {
        Some(path) => fs::read_to_string(path).unwrap_or_else(|e| {
            fail(&format!("Error reading file '{}': {}", path.display(), e))
        }),
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                fail(&format!("Error reading from stdin: {}", e));
            }
            buffer
        }
    };

    let diagram = Document::from_toml(&source)
        .and_then(|doc| doc.load(&skin, config))
        .unwrap_or_else(|e| fail(&format!("Error: {}", e)));

    if cli.geometry {
        for figure in diagram.figures() {
            let Some(element) = &figure.element else {
                continue;
            };
            match diagram.encode_geometry(figure.id) {
                Ok(text) => println!("{}\t{}", element, text),
                Err(e) => fail(&format!("Error: {}", e)),
            }
        }
        return;
    }

    let svg_config = if cli.outline {
        SvgConfig::outline()
    } else {
        SvgConfig::default()
    }
    .with_standalone(!cli.embedded);
    println!("{}", render_svg(&diagram, &skin, &svg_config));
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}
