//! `mpjson` CLI: convert between JSON and MessagePack from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Encode JSON to MessagePack (stdin → stdout, raw bytes)
//! echo '{"b": 1, "a": 2}' | mpjson encode > data.msgpack
//!
//! # Encode from file to file, writing every float as float 32
//! mpjson encode --single-float -i data.json -o data.msgpack
//!
//! # Encode and print the result as base64 text
//! mpjson encode --base64-output -i data.json
//!
//! # Decode MessagePack back to JSON
//! mpjson decode -i data.msgpack
//!
//! # Decode a base64 argument, pretty-printed
//! mpjson decode --style pretty g6FhAaFiAqFjAw==
//!
//! # Compare JSON and MessagePack sizes
//! mpjson stats -i data.json
//! ```
//!
//! Set `RUST_LOG=debug` to see transcoder events on stderr.

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::{Parser, Subcommand, ValueEnum};
use mpjson_core::{DecodeOptions, EncodeOptions, TextStyle, DEFAULT_MAX_DEPTH};
use std::io::{self, Read, Write};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mpjson",
    version,
    about = "Order-preserving JSON <-> MessagePack converter"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode JSON to MessagePack
    Encode {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long, conflicts_with = "base64")]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Write every float as a 4-byte float 32
        #[arg(long)]
        single_float: bool,
        /// Write the MessagePack bytes as base64 text instead of raw bytes
        #[arg(long)]
        base64_output: bool,
        /// JSON given as a base64 string instead of a file or stdin
        base64: Option<String>,
    },
    /// Decode MessagePack to JSON
    Decode {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long, conflicts_with = "base64")]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Layout of the JSON output
        #[arg(long, value_enum, default_value_t = Style::Spaced)]
        style: Style,
        /// Maximum nesting of arrays and maps
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
        /// MessagePack given as a base64 string instead of a file or stdin
        base64: Option<String>,
    },
    /// Show the size of a JSON document and its MessagePack encoding
    Stats {
        /// Input JSON file (reads from stdin if omitted)
        #[arg(short, long, conflicts_with = "base64")]
        input: Option<String>,
        /// Size floats as 4-byte float 32
        #[arg(long)]
        single_float: bool,
        /// JSON given as a base64 string instead of a file or stdin
        base64: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Style {
    /// `{"a": 1, "b": [1, 2]}`
    Spaced,
    /// `{"a":1,"b":[1,2]}`
    Compact,
    /// Indented, one entry per line
    Pretty,
}

impl From<Style> for TextStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Spaced => TextStyle::Spaced,
            Style::Compact => TextStyle::Compact,
            Style::Pretty => TextStyle::Pretty,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            input,
            output,
            single_float,
            base64_output,
            base64,
        } => {
            let json = read_text(input.as_deref(), base64.as_deref())?;
            let options = EncodeOptions {
                single_precision: single_float,
                ..EncodeOptions::default()
            };
            let bytes = mpjson_core::encode_with(&json, &options)
                .context("Failed to encode JSON to MessagePack")?;

            if base64_output {
                let mut text = STANDARD.encode(&bytes);
                if output.is_none() {
                    text.push('\n');
                }
                write_output(output.as_deref(), text.as_bytes())?;
            } else {
                write_output(output.as_deref(), &bytes)?;
            }
        }
        Commands::Decode {
            input,
            output,
            style,
            max_depth,
            base64,
        } => {
            if max_depth == 0 {
                bail!("--max-depth must be at least 1");
            }
            let bytes = read_input(input.as_deref(), base64.as_deref())?;
            let options = DecodeOptions {
                max_depth,
                style: style.into(),
            };
            let mut json = mpjson_core::decode_with(&bytes, &options)
                .context("Failed to decode MessagePack to JSON")?;
            if output.is_none() {
                json.push('\n');
            }
            write_output(output.as_deref(), json.as_bytes())?;
        }
        Commands::Stats {
            input,
            single_float,
            base64,
        } => {
            let json = read_text(input.as_deref(), base64.as_deref())?;
            let bytes = mpjson_core::encode(&json, single_float)
                .context("Failed to encode JSON to MessagePack")?;
            let json_bytes = json.len();
            let msgpack_bytes = bytes.len();
            let ratio = if json_bytes > 0 {
                (1.0 - (msgpack_bytes as f64 / json_bytes as f64)) * 100.0
            } else {
                0.0
            };
            println!("JSON size:        {} bytes", json_bytes);
            println!("MessagePack size: {} bytes", msgpack_bytes);
            println!("Reduction:        {:.1}%", ratio);
        }
    }

    Ok(())
}

/// Read raw input from a base64 argument, a file, or stdin, in that order.
fn read_input(path: Option<&str>, base64: Option<&str>) -> Result<Vec<u8>> {
    if let Some(encoded) = base64 {
        return STANDARD
            .decode(encoded.trim())
            .context("Failed to decode base64 argument");
    }
    match path {
        Some(path) => std::fs::read(path).with_context(|| format!("Failed to read file: {}", path)),
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            debug!(len = buf.len(), "read input from stdin");
            Ok(buf)
        }
    }
}

/// Like [`read_input`], but the input must be UTF-8 text.
fn read_text(path: Option<&str>, base64: Option<&str>) -> Result<String> {
    let bytes = read_input(path, base64)?;
    String::from_utf8(bytes).context("Input is not valid UTF-8")
}

fn write_output(path: Option<&str>, content: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(content)
                .and_then(|()| stdout.flush())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
