//! json-shred: Decompose nested JSON into relational tables driven by a schema file
//!
//! Usage:
//!   # Read from file, write a tagged row stream to stdout
//!   json-shred --schema demos/invoice_schema.json demos/invoice.json
//!
//!   # Read NDJSON from stdin, write one .jsonl file per table
//!   cat invoices.jsonl | json-shred --schema schema.json --ndjson -o ./tables
//!
//!   # Show the inferred attachment and parent patterns
//!   json-shred --schema schema.json --explain

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use json_shredder::{
    Extraction, Extractor, FieldTypeValidator, SchemaFile, ShredConfig, SingleWriter, SpecSet,
    TableWriter,
};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "json-shred")]
#[command(about = "Decompose nested JSON into relational tables", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Schema file describing the target tables
    #[arg(long, short = 's')]
    schema: String,

    /// Process newline-delimited JSON (one document per line)
    #[arg(long)]
    ndjson: bool,

    /// Output directory for separate .jsonl files per table
    /// If omitted, writes to stdout as a single stream tagged with `_table`
    #[arg(long, short = 'o')]
    output_dir: Option<String>,

    /// Write record validation errors as JSON Lines to this file
    #[arg(long)]
    errors: Option<String>,

    /// Exit with a failure status if any record failed validation
    #[arg(long)]
    fail_on_errors: bool,

    /// Maximum nesting depth of a document (default: 256)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print the compiled table specs and exit
    #[arg(long)]
    explain: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let schema_file = File::open(&args.schema)
        .with_context(|| format!("Failed to open schema file: {}", args.schema))?;
    let schema = SchemaFile::from_reader(BufReader::new(schema_file))
        .with_context(|| format!("Failed to parse schema file: {}", args.schema))?;

    let mut config = ShredConfig::default();
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }

    let validator = FieldTypeValidator::from_schemas(&schema.tables);
    let extractor = Extractor::with_config(&schema.tables, validator, config)?;

    if args.explain {
        explain(extractor.specs());
        return Ok(ExitCode::SUCCESS);
    }

    let reader = if let Some(file_path) = &args.input {
        Box::new(BufReader::new(
            File::open(file_path).with_context(|| format!("Failed to open input: {file_path}"))?,
        )) as Box<dyn Read>
    } else {
        Box::new(std::io::stdin()) as Box<dyn Read>
    };

    let extraction = process_reader(reader, &extractor, args.ndjson)?;
    info!(
        rows = extraction.results.total_rows(),
        errors = extraction.errors.len(),
        "extraction finished"
    );

    if let Some(output_dir) = &args.output_dir {
        let mut writer = TableWriter::new(output_dir)?;
        writer.write_results(&extraction.results)?;
        writer.flush()?;
    } else {
        let mut writer = SingleWriter::new(std::io::stdout().lock());
        writer.write_extraction(&extraction)?;
        writer.flush()?;
    }

    if let Some(errors_path) = &args.errors {
        let file = File::create(errors_path)
            .with_context(|| format!("Failed to create errors file: {errors_path}"))?;
        let mut writer = SingleWriter::new(std::io::BufWriter::new(file));
        writer.write_errors(&extraction.errors)?;
        writer.flush()?;
    } else {
        for error in &extraction.errors {
            let fields: Vec<_> = error.errors.iter().map(|e| e.field.as_str()).collect();
            warn!(table = %error.table, path = %error.path, fields = ?fields, "rejected record");
        }
    }

    if args.fail_on_errors && !extraction.is_clean() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Parse the whole input with SIMD-accelerated JSON parsing, falling back to
/// line-by-line parsing for NDJSON
fn process_reader(
    reader: Box<dyn Read>,
    extractor: &Extractor<FieldTypeValidator>,
    ndjson: bool,
) -> Result<Extraction> {
    let mut content = Vec::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader.read_to_end(&mut content).context("Failed to read input")?;

    if !ndjson {
        let mut scratch = content.clone();
        match simd_json::serde::from_slice::<Value>(&mut scratch) {
            Ok(value) => return Ok(extractor.run(&value)?),
            Err(e) => warn!(error = %e, "input is not a single JSON document, reading as NDJSON"),
        }
    }

    json_shredder::shred_json(content.as_slice(), extractor)
}

fn explain(specs: &SpecSet) {
    for spec in specs {
        println!("{}", spec.name);
        println!("  attachment:  {}", spec.attachment_pattern());
        println!("  parent:      {}", spec.parent_pattern().unwrap_or("-"));
        if let Some(parent) = specs.parent_table(&spec.name) {
            println!("  parent table: {}", parent.name);
        }
        println!("  primary key: {}", spec.primary_key.as_deref().unwrap_or("-"));
        for fk in &spec.foreign_keys {
            println!(
                "  foreign key: {} -> {}",
                fk.field,
                fk.references.as_deref().unwrap_or("?")
            );
        }
        for field in &spec.fields {
            let origin = if field.is_local { "local" } else { "alias" };
            println!("    {:<20} {:<6} {}", field.name, origin, field.alias);
        }
    }
}
