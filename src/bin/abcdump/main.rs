//! abcdump - inspect Alembic Ogawa archives.

use std::env;
use std::time::Instant;

use abc_decode::core::{PropertyHeader, PropertyType, Sample, SampleValues};
use abc_decode::ogawa::{Archive, BlockGroup, CompoundReader, ObjectReader, PropertyReader, ReadOptions};
use abc_decode::Result;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_DATE: &str = env!("ABCDUMP_BUILD_DATE");
const BUILD_TIME: &str = env!("ABCDUMP_BUILD_TIME");

fn init_logging(level: &str) {
    // RUST_LOG wins over the command line flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut level = "warn";
    let mut positional: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "-V" | "--version" => {
                println!("abcdump {} (built {} {})", VERSION, BUILD_DATE, BUILD_TIME);
                return;
            }
            _ => positional.push(arg),
        }
    }
    init_logging(level);

    let (command, path) = match positional.as_slice() {
        [] | ["h" | "help" | "-h" | "--help", ..] => {
            print_help();
            return;
        }
        [file] if file.ends_with(".abc") => ("info", *file),
        [command, file, ..] => (*command, *file),
        [command] => {
            eprintln!("Error: missing file argument");
            eprintln!("Usage: abcdump {} <file.abc>", command);
            std::process::exit(1);
        }
    };

    let result = match command {
        "info" | "i" => cmd_info(path),
        "tree" | "t" => cmd_tree(path),
        "stats" | "s" => cmd_stats(path),
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        error!("{}: {}", path, e);
        std::process::exit(1);
    }
}

fn print_help() {
    println!("abcdump - Alembic archive inspector");
    println!();
    println!("USAGE:");
    println!("    abcdump [OPTIONS] <COMMAND> <file>");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>    Show versions, archive metadata and time samplings");
    println!("    t, tree   <file>    Show object and property hierarchy");
    println!("    s, stats  <file>    Read every sample and report counts, sizes and timing");
    println!("    h, help             Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only report errors");
    println!("    -V, --version    Show version and build date");
    println!();
    println!("Passing a .abc file directly is equivalent to 'info'.");
    println!("RUST_LOG overrides the verbosity flags.");
}

fn open(path: &str) -> Result<Archive> {
    info!("Opening archive: {}", path);
    let start = Instant::now();
    let archive = Archive::open(path, &ReadOptions::default())?;
    debug!("Opened in {:.2?}", start.elapsed());
    Ok(archive)
}

fn cmd_info(path: &str) -> Result<()> {
    let archive = open(path)?;

    println!("Archive: {}", path);
    println!("Layout version:  {}", archive.version());
    println!("Library version: {}", archive.library_version());

    if !archive.meta_data().is_empty() {
        println!();
        println!("Metadata:");
        for (key, value) in archive.meta_data().iter() {
            println!("  {} = {}", key, value);
        }
    }

    println!();
    println!("Time samplings: {}", archive.registry().len());
    for (index, sampling) in archive.registry().iter().enumerate() {
        let max = archive.registry().max_samples(index as u32).unwrap_or(0);
        let kind = if sampling.sampling_type.is_acyclic() {
            "acyclic".to_string()
        } else if sampling.sampling_type.is_uniform() {
            format!("uniform, {}s per sample", sampling.time_per_cycle())
        } else {
            format!("cyclic, {} per {}s", sampling.times.len(), sampling.time_per_cycle())
        };
        println!(
            "  [{}] {} ({} times stored, max {} samples, starts at {})",
            index,
            kind,
            sampling.times.len(),
            max,
            sampling.sample_time(0)
        );
    }

    let top = archive.top(0)?;
    println!();
    println!("Top-level objects: {}", top.num_children());
    Ok(())
}

fn cmd_tree(path: &str) -> Result<()> {
    let archive = open(path)?;
    let top = archive.top(0)?;
    println!("{}", path);
    print_object(&top, 1)
}

fn print_object<G: BlockGroup>(object: &ObjectReader<G>, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    if depth > 1 {
        match object.header().schema() {
            Some(schema) => println!("{}{} [{}]", indent, object.name(), schema),
            None => println!("{}{}", indent, object.name()),
        }
    }

    print_compound(&object.properties(0)?, depth + 1)?;
    for index in 0..object.num_children() {
        print_object(&object.child(index, 0)?, depth + 1)?;
    }
    Ok(())
}

fn print_compound<G: BlockGroup>(compound: &CompoundReader<G>, depth: usize) -> Result<()> {
    let indent = "  ".repeat(depth);
    for (index, header) in compound.property_headers().iter().enumerate() {
        println!("{}.{}", indent, describe(header));
        if header.is_compound() {
            if let PropertyReader::Compound(child) = compound.property(index, 0)? {
                print_compound(&child, depth + 1)?;
            }
        }
    }
    Ok(())
}

fn describe(header: &PropertyHeader) -> String {
    match (header.property_type, header.data_type) {
        (PropertyType::Compound, _) | (_, None) => format!("{} {{}}", header.name),
        (kind, Some(data_type)) => {
            let kind = if kind == PropertyType::Scalar { "scalar" } else { "array" };
            let constant = if header.is_constant() { ", constant" } else { "" };
            format!(
                "{}: {} {} ({} samples{}, ts {})",
                header.name,
                kind,
                data_type,
                header.num_samples(),
                constant,
                header.time_sampling_index
            )
        }
    }
}

#[derive(Default)]
struct Stats {
    objects: usize,
    compounds: usize,
    scalars: usize,
    arrays: usize,
    samples: usize,
    values: usize,
    bytes: usize,
}

impl Stats {
    fn add_samples(&mut self, samples: &[Sample]) {
        self.samples += samples.len();
        for sample in samples {
            self.values += sample.len();
            self.bytes += match sample.values() {
                SampleValues::Pod(buf) => buf.len(),
                SampleValues::Strings(strings) => strings.iter().map(|s| s.len() + 1).sum(),
            };
        }
    }
}

fn cmd_stats(path: &str) -> Result<()> {
    let archive = open(path)?;
    let start = Instant::now();

    let mut stats = Stats::default();
    collect_object(&archive.top(0)?, &mut stats)?;
    let elapsed = start.elapsed();

    println!("Archive: {}", path);
    println!("Objects:    {}", stats.objects);
    println!("Properties: {} compound, {} scalar, {} array", stats.compounds, stats.scalars, stats.arrays);
    println!("Samples:    {} ({} values, {} bytes)", stats.samples, stats.values, stats.bytes);
    println!("Read time:  {:.2?}", elapsed);
    Ok(())
}

fn collect_object<G: BlockGroup>(object: &ObjectReader<G>, stats: &mut Stats) -> Result<()> {
    stats.objects += 1;
    collect_compound(&object.properties(0)?, stats)?;
    for index in 0..object.num_children() {
        collect_object(&object.child(index, 0)?, stats)?;
    }
    Ok(())
}

fn collect_compound<G: BlockGroup>(compound: &CompoundReader<G>, stats: &mut Stats) -> Result<()> {
    for index in 0..compound.num_properties() {
        match compound.property(index, 0)? {
            PropertyReader::Compound(child) => {
                stats.compounds += 1;
                collect_compound(&child, stats)?;
            }
            PropertyReader::Scalar(p) => {
                stats.scalars += 1;
                stats.add_samples(&p.read_samples_par(p.data_type().pod)?);
            }
            PropertyReader::Array(p) => {
                stats.arrays += 1;
                stats.add_samples(&p.read_samples_par(p.data_type().pod)?);
            }
        }
    }
    Ok(())
}
