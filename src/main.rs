//! Main entry point for the safeunzip CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tracing_subscriber::EnvFilter;

use safeunzip::extract::WriteOutcome;
use safeunzip::{Cli, Extractor, ZipEntry};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    if cli.list || cli.verbose {
        let entries = safeunzip::list(&cli.file)
            .with_context(|| format!("cannot list {}", cli.file))?;
        print_listing(&entries, cli.verbose);
        return Ok(());
    }

    let extractor = Extractor::new(cli.extract_options());

    // Pipe mode: write file contents directly to stdout
    if cli.pipe {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        extractor
            .extract_to_writer(&cli.file, &mut out)
            .with_context(|| format!("cannot extract {}", cli.file))?;
        out.flush()?;
        return Ok(());
    }

    let quiet = cli.is_quiet();
    let report = extractor
        .extract_with(&cli.file, cli.destination(), |entry, outcome| {
            if quiet {
                return;
            }
            match outcome {
                WriteOutcome::File { .. } => println!("  extracting: {}", entry.file_name),
                WriteOutcome::Directory => println!("   creating: {}", entry.file_name),
                WriteOutcome::Skipped => {
                    eprintln!("Skipping: {} (file exists)", entry.file_name)
                }
            }
        })
        .with_context(|| format!("cannot extract {} into {}", cli.file, cli.destination()))?;

    if !quiet {
        eprintln!(
            "\n{} files, {} directories, {} written",
            report.files,
            report.directories,
            format_size(report.bytes)
        );
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-q`.
fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// List files in the ZIP archive.
///
/// - Simple format (`-l`): Just file names, one per line
/// - Verbose format (`-v`): Detailed table with size, compression ratio, and timestamps
///
/// # Arguments
///
/// * `entries` - Entries in storage order, as returned by [`safeunzip::list`]
/// * `verbose` - If true, print the detailed table with totals
fn print_listing(entries: &[ZipEntry], verbose: bool) {
    if !verbose {
        for entry in entries {
            println!("{}", entry.file_name);
        }
        return;
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        // Totals exclude directories
        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>21}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count
    );
}

/// Space saved by compression, as a right-aligned percentage.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 || compressed >= uncompressed {
        return "  0%".to_string();
    }
    format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
}

/// Format a byte size into a human-readable string.
///
/// # Arguments
///
/// * `size` - Size in bytes
///
/// # Returns
///
/// A string like "1.50 MB" or "500 bytes".
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
