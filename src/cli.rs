use clap::Parser;

use crate::extract::{ExtractOptions, Overwrite};

#[derive(Parser, Debug)]
#[command(name = "safeunzip")]
#[command(version)]
#[command(about = "A Rust unzip utility that never leaks file handles", long_about = None)]
#[command(after_help = "Examples:\n  \
  safeunzip data1.zip -x joe        extract all files except joe from data1.zip\n  \
  safeunzip -p foo.zip | more       send contents of foo.zip via pipe into more\n  \
  safeunzip -d out pkg.zip '*.so'   extract only shared objects into out/")]
pub struct Cli {
    /// ZIP file path
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Files to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely/show version info
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n', conflicts_with = "overwrite")]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting (default)
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Destination root: `-d DIR`, or the current directory.
    pub fn destination(&self) -> &str {
        self.extract_dir.as_deref().unwrap_or(".")
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_level(&self) -> &'static str {
        match self.quiet {
            0 => "warn",
            1 => "error",
            _ => "off",
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        let overwrite = if self.never_overwrite {
            Overwrite::Never
        } else {
            Overwrite::Always
        };
        ExtractOptions::default()
            .overwrite(overwrite)
            .include(self.files.iter().cloned())
            .exclude(self.exclude.iter().cloned())
            .junk_paths(self.junk_paths)
    }
}
