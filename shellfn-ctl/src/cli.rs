use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shellfn-ctl")]
#[command(version, about = "Run shell commands as recorded processes", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Run a command and print its record
    shellfn-ctl run date -- --iso-8601

    # Stage input files and reference them in the arguments
    shellfn-ctl run cat --file a=notes.txt --file b=todo.txt -- {a} {b}

    # Collect output files matching a pattern
    shellfn-ctl run split --file input=lines.txt --output 'x*' -- -l 1 {input}

    # Machine readable record
    shellfn-ctl run --json head --file f=notes.txt -- -n 1

    # List the exit codes of shell functions
    shellfn-ctl codes
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a command in a scratch directory and print its record
    Run {
        /// Command to run, resolved on PATH
        command: String,

        /// Input file staged in the working directory, referenced as {KEY} in arguments
        #[arg(short, long, value_name = "KEY=PATH", value_parser = parse_file_arg)]
        file: Vec<(String, PathBuf)>,

        /// Output file or pattern to collect from the working directory
        #[arg(short, long, value_name = "NAME")]
        output: Vec<String>,

        /// Return stdout as an output instead of storing it on the record
        #[arg(long)]
        attach_stdout: bool,

        /// Record label
        #[arg(short, long, value_name = "LABEL")]
        label: Option<String>,

        /// Do not hand the record to the store
        #[arg(long)]
        no_provenance: bool,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,

        /// Directory to write collected output files into
        #[arg(short = 'd', long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Command arguments
        #[arg(last = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// List the exit codes of shell functions
    Codes,
}

/// Parse a `KEY=PATH` file argument
pub fn parse_file_arg(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((key, path)) if !key.is_empty() && !path.is_empty() => {
            Ok((key.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected KEY=PATH, got `{}`", raw)),
    }
}
