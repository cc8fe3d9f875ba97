//! shellfn controller CLI - Run shell commands as recorded processes

mod cli;
mod commands;
mod logging;
mod runner;

use clap::Parser;
use cli::{Cli, Commands};
use commands::list_exit_codes;
use console::style;
use runner::{RunConfig, run_command};

fn main() {
    let cli = Cli::parse();

    logging::init_logger(cli.verbose);

    match cli.command {
        Commands::Run {
            command,
            file,
            output,
            attach_stdout,
            label,
            no_provenance,
            json,
            output_dir,
            args,
        } => {
            let config = RunConfig {
                command,
                files: file,
                outputs: output,
                attach_stdout,
                label,
                store_provenance: !no_provenance,
                json,
                output_dir,
                args,
            };
            match run_command(config) {
                Ok(status) => std::process::exit(status),
                Err(e) => {
                    eprintln!("{} {}", style("error:").red().bold(), e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Codes => list_exit_codes(),
    }
}
