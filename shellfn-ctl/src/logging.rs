use console::style;
use env_logger::{Builder, Env};
use log::Level;
use std::io::Write;

/// Initialize logger; `RUST_LOG` overrides the level picked by the verbose flag
pub fn init_logger(verbose: bool) {
    logger_builder(verbose, "RUST_LOG").init();
}

fn logger_builder(verbose: bool, filter_var: &str) -> Builder {
    let default_level = if verbose { "debug" } else { "warn" };
    let env = Env::default().filter_or(filter_var, default_level);

    let mut builder = Builder::from_env(env);
    builder.format(|buf, record| {
        let level = match record.level() {
            Level::Error => style("ERROR").red().bold(),
            Level::Warn => style("WARN ").yellow().bold(),
            Level::Info => style("INFO ").green(),
            Level::Debug => style("DEBUG").cyan(),
            Level::Trace => style("TRACE").dim(),
        };
        writeln!(
            buf,
            "{} {} {}",
            level,
            style(record.target()).dim(),
            record.args()
        )
    });
    builder
}
