use console::style;
use log::{debug, info};
use shellfn::shell::normalize_key;
use shellfn::{
    ExecutionRecord, FileContent, FunctionDescriptor, Kwargs, ProcessOutput, ProcessState,
    RunOptions, Runner, Value, wrap,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Exit status reported for killed records, as shells do for SIGINT
const KILLED_EXIT: i32 = 130;

/// Configuration for one command run
pub struct RunConfig {
    pub command: String,
    pub files: Vec<(String, PathBuf)>,
    pub outputs: Vec<String>,
    pub attach_stdout: bool,
    pub label: Option<String>,
    pub store_provenance: bool,
    pub json: bool,
    pub output_dir: Option<PathBuf>,
    pub args: Vec<String>,
}

/// Build the keyword inputs: the argument list plus one file per `--file`
pub fn build_kwargs(config: &RunConfig) -> shellfn::Result<Kwargs> {
    let mut kwargs = Kwargs::new();
    if !config.args.is_empty() {
        kwargs.insert("arguments", Value::list(config.args.iter().map(String::as_str)));
    }
    for (key, path) in &config.files {
        debug!("Staging {} as `{}`", path.display(), key);
        kwargs.insert(key.clone(), FileContent::from_path(path)?);
    }
    Ok(kwargs)
}

/// Function name derived from the command's file name
pub fn function_name(command: &str) -> String {
    let base = Path::new(command)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| command.to_string());
    normalize_key(&base)
}

pub fn run_command(config: RunConfig) -> Result<i32, Box<dyn std::error::Error>> {
    let descriptor = FunctionDescriptor::new(function_name(&config.command))
        .doc(format!("Run the `{}` command.", config.command));
    let func = wrap(config.command.as_str())
        .attach_stdout(config.attach_stdout)
        .output_filenames(config.outputs.iter().cloned())
        .build(descriptor)?;

    let kwargs = build_kwargs(&config)?;
    let options = RunOptions {
        store_provenance: config.store_provenance,
        label: config.label.clone(),
        cancel: None,
    };

    info!("Executing: {} {:?}", config.command, config.args);
    let (result, record) = func.launch(&Runner::default(), &options, vec![], kwargs)?;

    if let Some(dir) = &config.output_dir {
        save_outputs(dir, &result)?;
    }

    if config.json {
        println!("{}", serde_json::to_string_pretty(&record.summary())?);
    } else {
        print_streams(&record, &result);
        print_summary(&record);
    }

    Ok(exit_status(&record))
}

/// Exit status for the CLI process
pub fn exit_status(record: &ExecutionRecord) -> i32 {
    match record.state() {
        ProcessState::Killed => KILLED_EXIT,
        _ => record.exit_status().unwrap_or(0) as i32,
    }
}

/// Write every file output into `dir`
pub fn save_outputs(dir: &Path, result: &ProcessOutput) -> std::io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let outputs = result.clone().into_outputs();
    for file in outputs.values().filter_map(Value::as_file) {
        let path = dir.join(file.filename());
        fs::write(&path, file.content())?;
        debug!("Saved output {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn print_streams(record: &ExecutionRecord, result: &ProcessOutput) {
    let stdout = record.blob_content("stdout").or_else(|| {
        result
            .as_mapping()
            .and_then(|outputs| outputs.get("stdout"))
            .and_then(Value::as_file)
            .map(FileContent::text)
    });
    if let Some(stdout) = stdout {
        print!("{}", stdout);
    }
    if let Some(stderr) = record.blob_content("stderr") {
        eprint!("{}", stderr);
    }
}

fn print_summary(record: &ExecutionRecord) {
    let status = exit_status(record);
    let status_styled = if status == 0 {
        style(status).green().bold()
    } else {
        style(status).red().bold()
    };

    print!(
        "{}={} | {}={} | {}={}",
        style("state").dim(),
        style(record.state()).bold(),
        style("exit_status").dim(),
        status_styled,
        style("id").dim(),
        record.id(),
    );
    if !record.is_storable() {
        print!(" | {}={}", style("stored").dim(), style("false").yellow());
    }
    println!();

    if let Some(message) = record.exit_message() {
        println!("{} {}", style("message:").dim(), message);
    }

    for (name, value) in record.outputs() {
        match value.as_file() {
            Some(file) => println!(
                "  {} {} ({} bytes)",
                style(name).cyan(),
                file.filename(),
                file.len()
            ),
            None => println!("  {} {}", style(name).cyan(), value.to_json()),
        }
    }
}
