//! Integration tests for shellfn
//!
//! These tests run real commands (`date`, `cat`, `head`, `split`, `tar`, `sleep`)
//! from PATH on local runners.

use shellfn::schema::SINGLE_OUTPUT_KEY;
use shellfn::shell::{ARGUMENTS_KEY, STDERR, STDOUT};
use shellfn::{
    CancelToken, FileContent, FunctionDescriptor, Kwargs, MemoryStore, ProcessOutput,
    ProcessState, RecordKind, RunOptions, Runner, ShellfnError, Value, wrap,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

static INTEGRATION_TEST_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> std::sync::MutexGuard<'static, ()> {
    INTEGRATION_TEST_LOCK
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn command(name: &str) -> FunctionDescriptor {
    FunctionDescriptor::new(name).doc(format!("Run the `{}` command.", name))
}

fn arguments(args: &[&str]) -> Kwargs {
    Kwargs::new().with(ARGUMENTS_KEY, Value::list(args.iter().copied()))
}

fn lines_file() -> FileContent {
    FileContent::new("lines.txt", "line 0\nline 1\nline 2\n")
}

/// Scratch directory of a finished run, taken from the staged path at `index` in argv
fn scratch_dir(record: &shellfn::ExecutionRecord, index: usize) -> PathBuf {
    let recorded = record.attribute(ARGUMENTS_KEY).unwrap().as_array().unwrap();
    let staged = Path::new(recorded[index].as_str().unwrap());
    staged.parent().unwrap().to_path_buf()
}

/// Test a function that is just a command
#[test]
fn test_basic_command() {
    let _lock = lock();
    let date = wrap("date").build(command("date")).unwrap();

    let (result, record) = date
        .run_get_record(&Runner::default(), vec![], Kwargs::new())
        .unwrap();

    assert_eq!(result, ProcessOutput::Mapping(Default::default()));
    assert_eq!(record.kind(), RecordKind::Calculation);
    assert!(record.is_finished_ok());
    assert_eq!(record.blob_names(), vec![STDERR, STDOUT]);
    assert_eq!(record.blob_content(STDERR).as_deref(), Some(""));
    assert!(!record.blob_content(STDOUT).unwrap_or_default().is_empty());
}

/// Test that stdout is attached as an output when requested
#[test]
fn test_attach_stdout() {
    let _lock = lock();
    let date = wrap("date")
        .attach_stdout(true)
        .build(command("date"))
        .unwrap();

    let (result, record) = date
        .run_get_record(&Runner::default(), vec![], Kwargs::new())
        .unwrap();

    assert!(record.is_finished_ok());
    let outputs = result.as_mapping().unwrap();
    assert_eq!(outputs.keys().collect::<Vec<_>>(), vec![STDOUT]);
    let stdout = outputs[STDOUT].as_file().unwrap();
    assert_eq!(stdout.filename(), STDOUT);
    assert!(!stdout.is_empty());
    assert_eq!(record.blob_names(), vec![STDERR]);
}

/// Test literal command line arguments
#[test]
fn test_literal_arguments() {
    let _lock = lock();
    let echo = wrap("echo").build(command("echo")).unwrap();

    let (_, record) = echo
        .run_get_record(&Runner::default(), vec![], arguments(&["-n", "plain"]))
        .unwrap();

    assert!(record.is_finished_ok());
    assert_eq!(record.blob_content(STDOUT).as_deref(), Some("plain"));
}

/// Test placeholders interpolated from keyword file inputs
#[test]
fn test_keyword_arguments() {
    let _lock = lock();
    let cat = wrap("cat").build(command("cat")).unwrap();

    let kwargs = arguments(&["{file_a}", "{file_b}"])
        .with("file_a", FileContent::new("a.txt", "content_a\n"))
        .with("file_b", FileContent::new("b.txt", "content_b\n"));
    let (_, record) = cat
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert!(record.is_finished_ok());
    assert_eq!(
        record.blob_content(STDOUT).as_deref(),
        Some("content_a\ncontent_b\n")
    );
}

/// Test placeholders naming files without a filename of their own
#[test]
fn test_keyword_arguments_unnamed_files() {
    let _lock = lock();
    let cat = wrap("cat").build(command("cat")).unwrap();

    let kwargs = arguments(&["{file_a}", "{file_b}"])
        .with("file_a", FileContent::from_bytes("content_a\n"))
        .with("file_b", FileContent::from_bytes("content_b\n"));
    let (_, record) = cat
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert!(record.is_finished_ok());
    assert_eq!(
        record.blob_content(STDOUT).as_deref(),
        Some("content_a\ncontent_b\n")
    );
    let recorded = record.attribute(ARGUMENTS_KEY).unwrap().as_array().unwrap();
    assert!(recorded[1].as_str().unwrap().ends_with("/file_a"));
    assert!(recorded[2].as_str().unwrap().ends_with("/file_b"));
}

/// Test literal arguments mixed with a placeholder
#[test]
fn test_mixed_arguments() {
    let _lock = lock();
    let head = wrap("head").build(command("head")).unwrap();

    let kwargs = arguments(&["-n", "1", "{single_file}"])
        .with("single_file", FileContent::from_bytes("line 1\nline 2"));
    let (_, record) = head
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert!(record.is_finished_ok());
    assert_eq!(
        record.blob_content(STDOUT).map(|s| s.trim().to_string()),
        Some("line 1".to_string())
    );
}

/// Test files without a placeholder are appended to the command line
#[test]
fn test_unreferenced_files_are_appended() {
    let _lock = lock();
    let cat = wrap("cat").build(command("cat")).unwrap();

    let kwargs = Kwargs::new()
        .with("first", FileContent::new("1.txt", "one\n"))
        .with("second", FileContent::new("2.txt", "two\n"));
    let (_, record) = cat
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert_eq!(record.blob_content(STDOUT).as_deref(), Some("one\ntwo\n"));
}

/// Test output capture from the working directory by the post-processing body
#[test]
fn test_cwd_in_post_processing() {
    let _lock = lock();
    let descriptor = command("split").body(|ctx| {
        let cwd = ctx.cwd().ok_or_else(|| ShellfnError::Body("no cwd".to_string()))?;
        let mut outputs = shellfn::Outputs::new();
        for entry in std::fs::read_dir(cwd)? {
            let path = entry?.path();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if name.starts_with('x') {
                outputs.insert(name, Value::File(FileContent::from_path(&path)?));
            }
        }
        Ok(Some(ProcessOutput::Mapping(outputs)))
    });
    let split = wrap("split").build(descriptor).unwrap();

    let kwargs = arguments(&["-l", "1", "{single_file}"]).with("single_file", lines_file());
    let (result, record) = split
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert!(record.is_finished_ok());
    let outputs = result.as_mapping().unwrap();
    assert_eq!(outputs.keys().collect::<Vec<_>>(), vec!["xaa", "xab", "xac"]);
    for (index, value) in outputs.values().enumerate() {
        let file = value.as_file().unwrap();
        assert_eq!(file.text().trim(), format!("line {}", index));
    }
}

/// Test wildcard output capture by the engine
#[test]
fn test_output_filenames() {
    let _lock = lock();
    let split = wrap("split")
        .output_filenames(["x*"])
        .build(command("split"))
        .unwrap();

    let kwargs = arguments(&["-l", "1", "{single_file}"]).with("single_file", lines_file());
    let (result, record) = split
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert!(record.is_finished_ok());
    let outputs = result.as_mapping().unwrap();
    assert_eq!(outputs.keys().collect::<Vec<_>>(), vec!["xaa", "xab", "xac"]);
    for (index, key) in ["xaa", "xab", "xac"].iter().enumerate() {
        let file = outputs[*key].as_file().unwrap();
        assert_eq!(file.filename(), *key);
        assert_eq!(file.text().trim(), format!("line {}", index));
    }
    assert_eq!(record.outputs().len(), 3);
}

/// Test that a post-processing body returning a bare value yields a single result
#[test]
fn test_post_processing_single_value() {
    let _lock = lock();
    let descriptor = command("wc").body(|ctx| {
        let cwd = ctx.cwd().ok_or_else(|| ShellfnError::Body("no cwd".to_string()))?;
        let count = std::fs::read_dir(cwd)?.count() as i64;
        Ok(Some(ProcessOutput::Single(Value::Int(count))))
    });
    let wc = wrap("wc").build(descriptor).unwrap();

    let kwargs = arguments(&["-l", "{f}"]).with("f", lines_file());
    let (result, record) = wc
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert_eq!(result, ProcessOutput::Single(Value::Int(1)));
    assert_eq!(record.output(SINGLE_OUTPUT_KEY), Some(&Value::Int(1)));
}

/// Test a command that cannot be found
#[test]
fn test_error_command_not_found() {
    let _lock = lock();
    let unknown = wrap("unknown-command").build(command("unknown")).unwrap();

    let (_, record) = unknown
        .run_get_record(&Runner::default(), vec![], Kwargs::new())
        .unwrap();

    assert!(record.is_failed());
    assert_eq!(record.exit_status(), Some(250));
    assert_eq!(
        record.exit_message(),
        Some("The command `unknown-command` was not found.")
    );
}

/// Test that a non-zero exit status fails the record
#[test]
fn test_error_command_failed() {
    let _lock = lock();
    let tar = wrap("tar").build(command("tar")).unwrap();

    let (_, record) = tar
        .run_get_record(&Runner::default(), vec![], Kwargs::new())
        .unwrap();

    assert!(record.is_failed());
    assert_eq!(record.exit_status(), Some(251));
    assert!(record
        .exit_message()
        .unwrap_or_default()
        .starts_with("The command returned a non-zero exit code: "));
    assert!(!record.blob_content(STDERR).unwrap_or_default().is_empty());
}

/// Test that attached stdout and the stderr blob survive a failing command
#[test]
fn test_attach_stdout_with_failing_command() {
    let _lock = lock();
    let sh = wrap("sh").attach_stdout(true).build(command("sh")).unwrap();

    let kwargs = arguments(&["-c", "echo out; echo err >&2; exit 3"]);
    let (result, record) = sh
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert!(record.is_failed());
    assert_eq!(record.exit_status(), Some(251));
    assert_eq!(
        record.exit_message(),
        Some("The command returned a non-zero exit code: 3.")
    );
    let stdout = result.as_mapping().unwrap()[STDOUT].as_file().unwrap();
    assert_eq!(stdout.text(), "out\n");
    assert_eq!(record.blob_names(), vec![STDERR]);
    assert_eq!(record.blob_content(STDERR).as_deref(), Some("err\n"));
}

/// Test that the scratch directory is removed after a failing command
#[test]
fn test_scratch_removed_after_command_failed() {
    let _lock = lock();
    let sh = wrap("sh").build(command("sh")).unwrap();

    let kwargs = arguments(&["-c", "exit 3", "{f}"]).with("f", FileContent::from_bytes("x"));
    let (_, record) = sh
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert_eq!(record.exit_status(), Some(251));
    let scratch = scratch_dir(&record, 3);
    assert!(scratch.file_name().unwrap().to_string_lossy().starts_with("shellfn-"));
    assert!(!scratch.exists());
}

/// Test that the scratch directory is removed after missing outputs
#[test]
fn test_scratch_removed_after_missing_output_files() {
    let _lock = lock();
    let touch = wrap("touch")
        .output_filenames(["absent.txt"])
        .build(command("touch"))
        .unwrap();

    let kwargs = arguments(&["{f}"]).with("f", FileContent::from_bytes(""));
    let (_, record) = touch
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert_eq!(record.exit_status(), Some(252));
    let scratch = scratch_dir(&record, 1);
    assert!(scratch.file_name().unwrap().to_string_lossy().starts_with("shellfn-"));
    assert!(!scratch.exists());
}

/// Test that a failing command pre-empts missing outputs
#[test]
fn test_command_failed_before_missing_outputs() {
    let _lock = lock();
    let ls = wrap("ls")
        .output_filenames(["never.txt"])
        .build(command("ls"))
        .unwrap();

    let (_, record) = ls
        .run_get_record(&Runner::default(), vec![], arguments(&["does-not-exist"]))
        .unwrap();

    assert_eq!(record.exit_status(), Some(251));
}

/// Test missing declared outputs
#[test]
fn test_error_missing_output_files() {
    let _lock = lock();
    let touch = wrap("touch")
        .output_filenames(["made.txt", "absent.txt", "*.log"])
        .build(command("touch"))
        .unwrap();

    let (result, record) = touch
        .run_get_record(&Runner::default(), vec![], arguments(&["made.txt"]))
        .unwrap();

    assert!(record.is_failed());
    assert_eq!(record.exit_status(), Some(252));
    assert_eq!(
        record.exit_message(),
        Some("The command did not produce all declared output files: absent.txt, *.log.")
    );
    assert!(result.as_mapping().unwrap().contains_key("made_txt"));
}

/// Test that input files given the same filename are rejected before running
#[test]
fn test_colliding_input_files_rejected() {
    let _lock = lock();
    let cat = wrap("cat").build(command("cat")).unwrap();

    let kwargs = arguments(&["{file_a}", "{file_b}"])
        .with("file_a", FileContent::new("same.txt", "a"))
        .with("file_b", FileContent::new("same.txt", "b"));
    let err = cat.call(&Runner::default(), vec![], kwargs).unwrap_err();

    assert!(err.is_configuration_error());
}

/// Test that positional arguments beyond the declared slots are rejected
#[test]
fn test_too_many_positional_arguments() {
    let _lock = lock();
    let date = wrap("date").build(command("date")).unwrap();

    let err = date
        .call(&Runner::default(), vec![Value::Int(1)], Kwargs::new())
        .unwrap_err();

    assert!(err.is_configuration_error());
}

/// Test declared positional parameters alongside file keywords
#[test]
fn test_declared_parameters_are_not_staged() {
    let _lock = lock();
    let descriptor = command("cat")
        .param_with_default("suffix", Value::from(".bak"))
        .body(|ctx| {
            let suffix = ctx.get("suffix").and_then(Value::as_str).unwrap_or_default();
            Ok(Some(ProcessOutput::Single(Value::from(suffix))))
        });
    let cat = wrap("cat").build(descriptor).unwrap();

    let kwargs = Kwargs::new().with("f", FileContent::new("f.txt", "x"));
    let (result, record) = cat
        .run_get_record(&Runner::default(), vec![], kwargs)
        .unwrap();

    assert_eq!(result, ProcessOutput::Single(Value::from(".bak")));
    assert_eq!(record.blob_content(STDOUT).as_deref(), Some("x"));
}

/// Test explicit cancellation of a long running command
#[test]
fn test_cancelled_command_is_killed() {
    let _lock = lock();
    let sleep = wrap("sleep").build(command("sleep")).unwrap();

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        trigger.cancel();
    });
    let options = RunOptions {
        cancel: Some(cancel),
        ..Default::default()
    };

    let started = Instant::now();
    let (result, record) = sleep
        .launch(&Runner::default(), &options, vec![], arguments(&["10"]))
        .unwrap();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(record.state(), ProcessState::Killed);
    assert_eq!(
        record.exit_message(),
        Some("Process was killed because the runner received an interrupt")
    );
    assert_eq!(result, ProcessOutput::Mapping(Default::default()));
}

/// Test that records reach the runner's store unless provenance is disabled
#[test]
fn test_record_store() {
    let _lock = lock();
    let store = Arc::new(MemoryStore::new());
    let runner = Runner::local(store.clone());
    let date = wrap("date").build(command("date")).unwrap();

    let (_, id) = date.run_get_id(&runner, vec![], Kwargs::new()).unwrap();
    let stored = store.get(id).unwrap();
    assert!(stored.is_finished_ok());
    assert_eq!(stored.description(), Some("Run the `date` command."));

    let options = RunOptions {
        store_provenance: false,
        ..Default::default()
    };
    let (_, record) = date
        .launch(&runner, &options, vec![], Kwargs::new())
        .unwrap();
    assert!(!record.is_storable());
    assert_eq!(store.len(), 1);
}

/// Test the JSON summary of a shell record
#[test]
fn test_record_summary() {
    let _lock = lock();
    let echo = wrap("echo").build(command("echo")).unwrap();

    let (_, record) = echo
        .run_get_record(&Runner::default(), vec![], arguments(&["hi"]))
        .unwrap();
    let summary = record.summary();

    assert_eq!(summary["state"], "finished");
    assert_eq!(summary["exit_status"], 0);
    assert_eq!(summary["blobs"][STDOUT], 3);
    assert_eq!(summary["attributes"][ARGUMENTS_KEY][1], "hi");
}
