use contaiman::error::{LaunchError, ProcessError, RunError};
use contaiman::infra::runner::{Outcome, RelayPolicy, RunnerSettings};
use contaiman::{CancelToken, CommandRunner, Execution, OutputSink};
use std::io;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn runner() -> CommandRunner {
    CommandRunner::new(RunnerSettings {
        inherit_stdin: false,
        ..RunnerSettings::default()
    })
}

fn run(runner: &CommandRunner, command_line: &str) -> Execution {
    let mut exec = Execution::new(command_line);
    runner
        .run(command_line, &mut exec, &CancelToken::new())
        .unwrap();
    exec
}

/// Records every callback so tests can check the delivery contract.
#[derive(Default)]
struct RecordingSink {
    chunks: Vec<Vec<u8>>,
    completions: Vec<Outcome>,
    reject_after: Option<usize>,
}

impl OutputSink for RecordingSink {
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.reject_after.is_some_and(|n| self.chunks.len() >= n) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "consumer gone"));
        }
        self.chunks.push(chunk.to_vec());
        Ok(())
    }

    fn on_complete(&mut self, outcome: Outcome) {
        self.completions.push(outcome);
    }
}

#[test]
fn test_echo_hello() {
    let exec = run(&runner(), "echo hello");

    assert!(exec.succeeded());
    assert_eq!(exec.output_lossy(), "hello\n");
}

#[test]
fn test_non_zero_exit_keeps_output() {
    let exec = run(&runner(), "echo partial; exit 3");

    assert_eq!(exec.output_lossy(), "partial\n");
    assert!(matches!(
        exec.error(),
        Some(RunError::Process(ProcessError::Exited { code: 3 }))
    ));
}

#[test]
fn test_killed_by_signal() {
    let exec = run(&runner(), "kill -9 $$");

    assert!(matches!(
        exec.error(),
        Some(RunError::Process(ProcessError::Signaled { signal: 9 }))
    ));
}

#[test]
fn test_stdout_and_stderr_are_merged_in_order() {
    let exec = run(&runner(), "echo one; echo two 1>&2; echo three");

    assert!(exec.succeeded());
    assert_eq!(exec.output_lossy(), "one\ntwo\nthree\n");
}

#[test]
fn test_large_output_arrives_complete_and_ordered() {
    let exec = run(
        &runner(),
        "i=0; while [ $i -lt 5000 ]; do echo line$i; i=$((i+1)); done",
    );

    let expected: String = (0..5000).map(|i| format!("line{i}\n")).collect();
    assert!(exec.succeeded());
    assert_eq!(exec.output_lossy(), expected);
}

#[test]
fn test_small_chunk_size_splits_output() {
    let runner = CommandRunner::new(RunnerSettings {
        inherit_stdin: false,
        chunk_size: 4,
        ..RunnerSettings::default()
    });

    let exec = run(&runner, "printf 'abcdefghij'");

    assert!(exec.chunks().len() >= 3);
    assert!(exec.chunks().iter().all(|c| c.len() <= 4));
    assert_eq!(exec.output_lossy(), "abcdefghij");
}

#[test]
fn test_stdin_is_closed_when_not_inherited() {
    let exec = run(&runner(), "cat; echo done");

    assert!(exec.succeeded());
    assert_eq!(exec.output_lossy(), "done\n");
}

#[test]
fn test_empty_command_is_a_launch_error() {
    let mut completed = false;
    let result = runner().run_with(
        "   ",
        &CancelToken::new(),
        |_| Ok(()),
        |_| completed = true,
    );

    assert!(matches!(result, Err(LaunchError::EmptyCommand)));
    assert!(!completed, "on_complete não deve ser chamado");
}

#[test]
fn test_missing_shell_is_a_launch_error() {
    let runner = CommandRunner::new(RunnerSettings {
        shell: "/nonexistent/shell".into(),
        ..RunnerSettings::default()
    });
    let mut sink = RecordingSink::default();

    let result = runner.run("echo hi", &mut sink, &CancelToken::new());

    assert!(matches!(result, Err(LaunchError::Spawn { .. })));
    assert!(sink.completions.is_empty());
    assert!(sink.chunks.is_empty());
}

#[test]
fn test_cancel_stops_long_running_command() {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        trigger.cancel();
    });

    let mut sink = RecordingSink::default();
    let start = Instant::now();
    runner()
        .run("echo started; sleep 30", &mut sink, &cancel)
        .unwrap();
    canceller.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(sink.chunks.concat(), b"started\n");
    assert_eq!(sink.completions.len(), 1);
    assert!(matches!(
        sink.completions[0],
        Err(RunError::Process(ProcessError::Cancelled))
    ));
}

#[test]
fn test_cancel_reaches_background_children() {
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        trigger.cancel();
    });

    let start = Instant::now();
    let mut exec = Execution::new("bg");
    runner()
        .run("sleep 30 & sleep 30 & wait", &mut exec, &cancel)
        .unwrap();
    canceller.join().unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(matches!(
        exec.error(),
        Some(RunError::Process(ProcessError::Cancelled))
    ));
}

#[test]
fn test_cancel_before_start_still_reports_once() {
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut sink = RecordingSink::default();
    runner().run("sleep 30", &mut sink, &cancel).unwrap();

    assert_eq!(sink.completions.len(), 1);
    assert!(matches!(
        sink.completions[0],
        Err(RunError::Process(ProcessError::Cancelled))
    ));
}

#[test]
fn test_timeout_kills_command() {
    let runner = CommandRunner::new(RunnerSettings {
        inherit_stdin: false,
        timeout: Some(Duration::from_millis(300)),
        ..RunnerSettings::default()
    });

    let start = Instant::now();
    let exec = run(&runner, "sleep 30");

    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(matches!(
        exec.error(),
        Some(RunError::Process(ProcessError::TimedOut { .. }))
    ));
}

#[test]
fn test_fast_command_beats_timeout() {
    let runner = CommandRunner::new(RunnerSettings {
        inherit_stdin: false,
        timeout: Some(Duration::from_secs(10)),
        ..RunnerSettings::default()
    });

    assert!(run(&runner, "echo quick").succeeded());
}

#[test]
fn test_relay_failure_terminates_by_default() {
    let mut sink = RecordingSink {
        reject_after: Some(0),
        ..RecordingSink::default()
    };

    let start = Instant::now();
    runner()
        .run("echo first; sleep 30; echo never", &mut sink, &CancelToken::new())
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(sink.chunks.is_empty());
    assert_eq!(sink.completions.len(), 1);
    assert!(matches!(sink.completions[0], Err(RunError::Relay(_))));
}

#[test]
fn test_relay_failure_with_detach_lets_process_finish() {
    let runner = CommandRunner::new(RunnerSettings {
        inherit_stdin: false,
        relay_policy: RelayPolicy::Detach,
        ..RunnerSettings::default()
    });
    let mut sink = RecordingSink {
        reject_after: Some(1),
        ..RecordingSink::default()
    };

    let start = Instant::now();
    runner
        .run(
            "echo first; sleep 1; echo second; sleep 1; echo third",
            &mut sink,
            &CancelToken::new(),
        )
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(sink.chunks, vec![b"first\n".to_vec()]);
    assert_eq!(sink.completions.len(), 1);
    assert!(matches!(sink.completions[0], Err(RunError::Relay(_))));
}

#[test]
fn test_closure_callbacks() {
    let mut output = Vec::new();
    let mut outcome = None;

    runner()
        .run_with(
            "printf 'a'; printf 'b' 1>&2",
            &CancelToken::new(),
            |chunk| {
                output.extend_from_slice(chunk);
                Ok(())
            },
            |result| outcome = Some(result),
        )
        .unwrap();

    assert_eq!(output, b"ab");
    assert!(matches!(outcome, Some(Ok(()))));
}

fn has_script() -> bool {
    Command::new("script")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

#[test]
fn test_exec_reads_from_inherited_terminal() {
    // util-linux `script` provides the pty
    if !has_script() {
        return;
    }

    let config_dir = tempfile::tempdir().unwrap();
    let command_line = format!(
        r#"(sleep 1; echo typed) | CONTAIMAN_CONFIG_DIR='{}' script -qec "'{}' exec 'read x; echo got:\$x'" /dev/null"#,
        config_dir.path().display(),
        env!("CARGO_BIN_EXE_contaiman"),
    );
    let runner = CommandRunner::new(RunnerSettings {
        inherit_stdin: false,
        timeout: Some(Duration::from_secs(15)),
        ..RunnerSettings::default()
    });

    let exec = run(&runner, &command_line);

    assert!(
        exec.succeeded(),
        "exec travou ou falhou: {:?}\n{}",
        exec.error(),
        exec.output_lossy()
    );
    assert!(exec.output_lossy().contains("got:typed"));
}
