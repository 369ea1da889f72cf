//! Runs a shell command line and streams its merged output.
//!
//! stdout and stderr share a single pipe, so chunks reach the sink in the
//! order the kernel delivered them. A reader thread forwards chunks over a
//! channel; the calling thread delivers them, watches the cancel token and
//! the deadline, and reports the outcome exactly once.

use crate::error::{LaunchError, ProcessError, RelayError, RunError};
use nix::sys::signal::{SigSet, SigmaskHow, Signal, killpg, pthread_sigmask};
use nix::unistd::{Pid, getpgrp, tcgetpgrp, tcsetpgrp};
use serde::Deserialize;
use std::io::{self, IsTerminal, Read, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long to keep draining output after the process group was killed.
const KILL_GRACE: Duration = Duration::from_secs(2);
const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

pub type Outcome = Result<(), RunError>;

/// Consumer of a running command's output.
pub trait OutputSink {
    /// Receives the next chunk. An error stops further relaying.
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Called once, after the last chunk.
    fn on_complete(&mut self, outcome: Outcome);
}

/// What to do with the process when the sink rejects a chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayPolicy {
    /// Kill the process group
    #[default]
    Terminate,
    /// Let the process finish and discard its remaining output
    Detach,
}

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub shell: String,
    pub inherit_stdin: bool,
    pub timeout: Option<Duration>,
    pub relay_policy: RelayPolicy,
    pub chunk_size: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            inherit_stdin: true,
            timeout: None,
            relay_policy: RelayPolicy::Terminate,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

enum ReadEvent {
    Chunk(Vec<u8>),
    Failed(io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Cancelled,
    TimedOut,
    Relay,
}

/// What happened while output was being pumped.
#[derive(Debug, Default)]
struct Pumped {
    stop: Option<StopReason>,
    relay_error: Option<io::Error>,
    read_error: Option<io::Error>,
    /// The pipe reached EOF
    drained: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    settings: RunnerSettings,
}

impl CommandRunner {
    pub fn new(settings: RunnerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Closure flavor of [`CommandRunner::run`].
    pub fn run_with<C, F>(
        &self,
        command_line: &str,
        cancel: &CancelToken,
        on_chunk: C,
        on_complete: F,
    ) -> Result<(), LaunchError>
    where
        C: FnMut(&[u8]) -> io::Result<()>,
        F: FnOnce(Outcome),
    {
        let mut sink = FnSink {
            on_chunk,
            on_complete: Some(on_complete),
        };
        self.run(command_line, &mut sink, cancel)
    }

    /// Runs `command_line` through the shell.
    ///
    /// Returns `Err` only when the process could not be started; in that case
    /// `sink.on_complete` is never called. Otherwise the outcome, including
    /// non-zero exits, cancellation and relay failures, goes to the sink.
    pub fn run(
        &self,
        command_line: &str,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Result<(), LaunchError> {
        if command_line.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        let (mut reader, writer) = io::pipe().map_err(LaunchError::Pipe)?;
        let stderr_writer = writer.try_clone().map_err(LaunchError::Pipe)?;

        let mut command = Command::new(&self.settings.shell);
        command
            .arg("-c")
            .arg(command_line)
            .stdout(writer)
            .stderr(stderr_writer)
            .stdin(if self.settings.inherit_stdin {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .process_group(0);

        let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
            shell: self.settings.shell.clone(),
            source,
        })?;
        // Close our copies of the write end so the reader sees EOF.
        drop(command);

        // The child is not in our process group, so it needs the terminal
        // foreground to read from it.
        let foreground = if self.settings.inherit_stdin {
            Foreground::hand_over(Pid::from_raw(child.id() as i32))
        } else {
            None
        };

        info!("Executando: {command_line}");

        let (tx, rx) = mpsc::channel();
        let chunk_size = self.settings.chunk_size.max(1);
        let reader_thread = thread::spawn(move || {
            let mut buf = vec![0u8; chunk_size];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(ReadEvent::Chunk(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.send(ReadEvent::Failed(e));
                        break;
                    }
                }
            }
        });

        let pumped = self.pump(&rx, &mut child, sink, cancel);

        if pumped.drained {
            let _ = reader_thread.join();
        } else {
            warn!("Saída do processo não foi encerrada após o kill; abandonando leitor");
        }

        let outcome = match child.wait() {
            Err(e) => Err(ProcessError::Wait(e).into()),
            Ok(status) => self.outcome(status, pumped),
        };
        drop(foreground);

        match &outcome {
            Ok(()) => debug!("Comando concluído com sucesso"),
            Err(e) => debug!("Comando terminou com falha: {e}"),
        }

        sink.on_complete(outcome);
        Ok(())
    }

    /// Delivers chunks until EOF or until a stopped process outlives the
    /// kill grace period.
    fn pump(
        &self,
        rx: &Receiver<ReadEvent>,
        child: &mut Child,
        sink: &mut dyn OutputSink,
        cancel: &CancelToken,
    ) -> Pumped {
        let deadline = self.settings.timeout.map(|t| Instant::now() + t);
        let mut pumped = Pumped::default();
        let mut killed_at: Option<Instant> = None;

        loop {
            let wait = match deadline {
                Some(d) if pumped.stop.is_none() => d
                    .saturating_duration_since(Instant::now())
                    .min(POLL_INTERVAL),
                _ => POLL_INTERVAL,
            };

            match rx.recv_timeout(wait) {
                Ok(ReadEvent::Chunk(chunk)) => {
                    if pumped.relay_error.is_some() {
                        continue;
                    }
                    if let Err(e) = sink.on_chunk(&chunk) {
                        warn!("Falha ao repassar saída: {e}");
                        pumped.relay_error = Some(e);
                        if self.settings.relay_policy == RelayPolicy::Terminate
                            && pumped.stop.is_none()
                        {
                            pumped.stop = Some(StopReason::Relay);
                            terminate(child);
                            killed_at = Some(Instant::now());
                        }
                    }
                }
                Ok(ReadEvent::Failed(e)) => {
                    warn!("Falha ao ler saída do processo: {e}");
                    pumped.read_error = Some(e);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    pumped.drained = true;
                    return pumped;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if pumped.stop.is_none() {
                if cancel.is_cancelled() {
                    info!("Cancelando processo");
                    pumped.stop = Some(StopReason::Cancelled);
                } else if deadline.is_some_and(|d| Instant::now() >= d) {
                    warn!("Tempo limite atingido; encerrando processo");
                    pumped.stop = Some(StopReason::TimedOut);
                }

                if pumped.stop.is_some() {
                    terminate(child);
                    killed_at = Some(Instant::now());
                }
            }

            if killed_at.is_some_and(|at| at.elapsed() >= KILL_GRACE) {
                return pumped;
            }
        }
    }

    /// Cancellation and timeout win over relay failures, which win over read
    /// failures and the exit status.
    fn outcome(&self, status: ExitStatus, pumped: Pumped) -> Outcome {
        match pumped.stop {
            Some(StopReason::Cancelled) => return Err(ProcessError::Cancelled.into()),
            Some(StopReason::TimedOut) => {
                return Err(ProcessError::TimedOut {
                    after: self.settings.timeout.unwrap_or_default(),
                }
                .into());
            }
            _ => {}
        }

        if let Some(source) = pumped.relay_error {
            return Err(RelayError { source }.into());
        }

        if let Some(e) = pumped.read_error {
            return Err(ProcessError::Read(e).into());
        }

        if status.success() {
            return Ok(());
        }

        match (status.code(), status.signal()) {
            (Some(code), _) => Err(ProcessError::Exited { code }.into()),
            (None, Some(signal)) => Err(ProcessError::Signaled { signal }.into()),
            (None, None) => Err(ProcessError::Exited { code: -1 }.into()),
        }
    }
}

/// Kills the whole process group so grandchildren release the pipe too.
fn terminate(child: &mut Child) {
    let pid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pid, Signal::SIGKILL) {
        debug!("killpg falhou ({e}); matando apenas o processo");
        let _ = child.kill();
    }
}

/// Gives the controlling terminal to the child's process group and takes it
/// back on drop.
///
/// SIGTTOU stays blocked on the calling thread meanwhile: it writes mirrored
/// output from the background and must take the terminal back from there.
struct Foreground {
    previous: Pid,
    saved_mask: SigSet,
}

impl Foreground {
    fn hand_over(group: Pid) -> Option<Self> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return None;
        }

        // Running as a background job: the terminal is not ours to give.
        let previous = tcgetpgrp(&stdin).ok()?;
        if previous != getpgrp() {
            return None;
        }

        let mut ttou = SigSet::empty();
        ttou.add(Signal::SIGTTOU);
        let mut saved_mask = SigSet::empty();
        if let Err(e) = pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&ttou), Some(&mut saved_mask))
        {
            debug!("pthread_sigmask falhou ({e}); processo segue sem o terminal");
            return None;
        }

        if let Err(e) = tcsetpgrp(&stdin, group) {
            debug!("tcsetpgrp falhou ({e}); processo segue sem o terminal");
            let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&saved_mask), None);
            return None;
        }

        // A read issued before the handover stopped the group with SIGTTIN.
        let _ = killpg(group, Signal::SIGCONT);
        Some(Self {
            previous,
            saved_mask,
        })
    }
}

impl Drop for Foreground {
    fn drop(&mut self) {
        if let Err(e) = tcsetpgrp(io::stdin(), self.previous) {
            warn!("Não foi possível recuperar o terminal: {e}");
        }
        let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.saved_mask), None);
    }
}

struct FnSink<C, F> {
    on_chunk: C,
    on_complete: Option<F>,
}

impl<C, F> OutputSink for FnSink<C, F>
where
    C: FnMut(&[u8]) -> io::Result<()>,
    F: FnOnce(Outcome),
{
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        (self.on_chunk)(chunk)
    }

    fn on_complete(&mut self, outcome: Outcome) {
        if let Some(f) = self.on_complete.take() {
            f(outcome);
        }
    }
}

#[derive(Debug)]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed(RunError),
}

/// One run of a command line: its output and terminal status.
#[derive(Debug)]
pub struct Execution {
    command: String,
    chunks: Vec<Vec<u8>>,
    status: ExecutionStatus,
}

impl Execution {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            chunks: Vec::new(),
            status: ExecutionStatus::Running,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    pub fn status(&self) -> &ExecutionStatus {
        &self.status
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.status, ExecutionStatus::Running)
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, ExecutionStatus::Succeeded)
    }

    pub fn error(&self) -> Option<&RunError> {
        match &self.status {
            ExecutionStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// All output in emission order.
    pub fn output(&self) -> Vec<u8> {
        self.chunks.concat()
    }

    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output()).into_owned()
    }
}

impl OutputSink for Execution {
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.is_finished() {
            return Err(io::Error::other("execução já finalizada"));
        }
        self.chunks.push(chunk.to_vec());
        Ok(())
    }

    fn on_complete(&mut self, outcome: Outcome) {
        if self.is_finished() {
            warn!("Conclusão duplicada ignorada para '{}'", self.command);
            return;
        }
        self.status = match outcome {
            Ok(()) => ExecutionStatus::Succeeded,
            Err(e) => ExecutionStatus::Failed(e),
        };
    }
}

/// Mirrors every chunk to a writer before handing it to the inner sink.
pub struct Tee<W, S> {
    mirror: W,
    inner: S,
}

impl<W: Write, S: OutputSink> Tee<W, S> {
    pub fn new(mirror: W, inner: S) -> Self {
        Self { mirror, inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<W: Write, S: OutputSink> OutputSink for Tee<W, S> {
    fn on_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.mirror.write_all(chunk)?;
        self.mirror.flush()?;
        self.inner.on_chunk(chunk)
    }

    fn on_complete(&mut self, outcome: Outcome) {
        self.inner.on_complete(outcome);
    }
}

/// Which Podman service to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonScope {
    User,
    System,
}

impl DaemonScope {
    pub fn start_command(&self) -> &'static str {
        match self {
            Self::User => "systemctl start --user podman",
            Self::System => "systemctl start podman",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_single_terminal_transition() {
        let mut exec = Execution::new("echo hi");
        exec.on_chunk(b"hi\n").unwrap();
        assert!(!exec.is_finished());

        exec.on_complete(Ok(()));
        assert!(exec.succeeded());

        exec.on_complete(Err(ProcessError::Cancelled.into()));
        assert!(exec.succeeded(), "status terminal não pode mudar");
        assert!(exec.on_chunk(b"late").is_err());
        assert_eq!(exec.output(), b"hi\n");
    }

    #[test]
    fn test_execution_keeps_chunk_order() {
        let mut exec = Execution::new("x");
        for chunk in [&b"a"[..], b"bc", b"", b"d"] {
            exec.on_chunk(chunk).unwrap();
        }
        assert_eq!(exec.chunks().len(), 4);
        assert_eq!(exec.output_lossy(), "abcd");
    }

    #[test]
    fn test_tee_mirrors_before_inner() {
        let mut tee = Tee::new(Vec::new(), Execution::new("x"));
        tee.on_chunk(b"out").unwrap();
        tee.on_complete(Ok(()));
        let Tee { mirror, inner } = tee;
        assert_eq!(mirror, b"out");
        assert!(inner.succeeded());
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_daemon_start_commands() {
        assert_eq!(DaemonScope::User.start_command(), "systemctl start --user podman");
        assert_eq!(DaemonScope::System.start_command(), "systemctl start podman");
    }

    #[test]
    fn test_read_failure_is_a_process_error() {
        let runner = CommandRunner::default();
        let pumped = Pumped {
            read_error: Some(io::Error::other("EIO")),
            drained: true,
            ..Pumped::default()
        };

        let outcome = runner.outcome(ExitStatus::from_raw(0), pumped);
        assert!(matches!(
            outcome,
            Err(RunError::Process(ProcessError::Read(_)))
        ));
    }

    #[test]
    fn test_relay_failure_wins_over_read_failure() {
        let runner = CommandRunner::default();
        let pumped = Pumped {
            relay_error: Some(io::Error::other("consumer gone")),
            read_error: Some(io::Error::other("EIO")),
            ..Pumped::default()
        };

        let outcome = runner.outcome(ExitStatus::from_raw(0), pumped);
        assert!(matches!(outcome, Err(RunError::Relay(_))));
    }

    #[test]
    fn test_relay_policy_from_config() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: RelayPolicy,
        }
        let w: Wrapper = toml::from_str("policy = \"detach\"").unwrap();
        assert_eq!(w.policy, RelayPolicy::Detach);
    }
}
