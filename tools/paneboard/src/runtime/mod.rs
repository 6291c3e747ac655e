use crate::errors::BoardError;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

const TIMEOUT_POLL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
    pub shell: String,
    pub timeout: Option<Duration>,
}

/// Result of one shell execution. `output` holds stdout and stderr interleaved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub output: String,
    pub timed_out: bool,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

pub trait CommandRunner: Send + Sync {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput, BoardError>;
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, BoardError>;
    fn write_string(&self, path: &Path, contents: &str) -> Result<(), BoardError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), BoardError>;
    fn modified(&self, path: &Path) -> Option<SystemTime>;
    fn exists(&self, path: &Path) -> bool;
}

pub struct ProductionClock;

impl Clock for ProductionClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, BoardError> {
        std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BoardError::NotFound(path.display().to_string()),
            _ => BoardError::Io(e.to_string()),
        })
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), BoardError> {
        std::fs::write(path, contents).map_err(|e| BoardError::Io(e.to_string()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), BoardError> {
        std::fs::create_dir_all(path).map_err(|e| BoardError::Io(e.to_string()))
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).ok()?.modified().ok()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Runs pane commands through `<shell> -c`, folding stderr into stdout.
#[derive(Debug, Default)]
pub struct ProductionCommandRunner;

impl CommandRunner for ProductionCommandRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput, BoardError> {
        let mut child = std::process::Command::new(&request.shell)
            .arg("-c")
            .arg(format!("exec 2>&1\n{}", request.command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BoardError::Process(format!("{}: {e}", request.shell)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| BoardError::Process("stdout was not captured".to_string()))?;
        let captured = Arc::new(Mutex::new(Vec::<u8>::new()));
        let sink = Arc::clone(&captured);
        let reader = std::thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match stdout.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
            }
        });

        let (status, timed_out) = match request.timeout {
            None => (
                Some(
                    child
                        .wait()
                        .map_err(|e| BoardError::Process(e.to_string()))?,
                ),
                false,
            ),
            Some(limit) => wait_with_deadline(&mut child, limit)?,
        };
        // A killed shell can leave grandchildren holding the pipe open, so only
        // a clean exit waits for the reader to drain.
        if !timed_out {
            let _ = reader.join();
        }

        let bytes = captured.lock().map(|buf| buf.clone()).unwrap_or_default();
        Ok(CommandOutput {
            exit_code: status.and_then(|status| status.code()),
            output: String::from_utf8_lossy(&bytes).trim_end().to_string(),
            timed_out,
        })
    }
}

fn wait_with_deadline(
    child: &mut Child,
    limit: Duration,
) -> Result<(Option<ExitStatus>, bool), BoardError> {
    let started = Instant::now();
    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|e| BoardError::Process(e.to_string()))?
        {
            return Ok((Some(status), false));
        }
        if started.elapsed() >= limit {
            let _ = child.kill();
            let _ = child.wait();
            return Ok((None, true));
        }
        std::thread::sleep(TIMEOUT_POLL);
    }
}

pub struct ProductionRuntime {
    pub clock: Arc<dyn Clock>,
    pub file_system: Arc<dyn FileSystem>,
    pub command_runner: Arc<dyn CommandRunner>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(ProductionClock),
            file_system: Arc::new(ProductionFileSystem),
            command_runner: Arc::new(ProductionCommandRunner),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<SystemTime>>,
}

impl FakeClock {
    pub fn new(now: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().expect("clock lock")
    }
}

/// In-memory file system; write timestamps come from the shared clock.
#[derive(Clone)]
pub struct FakeFileSystem {
    clock: Arc<dyn Clock>,
    files: Arc<Mutex<HashMap<PathBuf, (String, SystemTime)>>>,
    dirs: Arc<Mutex<Vec<PathBuf>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl FakeFileSystem {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            files: Arc::new(Mutex::new(HashMap::new())),
            dirs: Arc::new(Mutex::new(Vec::new())),
            fail_writes: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().expect("fail lock") = fail;
    }

    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().expect("dirs lock").clone()
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, BoardError> {
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .map(|(contents, _)| contents.clone())
            .ok_or_else(|| BoardError::NotFound(path.display().to_string()))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), BoardError> {
        if *self.fail_writes.lock().expect("fail lock") {
            return Err(BoardError::Io(format!("read-only: {}", path.display())));
        }
        self.files
            .lock()
            .expect("files lock")
            .insert(path.to_path_buf(), (contents.to_string(), self.clock.now()));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), BoardError> {
        if *self.fail_writes.lock().expect("fail lock") {
            return Err(BoardError::Io(format!("read-only: {}", path.display())));
        }
        self.dirs.lock().expect("dirs lock").push(path.to_path_buf());
        Ok(())
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .map(|(_, modified)| *modified)
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().expect("files lock").contains_key(path)
    }
}

/// Canned outputs keyed by command string; every call is recorded.
#[derive(Default, Clone)]
pub struct FakeCommandRunner {
    responses: Arc<Mutex<HashMap<String, CommandOutput>>>,
    calls: Arc<Mutex<Vec<CommandRequest>>>,
}

impl FakeCommandRunner {
    pub fn respond(&self, command: &str, output: CommandOutput) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(command.to_string(), output);
    }

    pub fn respond_ok(&self, command: &str, text: &str) {
        self.respond(
            command,
            CommandOutput {
                exit_code: Some(0),
                output: text.to_string(),
                timed_out: false,
            },
        );
    }

    pub fn calls(&self) -> Vec<CommandRequest> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|request| request.command == command)
            .count()
    }
}

impl CommandRunner for FakeCommandRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput, BoardError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(request.clone());
        self.responses
            .lock()
            .expect("responses lock")
            .get(&request.command)
            .cloned()
            .ok_or_else(|| BoardError::Process(format!("{}: command not found", request.command)))
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandRequest, CommandRunner, ProductionCommandRunner};
    use std::time::Duration;

    fn request(command: &str, timeout: Option<Duration>) -> CommandRequest {
        CommandRequest {
            command: command.to_string(),
            shell: "sh".to_string(),
            timeout,
        }
    }

    #[test]
    fn production_runner_merges_stderr_into_output() {
        let runner = ProductionCommandRunner::default();
        let out = runner
            .run(&request("echo out; echo err 1>&2", None))
            .expect("run");
        assert_eq!(out.exit_code, Some(0));
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
        assert!(!out.timed_out);
    }

    #[test]
    fn production_runner_reports_non_zero_exit_without_error() {
        let runner = ProductionCommandRunner::default();
        let out = runner.run(&request("false", None)).expect("run");
        assert_eq!(out.exit_code, Some(1));
        assert_eq!(out.output, "");
    }

    #[test]
    fn production_runner_kills_command_after_timeout() {
        let runner = ProductionCommandRunner::default();
        let out = runner
            .run(&request("echo started; exec sleep 5", Some(Duration::from_millis(200))))
            .expect("run");
        assert!(out.timed_out);
        assert_eq!(out.exit_code, None);
    }

    #[test]
    fn missing_shell_is_a_process_error() {
        let mut request = request("true", None);
        request.shell = "/nonexistent/shell".to_string();
        let err = ProductionCommandRunner.run(&request).expect_err("spawn");
        assert!(err.to_string().contains("/nonexistent/shell"));
    }
}
