use crate::core::models::job::JobDescriptor;
use crate::core::models::molecule::Molecule;
use crate::core::models::result::{ComputationResult, Provenance};
use crate::engine::backend::{ComputeBackend, ComputeError};
use crate::engine::cancel::CancellationSignal;
use serde::Serialize;
use serde_json::json;
use std::io;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tracing::{debug, info, warn};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Serialize)]
struct CommandRequest<'a> {
    molecule: &'a Molecule,
    job: &'a JobDescriptor,
}

/// Runs an external program once per computation.
///
/// The program receives `{"molecule": ..., "job": ...}` as JSON on stdin and must
/// print a single computation result object on stdout:
///
/// ```json
/// {"return_result": -2.855, "properties": {"scf_total_energy": -2.855}}
/// ```
///
/// A non-zero exit status is reported as a failure carrying the exit status and
/// stderr as diagnostics. While the program runs, the cancellation signal is polled
/// and the child is killed once it fires.
///
/// Each call drives the child on its own single-threaded tokio runtime, so
/// [`ComputeBackend::compute`] must not be called from inside an async task
/// (wrap the call in `tokio::task::block_in_place` or `spawn_blocking`).
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    provenance: Provenance,
    poll_interval: Duration,
}

impl CommandBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let creator = program
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| program.to_string_lossy().to_string());
        Self {
            provenance: Provenance::new(&creator, "unknown", "command"),
            program,
            args: Vec::new(),
            working_dir: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// How often the cancellation signal is checked while the program runs.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn execute(
        &self,
        payload: Vec<u8>,
        cancel: &CancellationSignal,
    ) -> Result<Output, ComputeError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            ComputeError::failed(format!(
                "failed to launch '{}': {e}",
                self.program.display()
            ))
        })?;
        info!(program = %self.program.display(), pid = ?child.id(), "Backend process started.");

        let stdin = child.stdin.take();
        let finished = async {
            let (written, output) = tokio::join!(feed(stdin, payload), child.wait_with_output());
            if let Err(e) = written {
                return Err(ComputeError::failed(format!("failed to send request: {e}")));
            }
            output.map_err(|e| ComputeError::failed(format!("failed to read backend output: {e}")))
        };

        // Dropping `finished` drops the child, and `kill_on_drop` stops it.
        tokio::select! {
            output = finished => output,
            reason = cancelled(cancel, self.poll_interval) => {
                warn!(program = %self.program.display(), reason, "Killing backend process.");
                Err(ComputeError::Cancelled {
                    reason: reason.to_string(),
                })
            }
        }
    }
}

/// Writes the request and closes stdin. A program that exits without reading its
/// input is not an error here; its exit status decides.
async fn feed(stdin: Option<ChildStdin>, payload: Vec<u8>) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(&payload).await {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("Backend did not consume its input.");
            Ok(())
        }
        other => other,
    }
}

async fn cancelled(cancel: &CancellationSignal, poll_interval: Duration) -> &'static str {
    loop {
        if let Some(reason) = cancel.reason() {
            return reason;
        }
        tokio::time::sleep(poll_interval).await;
    }
}

impl ComputeBackend for CommandBackend {
    fn provenance(&self) -> Provenance {
        self.provenance.clone()
    }

    fn compute(
        &self,
        molecule: &Molecule,
        job: &JobDescriptor,
        cancel: &CancellationSignal,
    ) -> Result<ComputationResult, ComputeError> {
        let payload = serde_json::to_vec(&CommandRequest { molecule, job })
            .map_err(|e| ComputeError::failed(format!("failed to encode request: {e}")))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ComputeError::failed(format!("failed to start process runtime: {e}")))?;
        let output = runtime.block_on(self.execute(payload, cancel))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ComputeError::Failed {
                message: format!("'{}' exited with {}", self.program.display(), output.status),
                diagnostics: Some(json!({
                    "status": output.status.code(),
                    "stderr": stderr,
                })),
            });
        }

        serde_json::from_slice::<ComputationResult>(&output.stdout)
            .map_err(|e| ComputeError::InvalidResult(format!("unreadable backend output: {e}")))
    }
}
