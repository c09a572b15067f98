//! Guest process lifecycle: spawn a subprocess interpreter with stdio piped,
//! following the shape of the workspace's LSP stdio client (spawn, framed
//! send/recv, best-effort shutdown on drop) but generalized to the guest's
//! capability-call/response protocol instead of LSP requests/notifications.

use crate::errors::{SandboxError, SandboxResult};
use crate::protocol::{io as frame_io, GuestFrame, HostFrame};
use std::process::Stdio;
use tokio::io::{BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

const SUPERVISOR_SOURCE: &str = include_str!("../runtime/supervisor.py");

pub struct GuestProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    _script: tempfile::NamedTempFile,
}

impl GuestProcess {
    /// Spawns `python3 <supervisor>.py`, piping stdin/stdout for the framed
    /// protocol. The child inherits no environment variables (`env_clear()`)
    /// and `max_memory_bytes`, when set on unix, is applied as `RLIMIT_AS`
    /// before exec. `env_clear()` alone does not stop guest code from
    /// calling `import os`/`socket`/`subprocess` or opening files directly —
    /// that boundary is enforced inside `runtime/supervisor.py`, which runs
    /// guest code against an explicit builtins/import allow-list
    /// (`SAFE_BUILTINS`/`ALLOWED_MODULES`) plus an AST check that rejects
    /// denied imports and dunder attribute access before the code ever runs
    /// (spec §4.3 isolation requirement).
    pub fn start(interpreter: &str, max_memory_bytes: Option<u64>) -> SandboxResult<Self> {
        let mut script = tempfile::Builder::new()
            .prefix("sandbox-supervisor-")
            .suffix(".py")
            .tempfile()
            .map_err(|e| SandboxError::Spawn(e.to_string()))?;
        std::io::Write::write_all(&mut script, SUPERVISOR_SOURCE.as_bytes())
            .map_err(|e| SandboxError::Spawn(e.to_string()))?;

        let mut cmd = Command::new(interpreter);
        cmd.arg("-u")
            .arg(script.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .env_clear()
            .kill_on_drop(true);

        #[cfg(unix)]
        if let Some(bytes) = max_memory_bytes {
            use std::os::unix::process::CommandExt;
            unsafe {
                cmd.pre_exec(move || {
                    let _ = rlimit::setrlimit(rlimit::Resource::AS, bytes, bytes);
                    Ok(())
                });
            }
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| SandboxError::Spawn(format!("failed to start {interpreter}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SandboxError::Spawn("no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SandboxError::Spawn("no stdout".into()))?;

        Ok(Self {
            child,
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
            _script: script,
        })
    }

    pub async fn send(&mut self, frame: &HostFrame) -> SandboxResult<()> {
        frame_io::write_frame(&mut self.stdin, frame).await
    }

    pub async fn recv(&mut self) -> SandboxResult<GuestFrame> {
        frame_io::read_frame(&mut self.stdout).await
    }

    pub async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}
