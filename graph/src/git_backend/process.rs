use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use crate::error::{GraphError, Result};

/// Line-oriented view of a running process's standard output
pub trait LineStream {
    /// Read one record including its terminator; `None` at end of output
    fn read_record(&mut self) -> Result<Option<Vec<u8>>>;

    /// Stop the process without waiting for it to finish on its own
    fn terminate(&mut self) -> Result<()>;
}

/// Starts the external log command
pub trait CommandRunner {
    fn spawn(&self, program: &str, args: &[String]) -> Result<Box<dyn LineStream>>;
}

/// Runs real processes, optionally inside a repository directory
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    workdir: Option<PathBuf>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(workdir.into()),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn spawn(&self, program: &str, args: &[String]) -> Result<Box<dyn LineStream>> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| GraphError::Spawn {
            program: program.to_string(),
            source,
        })?;
        debug!(program, pid = child.id(), ?args, "spawned log process");

        let stdout = child.stdout.take().ok_or_else(|| GraphError::Spawn {
            program: program.to_string(),
            source: std::io::Error::other("stdout was not captured"),
        })?;

        Ok(Box::new(ChildStream {
            reader: BufReader::new(stdout),
            child: Some(child),
        }))
    }
}

/// Output of a spawned child; killed on terminate or drop
pub struct ChildStream {
    reader: BufReader<ChildStdout>,
    child: Option<Child>,
}

impl LineStream for ChildStream {
    fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn terminate(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let pid = child.id();
        let status = match child.try_wait()? {
            Some(status) => status,
            None => {
                debug!(pid, "killing log process");
                child.kill()?;
                child.wait()?
            }
        };
        if exited_with_failure(&status) {
            warn!(pid, %status, "log process exited with failure");
        }
        Ok(())
    }
}

/// Non-zero exit code; a kill by signal is not a failure of the command
fn exited_with_failure(status: &ExitStatus) -> bool {
    status.code().is_some_and(|code| code != 0)
}

impl Drop for ChildStream {
    fn drop(&mut self) {
        if let Err(err) = self.terminate() {
            warn!(error = %err, "failed to terminate log process");
        }
    }
}
