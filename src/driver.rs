//! Process boundary to the client under test.
//!
//! The client is started with its stdout and stderr pointed at the same pipe,
//! so the captured text interleaves both streams the way a terminal would
//! show them. Nothing here looks at what the client prints.

use crate::interrupt::Interrupt;
use crate::script::CommandScript;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use std::os::fd::{FromRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How long to keep reading after the client is gone. Anything still holding
/// the pipe open past this is ignored.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// One finished run of the client.
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    pub argv: Vec<String>,
    pub input: String,
    /// stdout and stderr, merged.
    pub output: String,
    /// Spawn to teardown, inclusive.
    pub elapsed: Duration,
    pub timed_out: bool,
}

enum Waited {
    Exited(std::process::ExitStatus),
    Failed(std::io::Error),
    TimedOut,
    Interrupted,
}

/// A running client. Killed (with its whole process group) on drop unless it
/// has already been reaped.
pub struct ClientProcess {
    argv: Vec<String>,
    child: Child,
    pid: Option<u32>,
    stdin: Option<ChildStdin>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    captured: Arc<Mutex<Vec<u8>>>,
    reaped: bool,
}

impl ClientProcess {
    /// Spawns `argv[0]` with the remaining arguments in its own process group.
    pub fn start(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("Client command is empty"))?;
        let (read_end, write_end) = combined_pipe()?;

        // The command owns the parent's copies of the write end; it has to be
        // dropped before the reader can ever see EOF.
        let mut child = {
            let mut std_command = std::process::Command::new(program);
            std_command
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::from(write_end.try_clone()?))
                .stderr(Stdio::from(write_end))
                .process_group(0);
            let mut command = Command::from(std_command);
            command.kill_on_drop(true);
            command
                .spawn()
                .with_context(|| format!("Failed to start client '{}'", argv.join(" ")))?
        };

        let pid = child.id();
        info!("Started client '{}' (pid {:?})", argv.join(" "), pid);

        let captured = Arc::new(Mutex::new(Vec::new()));
        let receiver = pipe::Receiver::from_owned_fd(read_end)
            .context("Failed to register client output pipe")?;
        let reader = tokio::spawn(capture(receiver, Arc::clone(&captured)));

        Ok(Self {
            argv: argv.to_vec(),
            stdin: child.stdin.take(),
            child,
            pid,
            writer: None,
            reader: Some(reader),
            captured,
            reaped: false,
        })
    }

    /// Streams the script to the client's stdin in the background and closes
    /// it afterwards. Can only be called once.
    pub fn feed(&mut self, script: &CommandScript) -> Result<()> {
        let mut stdin = self
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Client input has already been fed"))?;
        let input = script.as_str().to_owned();
        self.writer = Some(tokio::spawn(async move {
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                warn!("Client stopped reading its input: {}", e);
                return;
            }
            if let Err(e) = stdin.flush().await {
                warn!("Failed to flush client input: {}", e);
            }
        }));
        Ok(())
    }

    /// Waits for the client to exit, the deadline to pass, or an interrupt.
    ///
    /// Returns everything captured and whether the deadline was hit; on a
    /// timeout the client is killed first. An interrupt kills the client and
    /// is reported as an error.
    pub async fn await_output(
        &mut self,
        deadline: Instant,
        interrupt: &Interrupt,
    ) -> Result<(String, bool)> {
        let waited = tokio::select! {
            status = tokio::time::timeout_at(deadline, self.child.wait()) => match status {
                Ok(Ok(status)) => Waited::Exited(status),
                Ok(Err(e)) => Waited::Failed(e),
                Err(_) => Waited::TimedOut,
            },
            _ = interrupt.raised() => Waited::Interrupted,
        };

        match waited {
            Waited::Exited(status) => {
                self.reaped = true;
                debug!("Client exited with {}", status);
                self.drain().await;
                Ok((self.snapshot(), false))
            }
            Waited::Failed(e) => {
                self.stop().await;
                Err(e).context("Failed to wait for client")
            }
            Waited::TimedOut => {
                warn!("Client did not finish before the deadline, killing it");
                self.stop().await;
                Ok((self.snapshot(), true))
            }
            Waited::Interrupted => {
                self.stop().await;
                bail!("Interrupted while waiting for '{}'", self.argv.join(" "))
            }
        }
    }

    /// Kills the client's process group if it is still running, reaps it and
    /// collects whatever output is left. Safe to call more than once.
    pub async fn stop(&mut self) {
        if !self.reaped {
            self.kill_group();
            if let Err(e) = self.child.kill().await {
                debug!("Client already gone: {}", e);
            }
            self.reaped = true;
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
        self.drain().await;
    }

    /// Output captured so far, lossily decoded.
    pub fn snapshot(&self) -> String {
        let buf = self.captured.lock().unwrap_or_else(|p| p.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }

    async fn drain(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            if tokio::time::timeout(DRAIN_GRACE, &mut reader).await.is_err() {
                debug!("Client output still open after exit, keeping what was read");
                reader.abort();
            }
        }
    }

    fn kill_group(&self) {
        if let Some(pid) = self.pid {
            // Negative pid targets the group created by process_group(0).
            let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
            if rc != 0 {
                debug!(
                    "kill of process group {} failed: {}",
                    pid,
                    std::io::Error::last_os_error()
                );
            }
        }
    }
}

impl Drop for ClientProcess {
    fn drop(&mut self) {
        if !self.reaped {
            self.kill_group();
        }
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Starts the client, feeds it `script` and collects its output, all within
/// `timeout` measured from before the spawn.
pub async fn drive(
    argv: &[String],
    script: &CommandScript,
    timeout: Duration,
    interrupt: &Interrupt,
) -> Result<ProcessInvocation> {
    let started = Instant::now();
    let deadline = started + timeout;

    let mut process = ClientProcess::start(argv)?;
    process.feed(script)?;
    let (output, timed_out) = process.await_output(deadline, interrupt).await?;
    process.stop().await;
    drop(process);

    let elapsed = started.elapsed();
    info!(
        "Client finished in {:.1}s{}",
        elapsed.as_secs_f64(),
        if timed_out { " (timed out)" } else { "" }
    );

    Ok(ProcessInvocation {
        argv: argv.to_vec(),
        input: script.as_str().to_owned(),
        output,
        elapsed,
        timed_out,
    })
}

async fn capture(mut receiver: pipe::Receiver, sink: Arc<Mutex<Vec<u8>>>) {
    let mut buf = [0u8; 8192];
    loop {
        match receiver.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => sink
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .extend_from_slice(&buf[..n]),
            Err(e) => {
                warn!("Failed to read client output: {}", e);
                break;
            }
        }
    }
}

/// Anonymous pipe with both ends close-on-exec; the child only gets the write
/// end through its stdout/stderr redirection.
fn combined_pipe() -> Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];

    #[cfg(target_os = "linux")]
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };

    #[cfg(not(target_os = "linux"))]
    let rc = unsafe {
        let rc = libc::pipe(fds.as_mut_ptr());
        if rc == 0 {
            libc::fcntl(fds[0], libc::F_SETFD, libc::FD_CLOEXEC);
            libc::fcntl(fds[1], libc::F_SETFD, libc::FD_CLOEXEC);
        }
        rc
    };

    if rc != 0 {
        return Err(std::io::Error::last_os_error()).context("Failed to create output pipe");
    }
    let (read_end, write_end) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    Ok((read_end, write_end))
}
