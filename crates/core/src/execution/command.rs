//! Shell command execution
//!
//! [`ShellRunner`] spawns the host shell with a script's command text, inherits the
//! standard streams, and waits for the child to terminate. On Unix the shell leads its
//! own process group. Termination signals sent to the runner and the deadline kill are
//! delivered to that whole group, so nothing the script started outlives the phase.

use std::future::Future;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::environment::ExecutionEnvironment;
use crate::platform::ShellInfo;
use crate::results::ExitOutcome;

#[cfg(unix)]
use crate::execution::process_group::{group_of, signal_group, ForegroundGuard, SignalListener};

/// Signal number reported for a child killed after its deadline
pub const SIGKILL: i32 = 9;

/// Everything needed to run one command line
#[derive(Debug, Clone, Copy)]
pub struct CommandRequest<'a> {
    pub command_line: &'a str,
    /// Forwarded to the shell after `command_line`. Empty for hooks.
    pub extra_args: &'a [String],
    pub environment: &'a ExecutionEnvironment,
    pub working_directory: &'a Path,
}

/// Runs a command line to completion
pub trait CommandRunner {
    fn run(&self, request: CommandRequest<'_>) -> impl Future<Output = ExitOutcome>;
}

/// Runs commands through the host's default shell
#[derive(Debug)]
pub struct ShellRunner {
    shell: ShellInfo,
    timeout: Option<Duration>,
    /// Registered by the first phase and kept until the runner is dropped
    #[cfg(unix)]
    signals: tokio::sync::Mutex<Option<SignalListener>>,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(ShellInfo::current())
    }
}

impl ShellRunner {
    pub fn new(shell: ShellInfo) -> Self {
        Self {
            shell,
            timeout: None,
            #[cfg(unix)]
            signals: tokio::sync::Mutex::new(None),
        }
    }

    /// Kill children that outlive `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn shell(&self) -> &ShellInfo {
        &self.shell
    }

    fn build_command(&self, text: &str, request: &CommandRequest<'_>) -> io::Result<Command> {
        let variables = request
            .environment
            .variables()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        let mut command = Command::new(&self.shell.program);
        command.args(&self.shell.args);

        // cmd.exe with /s strips one pair of outer quotes and takes the rest verbatim
        #[cfg(windows)]
        command.raw_arg(format!("\"{}\"", text));
        #[cfg(not(windows))]
        command.arg(text);

        #[cfg(unix)]
        command.process_group(0);

        command
            .current_dir(request.working_directory)
            .env_clear()
            .envs(variables)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        Ok(command)
    }

    fn spawn(&self, command: &mut Command) -> Result<Child, ExitOutcome> {
        command
            .spawn()
            .map_err(|e| ExitOutcome::SpawnFailed(format!("{}: {}", self.shell.program, e)))
    }

    #[cfg(unix)]
    async fn supervise(&self, mut command: Command) -> ExitOutcome {
        let mut slot = self.signals.lock().await;
        let signals = match &mut *slot {
            Some(signals) => signals,
            empty => match SignalListener::install() {
                Ok(installed) => empty.insert(installed),
                Err(e) => {
                    return ExitOutcome::SpawnFailed(format!("Failed to listen for signals: {}", e))
                }
            },
        };

        // A signal that landed between phases stops the run before anything else starts
        if let Some(signal) = signals.take_pending().await {
            warn!(?signal, "Signal received before phase start, not spawning");
            return ExitOutcome::SignalTerminated(signal as i32);
        }

        let mut child = match self.spawn(&mut command) {
            Ok(child) => child,
            Err(outcome) => return outcome,
        };
        let group = group_of(child.id());
        let _foreground = group.map(ForegroundGuard::acquire);
        let deadline = self.timeout.map(|limit| Instant::now() + limit);

        let status = loop {
            let received = tokio::select! {
                status = child.wait() => break status,
                signal = signals.recv() => signal,
                _ = deadline_elapsed(deadline) => {
                    return self.kill_after_deadline(&mut child, group).await;
                }
            };

            match group.map(|group| signal_group(group, received)) {
                Some(Ok(())) => {
                    debug!(?group, signal = ?received, "Forwarded signal to child group");
                }
                Some(Err(e)) => {
                    warn!(?group, signal = ?received, error = %e, "Failed to forward signal");
                }
                None => {}
            }
        };

        finished(status)
    }

    #[cfg(unix)]
    async fn kill_after_deadline(
        &self,
        child: &mut Child,
        group: Option<nix::unistd::Pid>,
    ) -> ExitOutcome {
        warn!(
            timeout_secs = self.timeout.map(|t| t.as_secs_f64()),
            "Child exceeded its deadline, killing it"
        );

        let group_killed = group
            .map(|group| signal_group(group, nix::sys::signal::Signal::SIGKILL).is_ok())
            .unwrap_or(false);
        if !group_killed {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "Failed to kill child");
            }
        }

        match child.wait().await {
            Ok(_) => ExitOutcome::SignalTerminated(SIGKILL),
            Err(e) => ExitOutcome::SpawnFailed(format!("Failed to wait for child: {}", e)),
        }
    }

    #[cfg(not(unix))]
    async fn supervise(&self, mut command: Command) -> ExitOutcome {
        let mut child = match self.spawn(&mut command) {
            Ok(child) => child,
            Err(outcome) => return outcome,
        };
        let deadline = self.timeout.map(|limit| Instant::now() + limit);

        // Console control events already reach every process attached to the console
        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                _ = deadline_elapsed(deadline) => {
                    warn!("Child exceeded its deadline, killing it");
                    return match child.kill().await {
                        Ok(()) => ExitOutcome::SignalTerminated(SIGKILL),
                        Err(e) => ExitOutcome::SpawnFailed(format!("Failed to kill child: {}", e)),
                    };
                }
                received = tokio::signal::ctrl_c() => match received {
                    Ok(()) => debug!("Ctrl-C received, waiting for child to exit"),
                    Err(e) => {
                        return ExitOutcome::SpawnFailed(format!("Failed to listen for Ctrl-C: {}", e))
                    }
                },
            }
        };

        finished(status)
    }
}

impl CommandRunner for ShellRunner {
    async fn run(&self, request: CommandRequest<'_>) -> ExitOutcome {
        let text = self.shell.append_args(request.command_line, request.extra_args);

        let command = match self.build_command(&text, &request) {
            Ok(command) => command,
            Err(e) => return ExitOutcome::SpawnFailed(e.to_string()),
        };

        debug!(
            shell = %self.shell.program,
            command = %text,
            cwd = %request.working_directory.display(),
            "Spawning child"
        );

        let outcome = self.supervise(command).await;
        debug!(%outcome, "Child finished");
        outcome
    }
}

impl CommandRunner for &ShellRunner {
    async fn run(&self, request: CommandRequest<'_>) -> ExitOutcome {
        <ShellRunner as CommandRunner>::run(*self, request).await
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn finished(status: io::Result<ExitStatus>) -> ExitOutcome {
    match status {
        Ok(status) => ExitOutcome::from_status(status),
        Err(e) => ExitOutcome::SpawnFailed(format!("Failed to wait for child: {}", e)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn request<'a>(
        command_line: &'a str,
        extra_args: &'a [String],
        environment: &'a ExecutionEnvironment,
        dir: &'a Path,
    ) -> CommandRequest<'a> {
        CommandRequest {
            command_line,
            extra_args,
            environment,
            working_directory: dir,
        }
    }

    fn host_environment() -> ExecutionEnvironment {
        ExecutionEnvironment {
            inherited_variables: std::env::vars_os().collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        let dir = TempDir::new().unwrap();
        let env = host_environment();
        let outcome = ShellRunner::default().run(request("true", &[], &env, dir.path())).await;
        assert_eq!(outcome, ExitOutcome::Success);
    }

    #[tokio::test]
    async fn nonzero_exit_keeps_code() {
        let dir = TempDir::new().unwrap();
        let env = host_environment();
        let outcome = ShellRunner::default().run(request("exit 42", &[], &env, dir.path())).await;
        assert_eq!(outcome, ExitOutcome::NonZeroExit(42));
    }

    #[tokio::test]
    async fn signal_termination_is_reported() {
        let dir = TempDir::new().unwrap();
        let env = host_environment();
        let outcome = ShellRunner::default()
            .run(request("kill -TERM $$", &[], &env, dir.path()))
            .await;
        assert_eq!(outcome, ExitOutcome::SignalTerminated(15));
    }

    #[tokio::test]
    async fn missing_shell_is_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let env = host_environment();
        let runner = ShellRunner::new(ShellInfo {
            program: "/nonexistent/pkgrun-shell".to_string(),
            ..ShellInfo::for_os("linux", None)
        });
        let outcome = runner.run(request("true", &[], &env, dir.path())).await;
        assert!(matches!(outcome, ExitOutcome::SpawnFailed(_)));
    }

    #[tokio::test]
    async fn extra_args_reach_the_command() {
        let dir = TempDir::new().unwrap();
        let env = host_environment();
        let args = vec!["--watch".to_string(), "it's here".to_string()];
        let outcome = ShellRunner::default()
            .run(request("printf '%s\\n' > args.txt", &args, &env, dir.path()))
            .await;
        assert_eq!(outcome, ExitOutcome::Success);

        let written = fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(written, "--watch\nit's here\n");
    }

    #[tokio::test]
    async fn local_bin_directory_is_on_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("node_modules/.bin");
        fs::create_dir_all(&bin).unwrap();
        let tool = bin.join("hello-tool");
        fs::write(&tool, "#!/bin/sh\necho local > out.txt\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let env = ExecutionEnvironment::from_host(dir.path(), Default::default());
        let outcome = ShellRunner::default()
            .run(request("hello-tool", &[], &env, dir.path()))
            .await;
        assert_eq!(outcome, ExitOutcome::Success);
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "local\n");
    }

    #[tokio::test]
    async fn deadline_kills_child() {
        let dir = TempDir::new().unwrap();
        let env = host_environment();
        let runner = ShellRunner::default().with_timeout(Some(Duration::from_millis(200)));
        let outcome = runner.run(request("sleep 5", &[], &env, dir.path())).await;
        assert_eq!(outcome, ExitOutcome::SignalTerminated(SIGKILL));
    }

    /// Whether `pid` names a live process. Zombies awaiting an init that never reaps count as gone.
    fn is_running(pid: i32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        if kill(Pid::from_raw(pid), None).is_err() {
            return false;
        }
        match fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => !stat.rsplit(')').next().unwrap_or("").trim_start().starts_with('Z'),
            Err(_) => true,
        }
    }

    fn wait_until_gone(pid: i32) -> bool {
        for _ in 0..100 {
            if !is_running(pid) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        false
    }

    #[tokio::test]
    async fn deadline_kills_everything_the_script_started() {
        let dir = TempDir::new().unwrap();
        let env = host_environment();
        let runner = ShellRunner::default().with_timeout(Some(Duration::from_millis(500)));
        let outcome = runner
            .run(request("sleep 30 & echo $! > grandchild.pid; wait", &[], &env, dir.path()))
            .await;
        assert_eq!(outcome, ExitOutcome::SignalTerminated(SIGKILL));

        let pid: i32 = fs::read_to_string(dir.path().join("grandchild.pid"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(wait_until_gone(pid), "sleep {} outlived its phase", pid);
    }
}
