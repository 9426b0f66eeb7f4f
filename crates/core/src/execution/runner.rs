//! Lifecycle sequencing
//!
//! Runs `pre<name>`, `<name>` and `post<name>` strictly one after another. The first
//! phase that does not succeed stops the sequence and becomes the overall result.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::environment::ExecutionEnvironment;
use crate::execution::command::{CommandRequest, CommandRunner, ShellRunner};
use crate::execution::resolver::ResolvedCommand;
use crate::results::{ExitOutcome, Phase};
use crate::types::{PkgrunError, PkgrunResult};

/// Variable naming the script a child belongs to
pub const SCRIPT_NAME_VAR: &str = "NODE_RUN_SCRIPT_NAME";

/// A user's request to run a script
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Forwarded to the main script only
    pub extra_args: Vec<String>,
    pub working_directory: PathBuf,
}

/// Sequences lifecycle phases over a [`CommandRunner`]
pub struct TaskRunner<R = ShellRunner> {
    runner: R,
}

impl<R: CommandRunner> TaskRunner<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Run every phase of `resolved`, failing with the first phase that does not succeed
    pub async fn run(
        &self,
        resolved: &ResolvedCommand,
        invocation: &Invocation,
        environment: &ExecutionEnvironment,
    ) -> PkgrunResult<()> {
        for (phase, script) in resolved.phases() {
            let extra_args: &[String] = match phase {
                Phase::Script => &invocation.extra_args,
                Phase::PreHook | Phase::PostHook => &[],
            };
            let phase_environment = environment.with_default(SCRIPT_NAME_VAR, script.name.as_str());

            info!(phase = phase.label(), script = %script.name, "Running phase");
            let outcome = self
                .runner
                .run(CommandRequest {
                    command_line: &script.command_line,
                    extra_args,
                    environment: &phase_environment,
                    working_directory: &invocation.working_directory,
                })
                .await;

            match outcome {
                ExitOutcome::Success => {
                    debug!(script = %script.name, "Phase succeeded");
                }
                ExitOutcome::SpawnFailed(reason) => {
                    return Err(PkgrunError::SpawnFailed {
                        script: script.name.clone(),
                        reason,
                    });
                }
                failed => {
                    return Err(PkgrunError::PhaseFailed {
                        phase,
                        script: script.name.clone(),
                        outcome: failed,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::configs::manifest::parse_manifest;
    use crate::execution::resolver::resolve_script;

    #[derive(Debug, Clone, PartialEq)]
    struct Spawned {
        command_line: String,
        extra_args: Vec<String>,
        script_name: Option<String>,
    }

    /// Records every request and answers with a canned outcome per command line
    #[derive(Default)]
    struct RecordingRunner {
        outcomes: HashMap<String, ExitOutcome>,
        spawned: Mutex<Vec<Spawned>>,
    }

    impl RecordingRunner {
        fn failing(command_line: &str, outcome: ExitOutcome) -> Self {
            let mut runner = Self::default();
            runner.outcomes.insert(command_line.to_string(), outcome);
            runner
        }

        fn spawned(&self) -> Vec<Spawned> {
            self.spawned.lock().unwrap().clone()
        }

        fn commands(&self) -> Vec<String> {
            self.spawned().into_iter().map(|s| s.command_line).collect()
        }
    }

    impl CommandRunner for &RecordingRunner {
        async fn run(&self, request: CommandRequest<'_>) -> ExitOutcome {
            self.spawned.lock().unwrap().push(Spawned {
                command_line: request.command_line.to_string(),
                extra_args: request.extra_args.to_vec(),
                script_name: request.environment.overrides.get(SCRIPT_NAME_VAR).cloned(),
            });
            self.outcomes
                .get(request.command_line)
                .cloned()
                .unwrap_or(ExitOutcome::Success)
        }
    }

    fn invocation(args: &[&str]) -> Invocation {
        Invocation {
            extra_args: args.iter().map(|a| a.to_string()).collect(),
            working_directory: PathBuf::from("/proj"),
        }
    }

    fn resolved(json: &str, name: &str) -> ResolvedCommand {
        resolve_script(&parse_manifest(json.as_bytes()).unwrap(), name).unwrap()
    }

    const BUILD: &str =
        r#"{"scripts":{"prebuild":"echo pre","build":"echo main","postbuild":"echo post"}}"#;

    #[tokio::test]
    async fn hooks_run_in_order_around_script() {
        let recorder = RecordingRunner::default();
        TaskRunner::new(&recorder)
            .run(&resolved(BUILD, "build"), &invocation(&[]), &ExecutionEnvironment::default())
            .await
            .unwrap();

        assert_eq!(recorder.commands(), vec!["echo pre", "echo main", "echo post"]);
    }

    #[tokio::test]
    async fn failing_pre_hook_short_circuits() {
        let recorder = RecordingRunner::failing("echo pre", ExitOutcome::NonZeroExit(3));
        let err = TaskRunner::new(&recorder)
            .run(&resolved(BUILD, "build"), &invocation(&[]), &ExecutionEnvironment::default())
            .await
            .unwrap_err();

        assert_eq!(recorder.commands(), vec!["echo pre"]);
        assert!(matches!(err, PkgrunError::PhaseFailed { phase: Phase::PreHook, .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn failing_script_skips_post_hook() {
        let recorder = RecordingRunner::failing("echo main", ExitOutcome::SignalTerminated(2));
        let err = TaskRunner::new(&recorder)
            .run(&resolved(BUILD, "build"), &invocation(&[]), &ExecutionEnvironment::default())
            .await
            .unwrap_err();

        assert_eq!(recorder.commands(), vec!["echo pre", "echo main"]);
        assert!(matches!(err, PkgrunError::PhaseFailed { phase: Phase::Script, .. }));
        assert_eq!(err.exit_code(), 130);
    }

    #[tokio::test]
    async fn failing_post_hook_fails_the_run() {
        let recorder = RecordingRunner::failing("echo post", ExitOutcome::NonZeroExit(9));
        let err = TaskRunner::new(&recorder)
            .run(&resolved(BUILD, "build"), &invocation(&[]), &ExecutionEnvironment::default())
            .await
            .unwrap_err();

        assert_eq!(recorder.commands().len(), 3);
        assert!(matches!(err, PkgrunError::PhaseFailed { phase: Phase::PostHook, .. }));
        assert_eq!(err.exit_code(), 9);
    }

    #[tokio::test]
    async fn spawn_failure_is_its_own_error() {
        let recorder =
            RecordingRunner::failing("echo main", ExitOutcome::SpawnFailed("no shell".to_string()));
        let err = TaskRunner::new(&recorder)
            .run(&resolved(BUILD, "build"), &invocation(&[]), &ExecutionEnvironment::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PkgrunError::SpawnFailed { ref script, .. } if script == "build"));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn extra_args_go_to_main_script_only() {
        let json = r#"{"scripts":{"pretest":"lint","test":"run-tests","posttest":"report"}}"#;
        let recorder = RecordingRunner::default();
        TaskRunner::new(&recorder)
            .run(
                &resolved(json, "test"),
                &invocation(&["--watch", "--silent"]),
                &ExecutionEnvironment::default(),
            )
            .await
            .unwrap();

        let spawned = recorder.spawned();
        assert!(spawned[0].extra_args.is_empty());
        assert_eq!(spawned[1].extra_args, vec!["--watch", "--silent"]);
        assert!(spawned[2].extra_args.is_empty());
    }

    #[tokio::test]
    async fn each_phase_sees_its_own_script_name() {
        let recorder = RecordingRunner::default();
        TaskRunner::new(&recorder)
            .run(&resolved(BUILD, "build"), &invocation(&[]), &ExecutionEnvironment::default())
            .await
            .unwrap();

        let names: Vec<Option<String>> = recorder.spawned().into_iter().map(|s| s.script_name).collect();
        assert_eq!(
            names,
            vec![
                Some("prebuild".to_string()),
                Some("build".to_string()),
                Some("postbuild".to_string())
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn real_children_run_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let json = r#"{"scripts":{"pretest":"echo pre >> log","test":"echo main >> log","posttest":"echo post >> log"}}"#;
        let invocation = Invocation {
            working_directory: dir.path().to_path_buf(),
            ..invocation(&[])
        };
        let environment = ExecutionEnvironment::from_host(dir.path(), Default::default());

        TaskRunner::new(ShellRunner::default())
            .run(&resolved(json, "test"), &invocation, &environment)
            .await
            .unwrap();

        let log = std::fs::read_to_string(dir.path().join("log")).unwrap();
        assert_eq!(log, "pre\nmain\npost\n");
    }
}
