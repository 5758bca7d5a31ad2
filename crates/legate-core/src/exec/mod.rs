//! Execution coordination: one spec, one agent call, one reconciled output.
//!
//! Both entry points route through the same core routine, which runs these
//! steps in fixed order:
//! 1. normalize tools and record the context on the spec;
//! 2. record the agent's identity (provenance reflects attempted execution,
//!    not only successful completion);
//! 3. invoke the agent exactly once, optionally under a deadline;
//! 4. reconcile the raw result against the spec's intent;
//! 5. store the output on the spec;
//! 6. fire the callback, exactly once;
//! 7. return (sync) or resolve the handle (async).
//!
//! A failure in step 3 aborts before any output exists: `spec.output()` stays
//! unset, sync callers get the error directly, async callers through the
//! handle, which always resolves.

pub mod pool;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::domain::errors::ExecutionError;
use crate::domain::output::{DecodeStatus, TaskOutput};
use crate::domain::spec::TaskSpec;
use crate::domain::tool::Tool;
use crate::ports::Agent;
use crate::reconcile::reconcile;

/// A finished async execution: the spec handed back to the caller with
/// provenance and output recorded, plus the output it produced.
#[derive(Debug)]
pub struct CompletedTask {
    pub spec: TaskSpec,
    pub output: TaskOutput,
}

/// Completion handle for one async execution.
pub struct ExecutionHandle {
    rx: oneshot::Receiver<Result<CompletedTask, ExecutionError>>,
}

impl ExecutionHandle {
    pub(crate) fn new(rx: oneshot::Receiver<Result<CompletedTask, ExecutionError>>) -> Self {
        Self { rx }
    }

    /// Resolves once the execution finishes.
    ///
    /// Always resolves: agent failures arrive as `Err`, and an execution
    /// dropped before delivering a result yields
    /// [`ExecutionError::Abandoned`]. Waiting is the only blocking point of
    /// the async path.
    pub async fn wait(self) -> Result<CompletedTask, ExecutionError> {
        self.rx.await.unwrap_or(Err(ExecutionError::Abandoned))
    }
}

/// Orchestrates task executions against an agent collaborator.
///
/// Holds only policy (an optional deadline around the agent call), so it is
/// cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct Coordinator {
    deadline: Option<Duration>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every agent call by `deadline`; elapse surfaces as
    /// [`ExecutionError::DeadlineExceeded`], a first-class failure rather
    /// than a partial result.
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Execute in the caller's task, blocking it until the agent returns.
    pub async fn execute_sync(
        &self,
        spec: &mut TaskSpec,
        agent: &dyn Agent,
        context: Option<&str>,
        tools: Option<Vec<Tool>>,
    ) -> Result<TaskOutput, ExecutionError> {
        execute_core(spec, agent, context, tools, self.deadline).await
    }

    /// Execute on a separate tokio task and return immediately.
    ///
    /// One spawned task per call; concurrency is not throttled here, use
    /// [`pool::WorkerPool`] when a bound is needed. The spec is moved into
    /// the execution and handed back through the resolved handle.
    pub fn execute_async(
        &self,
        spec: TaskSpec,
        agent: Arc<dyn Agent>,
        context: Option<String>,
        tools: Option<Vec<Tool>>,
    ) -> ExecutionHandle {
        let (tx, rx) = oneshot::channel();
        let deadline = self.deadline;
        tokio::spawn(async move {
            let mut spec = spec;
            let result = execute_core(&mut spec, agent.as_ref(), context.as_deref(), tools, deadline)
                .await
                .map(|output| CompletedTask { spec, output });
            // The caller may have dropped the handle; nothing to do then.
            let _ = tx.send(result);
        });
        ExecutionHandle::new(rx)
    }
}

async fn execute_core(
    spec: &mut TaskSpec,
    agent: &dyn Agent,
    context: Option<&str>,
    tools: Option<Vec<Tool>>,
    deadline: Option<Duration>,
) -> Result<TaskOutput, ExecutionError> {
    let tools = tools.unwrap_or_default();
    spec.prompt_context = context.map(str::to_owned);
    spec.note_processed_by(agent.role());

    debug!(task = %spec.id(), role = agent.role(), "executing task");
    let raw = match deadline {
        Some(limit) => tokio::time::timeout(limit, agent.execute(spec, context, &tools))
            .await
            .map_err(|_| ExecutionError::DeadlineExceeded(limit))??,
        None => agent.execute(spec, context, &tools).await?,
    };

    let reconciled = reconcile(&raw, spec);
    if reconciled.status == DecodeStatus::Failed {
        warn!(task = %spec.id(), "raw result not decodable; keeping raw only");
    }

    let output = TaskOutput::new(
        spec.id(),
        raw,
        reconciled.json_dict,
        reconciled.structured,
        reconciled.status,
    );
    spec.set_output(output.clone());

    if let Some(callback) = spec.callback().cloned() {
        callback(&output);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::AgentError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;

    struct CannedAgent {
        role: String,
        reply: String,
    }

    impl CannedAgent {
        fn new(role: &str, reply: &str) -> Self {
            Self {
                role: role.to_string(),
                reply: reply.to_string(),
            }
        }
    }

    #[async_trait]
    impl Agent for CannedAgent {
        fn role(&self) -> &str {
            &self.role
        }

        async fn execute(
            &self,
            _spec: &TaskSpec,
            _context: Option<&str>,
            _tools: &[Tool],
        ) -> Result<String, AgentError> {
            Ok(self.reply.clone())
        }
    }

    struct FailingAgent;

    #[async_trait]
    impl Agent for FailingAgent {
        fn role(&self) -> &str {
            "flaky"
        }

        async fn execute(
            &self,
            _spec: &TaskSpec,
            _context: Option<&str>,
            _tools: &[Tool],
        ) -> Result<String, AgentError> {
            Err(AgentError::new("flaky", "upstream unavailable"))
        }
    }

    /// Blocks inside `execute` until the gate is released.
    struct GatedAgent {
        gate: Arc<Notify>,
        reply: String,
    }

    #[async_trait]
    impl Agent for GatedAgent {
        fn role(&self) -> &str {
            "gated"
        }

        async fn execute(
            &self,
            _spec: &TaskSpec,
            _context: Option<&str>,
            _tools: &[Tool],
        ) -> Result<String, AgentError> {
            self.gate.notified().await;
            Ok(self.reply.clone())
        }
    }

    fn spec(description: &str) -> TaskSpec {
        TaskSpec::builder().description(description).build().unwrap()
    }

    #[tokio::test]
    async fn sync_execution_stores_output_and_provenance() {
        let mut task = spec("report the weather");
        let agent = CannedAgent::new("researcher", r#"{"output": "sunny"}"#);

        let output = Coordinator::new()
            .execute_sync(&mut task, &agent, Some("city: paris"), None)
            .await
            .unwrap();

        assert_eq!(output.raw(), r#"{"output": "sunny"}"#);
        assert_eq!(output.task_id(), task.id());
        assert_eq!(output.json_dict().unwrap()["output"], "sunny");
        assert_eq!(task.output().unwrap().raw(), output.raw());
        assert_eq!(task.prompt_context.as_deref(), Some("city: paris"));
        assert!(task.processed_by_agents().contains("researcher"));
    }

    #[tokio::test]
    async fn agent_failure_leaves_no_partial_output() {
        let mut task = spec("doomed");

        let err = Coordinator::new()
            .execute_sync(&mut task, &FailingAgent, None, None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ExecutionError::Agent(AgentError::new("flaky", "upstream unavailable"))
        );
        assert!(task.output().is_none());
        // provenance reflects the attempt
        assert!(task.processed_by_agents().contains("flaky"));
    }

    #[tokio::test]
    async fn async_execution_matches_sync_result() {
        let agent = Arc::new(CannedAgent::new("researcher", r#"{"output": "42"}"#));
        let coordinator = Coordinator::new();

        let mut sync_task = spec("compute the answer");
        let sync_output = coordinator
            .execute_sync(&mut sync_task, agent.as_ref(), None, None)
            .await
            .unwrap();

        let handle = coordinator.execute_async(spec("compute the answer"), agent, None, None);
        let completed = handle.wait().await.unwrap();

        assert_eq!(completed.output.raw(), sync_output.raw());
        assert_eq!(completed.output.json_dict(), sync_output.json_dict());
        assert_eq!(completed.spec.output().unwrap().raw(), sync_output.raw());
    }

    #[tokio::test]
    async fn execute_async_returns_before_the_agent_finishes() {
        let gate = Arc::new(Notify::new());
        let agent = Arc::new(GatedAgent {
            gate: Arc::clone(&gate),
            reply: "done".to_string(),
        });

        // If execute_async blocked on the agent this would deadlock: the gate
        // is only released after the call returns.
        let handle = Coordinator::new().execute_async(spec("slow work"), agent, None, None);
        gate.notify_one();

        let completed = handle.wait().await.unwrap();
        assert_eq!(completed.output.raw(), "done");
    }

    #[tokio::test]
    async fn async_agent_failure_resolves_the_handle() {
        let handle =
            Coordinator::new().execute_async(spec("doomed"), Arc::new(FailingAgent), None, None);

        let err = handle.wait().await.unwrap_err();
        assert_eq!(
            err,
            ExecutionError::Agent(AgentError::new("flaky", "upstream unavailable"))
        );
    }

    #[tokio::test]
    async fn dropped_execution_resolves_as_abandoned() {
        let (tx, rx) = oneshot::channel();
        drop(tx);

        let err = ExecutionHandle::new(rx).wait().await.unwrap_err();
        assert_eq!(err, ExecutionError::Abandoned);
    }

    #[tokio::test]
    async fn callback_fires_once_after_output_before_resolution() {
        let fired = Arc::new(AtomicU32::new(0));
        let seen_raw = Arc::new(Mutex::new(None::<String>));

        let task = {
            let fired = Arc::clone(&fired);
            let seen_raw = Arc::clone(&seen_raw);
            TaskSpec::builder()
                .description("notify me")
                .callback(move |output| {
                    fired.fetch_add(1, Ordering::SeqCst);
                    *seen_raw.lock().unwrap() = Some(output.raw().to_string());
                })
                .build()
                .unwrap()
        };

        let agent = Arc::new(CannedAgent::new("researcher", r#"{"output": "ok"}"#));
        let handle = Coordinator::new().execute_async(task, agent, None, None);
        let completed = handle.wait().await.unwrap();

        // the handle resolved, so the callback must already have run, once,
        // with the stored output
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(
            seen_raw.lock().unwrap().as_deref(),
            Some(completed.spec.output().unwrap().raw())
        );
    }

    #[tokio::test]
    async fn deadline_elapse_is_a_first_class_failure() {
        let gate = Arc::new(Notify::new());
        let agent = GatedAgent {
            gate,
            reply: "never".to_string(),
        };
        let mut task = spec("too slow");

        let err = Coordinator::with_deadline(Duration::from_millis(20))
            .execute_sync(&mut task, &agent, None, None)
            .await
            .unwrap_err();

        assert_eq!(err, ExecutionError::DeadlineExceeded(Duration::from_millis(20)));
        assert!(task.output().is_none());
    }

    #[tokio::test]
    async fn missing_tools_normalize_to_empty() {
        struct ToolCountingAgent {
            seen: Arc<AtomicU32>,
        }

        #[async_trait]
        impl Agent for ToolCountingAgent {
            fn role(&self) -> &str {
                "counter"
            }

            async fn execute(
                &self,
                _spec: &TaskSpec,
                _context: Option<&str>,
                tools: &[Tool],
            ) -> Result<String, AgentError> {
                self.seen.store(tools.len() as u32, Ordering::SeqCst);
                Ok("{}".to_string())
            }
        }

        let seen = Arc::new(AtomicU32::new(99));
        let agent = ToolCountingAgent {
            seen: Arc::clone(&seen),
        };
        let mut task = spec("toolless");

        Coordinator::new()
            .execute_sync(&mut task, &agent, None, None)
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }
}
