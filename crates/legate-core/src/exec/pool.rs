//! Bounded worker pool for async executions.
//!
//! [`Coordinator::execute_async`] spawns one task per call; this pool is the
//! bounded alternative. Submissions enter an mpsc queue and `n` workers drain
//! it, so at most `n` executions run at once. The per-execution contract is
//! unchanged: every submission gets a handle that eventually resolves exactly
//! once, with the output, the execution's error, or
//! [`ExecutionError::Abandoned`] if the pool shuts down before the job runs.
//!
//! [`ExecutionError::Abandoned`]: crate::domain::ExecutionError::Abandoned

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{CompletedTask, Coordinator, ExecutionHandle};
use crate::domain::errors::ExecutionError;
use crate::domain::ids::ExecutionId;
use crate::domain::spec::TaskSpec;
use crate::domain::tool::Tool;
use crate::ports::Agent;

struct Job {
    execution_id: ExecutionId,
    spec: TaskSpec,
    agent: Arc<dyn Agent>,
    context: Option<String>,
    tools: Option<Vec<Tool>>,
    reply: oneshot::Sender<Result<CompletedTask, ExecutionError>>,
}

/// Worker pool handle.
/// - `request_shutdown()` stops workers after their in-flight execution
/// - `shutdown_and_join()` additionally waits for them to exit
pub struct WorkerPool {
    tx: mpsc::Sender<Job>,
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` workers sharing one queue of depth `queue_depth`.
    pub fn spawn(workers: usize, queue_depth: usize, coordinator: Coordinator) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let coordinator = Arc::new(coordinator);

        // at least one worker, or nothing would ever drain the queue
        let workers = workers.max(1);
        let mut joins = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let queue = Arc::clone(&rx);
            let coordinator = Arc::clone(&coordinator);
            let rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, queue, coordinator, rx).await;
            });
            joins.push(join);
        }

        Self {
            tx,
            shutdown_tx,
            joins,
        }
    }

    /// Queue one execution.
    ///
    /// Awaits only while the queue is full. The returned handle resolves once
    /// a worker has run the job (or the pool shut down first).
    pub async fn submit(
        &self,
        spec: TaskSpec,
        agent: Arc<dyn Agent>,
        context: Option<String>,
        tools: Option<Vec<Tool>>,
    ) -> ExecutionHandle {
        let (reply, rx) = oneshot::channel();
        let job = Job {
            execution_id: ExecutionId::generate(),
            spec,
            agent,
            context,
            tools,
            reply,
        };
        // A send error means the workers are gone; the job is dropped with
        // its reply sender and the handle resolves as Abandoned.
        let _ = self.tx.send(job).await;
        ExecutionHandle::new(rx)
    }

    /// Stop workers after their current execution. Jobs still queued are
    /// dropped and their handles resolve as Abandoned.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            let _ = join.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Job>>>,
    coordinator: Arc<Coordinator>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // Hold the queue lock only while waiting for a job, never across the
        // execution itself.
        let job = {
            let mut queue = queue.lock().await;
            tokio::select! {
                _ = shutdown_rx.changed() => continue,
                job = queue.recv() => job,
            }
        };

        let Some(job) = job else {
            // all submitters dropped
            break;
        };

        let Job {
            execution_id,
            mut spec,
            agent,
            context,
            tools,
            reply,
        } = job;

        debug!(worker_id, execution = %execution_id, task = %spec.id(), "worker picked up execution");
        let result = coordinator
            .execute_sync(&mut spec, agent.as_ref(), context.as_deref(), tools)
            .await
            .map(|output| CompletedTask { spec, output });

        // The submitter may have dropped its handle; nothing to do then.
        let _ = reply.send(result);
    }
}
