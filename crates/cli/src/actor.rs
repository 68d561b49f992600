//! The single control task: owns the scheduler, its quantum timer and the
//! request channel, so ticks and operator commands never interleave.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use rrsched_engine::{EntryId, SchedError, SchedResult, Scheduler, Snapshot};

const REQUEST_BUFFER: usize = 32;

pub enum Request {
    Spawn {
        name: String,
        reply: oneshot::Sender<SchedResult<EntryId>>,
    },
    Exec {
        path: PathBuf,
        reply: oneshot::Sender<SchedResult<EntryId>>,
    },
    Block {
        id: EntryId,
        reply: oneshot::Sender<SchedResult<()>>,
    },
    Run {
        id: EntryId,
        reply: oneshot::Sender<SchedResult<()>>,
    },
    Kill {
        id: EntryId,
        reply: oneshot::Sender<SchedResult<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

enum Step {
    Continue,
    Stop,
    Fatal(SchedError),
}

pub struct SchedulerActor {
    scheduler: Scheduler,
    requests: mpsc::Receiver<Request>,
}

impl SchedulerActor {
    pub fn new(scheduler: Scheduler) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let actor = Self {
            scheduler,
            requests: rx,
        };
        (actor, SchedulerHandle { tx })
    }

    /// Drive the scheduler until shutdown is requested or every handle is
    /// dropped. Returns the fatal error if the idle worker is lost; all
    /// workers are terminated before returning either way.
    pub async fn run(mut self) -> SchedResult<()> {
        let quantum = self.scheduler.quantum();
        let mut timer = time::interval_at(Instant::now() + quantum, quantum);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut epoch = self.scheduler.timer_epoch();
        info!(quantum_ms = quantum.as_millis() as u64, "scheduler actor running");

        loop {
            let step = tokio::select! {
                _ = timer.tick() => match self.scheduler.tick() {
                    Ok(running) => {
                        debug!(running = %running, "tick");
                        Step::Continue
                    }
                    Err(e) => Step::Fatal(e),
                },
                request = self.requests.recv() => match request {
                    Some(request) => self.handle(request),
                    None => Step::Stop,
                },
            };

            match step {
                Step::Continue => {}
                Step::Stop => break,
                Step::Fatal(e) => {
                    error!(error = %e, "fatal scheduler error, terminating all workers");
                    self.scheduler.shutdown();
                    return Err(e);
                }
            }

            let current = self.scheduler.timer_epoch();
            if current != epoch {
                epoch = current;
                timer.reset();
            }
        }

        self.scheduler.shutdown();
        info!("scheduler actor stopped");
        Ok(())
    }

    fn handle(&mut self, request: Request) -> Step {
        match request {
            Request::Spawn { name, reply } => {
                let result = self.scheduler.spawn(&name);
                answer(reply, result)
            }
            Request::Exec { path, reply } => {
                let result = self.scheduler.exec(&path);
                answer(reply, result)
            }
            Request::Block { id, reply } => {
                let result = self.scheduler.block(id);
                answer(reply, result)
            }
            Request::Run { id, reply } => {
                let result = self.scheduler.run(id);
                answer(reply, result)
            }
            Request::Kill { id, reply } => {
                let result = self.scheduler.kill(id);
                answer(reply, result)
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(self.scheduler.snapshot());
                Step::Continue
            }
            Request::Shutdown { reply } => {
                self.scheduler.shutdown();
                let _ = reply.send(());
                Step::Stop
            }
        }
    }
}

/// Send the result back and decide whether the actor can go on.
fn answer<T>(reply: oneshot::Sender<SchedResult<T>>, result: SchedResult<T>) -> Step {
    let fatal = match &result {
        Err(e) if e.is_fatal() => Some(e.clone()),
        _ => None,
    };
    let _ = reply.send(result);
    match fatal {
        Some(e) => Step::Fatal(e),
        None => Step::Continue,
    }
}

/// Cloneable client side of the actor.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<Request>,
}

impl SchedulerHandle {
    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Request) -> SchedResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| SchedError::ActorGone)?;
        rx.await.map_err(|_| SchedError::ActorGone)
    }

    pub async fn spawn(&self, name: &str) -> SchedResult<EntryId> {
        let name = name.to_string();
        self.call(|reply| Request::Spawn { name, reply }).await?
    }

    pub async fn exec(&self, path: PathBuf) -> SchedResult<EntryId> {
        self.call(|reply| Request::Exec { path, reply }).await?
    }

    pub async fn block(&self, id: EntryId) -> SchedResult<()> {
        self.call(|reply| Request::Block { id, reply }).await?
    }

    pub async fn run(&self, id: EntryId) -> SchedResult<()> {
        self.call(|reply| Request::Run { id, reply }).await?
    }

    pub async fn kill(&self, id: EntryId) -> SchedResult<()> {
        self.call(|reply| Request::Kill { id, reply }).await?
    }

    pub async fn snapshot(&self) -> SchedResult<Snapshot> {
        self.call(|reply| Request::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) -> SchedResult<()> {
        self.call(|reply| Request::Shutdown { reply }).await
    }
}
