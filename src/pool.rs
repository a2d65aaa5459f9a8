//! Engine pool (C2): a bounded set of interchangeable UCI engine
//! processes for a single engine binary, shared across every game whose
//! [`GameController`](crate::controller::GameController) is bound to
//! that binary — a `GameController` acquires its three playing engines
//! from here rather than spawning dedicated processes, so two
//! concurrently running games reusing the same bot binary share one
//! bounded pool of processes instead of each paying their own spawn
//! cost (spec.md §5). [`PoolRegistry`] keeps one [`EnginePool`] per
//! binary path.
//!
//! Modeled on `EngineManager` (`engine/manager.rs`):
//! engines are kept in a concurrent map, acquired for the duration of a
//! unit of work, and returned; unlike `EngineManager` (keyed by
//! `(tab_id, path)` because a user can open many analysis tabs on many
//! engines), a pool here is keyed only by its own binary path since a
//! `PoolRegistry` entry already pins that down. Capacity bounds how many
//! processes may exist at once, the warm floor is kept spawned and idle
//! so the first acquire of a game doesn't pay startup latency, and idle
//! processes past a threshold are reaped on an interval (driven by
//! [`PoolRegistry::spawn_reaper`]), the way `cleanup_engine` retires
//! idle handles.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::uci::{EngineTransport, UciProcess};
use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::{oneshot, Mutex};

type Engine = UciProcess<ChildStdout, ChildStdin>;

struct Idle {
    engine: Engine,
    since: Instant,
}

struct Inner {
    path: String,
    capacity: usize,
    warm_floor: usize,
    idle_threshold: Duration,
    idle: VecDeque<Idle>,
    in_use: usize,
    waiters: VecDeque<oneshot::Sender<Engine>>,
    shutting_down: bool,
}

/// A bounded pool of interchangeable UCI engine processes, all spawned
/// from the same binary path.
#[derive(Clone)]
pub struct EnginePool {
    inner: Arc<Mutex<Inner>>,
}

/// An engine checked out of the pool. Returns itself on drop via the
/// `return_to` handle captured at acquire time, the way a connection
/// pool guard returns a connection — callers don't need to remember to
/// give it back explicitly.
pub struct PooledEngine {
    engine: Option<Engine>,
    pool: EnginePool,
}

impl std::ops::Deref for PooledEngine {
    type Target = Engine;
    fn deref(&self) -> &Engine {
        self.engine.as_ref().expect("engine taken only on drop")
    }
}

impl std::ops::DerefMut for PooledEngine {
    fn deref_mut(&mut self) -> &mut Engine {
        self.engine.as_mut().expect("engine taken only on drop")
    }
}

impl Drop for PooledEngine {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            let pool = self.pool.clone();
            tokio::spawn(async move {
                pool.release(engine).await;
            });
        }
    }
}

impl EnginePool {
    pub fn new(path: impl Into<String>, capacity: usize, warm_floor: usize, idle_threshold: Duration) -> Self {
        EnginePool {
            inner: Arc::new(Mutex::new(Inner {
                path: path.into(),
                capacity,
                warm_floor: warm_floor.min(capacity),
                idle_threshold,
                idle: VecDeque::new(),
                in_use: 0,
                waiters: VecDeque::new(),
                shutting_down: false,
            })),
        }
    }

    /// Pre-spawn up to the warm floor so the first `acquire` of a game
    /// doesn't pay UCI handshake latency.
    pub async fn prewarm(&self) -> OrchestratorResult<()> {
        let (path, to_spawn) = {
            let inner = self.inner.lock().await;
            let existing = inner.idle.len() + inner.in_use;
            (inner.path.clone(), inner.warm_floor.saturating_sub(existing))
        };
        for _ in 0..to_spawn {
            let engine = Engine::spawn(&path, "pool-helper").await?;
            let mut inner = self.inner.lock().await;
            inner.idle.push_back(Idle { engine, since: Instant::now() });
        }
        Ok(())
    }

    /// Acquire an engine, spawning a fresh one if capacity allows and
    /// none is idle, or waiting in FIFO order if the pool is saturated.
    pub async fn acquire(&self) -> OrchestratorResult<PooledEngine> {
        enum Outcome {
            Got(Engine),
            MustSpawn(String),
            MustWait(oneshot::Receiver<Engine>),
        }

        let outcome = {
            let mut inner = self.inner.lock().await;
            if inner.shutting_down {
                return Err(OrchestratorError::PoolExhausted);
            }
            if let Some(idle) = inner.idle.pop_front() {
                inner.in_use += 1;
                Outcome::Got(idle.engine)
            } else if inner.in_use < inner.capacity {
                inner.in_use += 1;
                Outcome::MustSpawn(inner.path.clone())
            } else {
                let (tx, rx) = oneshot::channel();
                inner.waiters.push_back(tx);
                Outcome::MustWait(rx)
            }
        };

        let engine = match outcome {
            Outcome::Got(engine) => engine,
            Outcome::MustSpawn(path) => match Engine::spawn(&path, "pool-helper").await {
                Ok(engine) => engine,
                Err(e) => {
                    // undo the reserved slot, nobody will call release()
                    let mut inner = self.inner.lock().await;
                    inner.in_use -= 1;
                    return Err(e);
                }
            },
            Outcome::MustWait(rx) => rx.await.map_err(|_| OrchestratorError::PoolExhausted)?,
        };

        Ok(PooledEngine { engine: Some(engine), pool: self.clone() })
    }

    async fn release(&self, engine: Engine) {
        let mut inner = self.inner.lock().await;
        if inner.shutting_down {
            inner.in_use = inner.in_use.saturating_sub(1);
            drop(inner);
            let mut engine = engine;
            let _ = engine.kill().await;
            return;
        }
        if let Some(tx) = inner.waiters.pop_front() {
            // hand straight to the next FIFO waiter without ever going idle
            let _ = tx.send(engine);
            return;
        }
        inner.in_use -= 1;
        inner.idle.push_back(Idle { engine, since: Instant::now() });
    }

    /// Cancel the reaper (the caller simply stops scheduling it), kill
    /// every idle engine, and fail every queued waiter rather than
    /// handing it an engine about to die (spec.md §4.2). Engines already
    /// checked out are killed as they're released afterward, since this
    /// pool never holds their handles while they're in use.
    pub async fn shutdown(&self) {
        let (idle, waiters) = {
            let mut inner = self.inner.lock().await;
            inner.shutting_down = true;
            let idle: Vec<Engine> = inner.idle.drain(..).map(|i| i.engine).collect();
            let waiters: Vec<_> = inner.waiters.drain(..).collect();
            (idle, waiters)
        };
        drop(waiters); // dropping each sender fails the matching acquire() wait
        for mut engine in idle {
            let _ = engine.kill().await;
        }
    }

    /// Kill and drop any idle engine that's been sitting past the idle
    /// threshold, keeping at least `warm_floor` around. Intended to be
    /// driven by a periodic `tokio::time::interval` in the controller.
    pub async fn reap_idle(&self) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let warm_floor = inner.warm_floor;
        let mut kept = VecDeque::new();
        while let Some(idle) = inner.idle.pop_front() {
            if kept.len() < warm_floor || now.duration_since(idle.since) < inner.idle_threshold {
                kept.push_back(idle);
            } else {
                let mut engine = idle.engine;
                tokio::spawn(async move {
                    let _ = engine.kill().await;
                });
            }
        }
        inner.idle = kept;
    }

    pub async fn in_use_count(&self) -> usize {
        self.inner.lock().await.in_use
    }

    pub async fn idle_count(&self) -> usize {
        self.inner.lock().await.idle.len()
    }
}

impl EngineTransport for PooledEngine {
    async fn send_command(&mut self, command: &str) -> OrchestratorResult<()> {
        (**self).send_command(command).await
    }

    async fn wait_for_line(&mut self, predicate: impl Fn(&str) -> bool + Send) -> OrchestratorResult<String> {
        (**self).wait_for_line(predicate).await
    }

    async fn read_line(&mut self) -> OrchestratorResult<String> {
        (**self).read_line().await
    }

    async fn set_options(&mut self, options: &HashMap<String, String>) -> OrchestratorResult<()> {
        (**self).set_options(options).await
    }

    async fn set_position(&mut self, fen: &str, moves: &[String]) -> OrchestratorResult<()> {
        (**self).set_position(fen, moves).await
    }

    async fn best_move(&mut self, time_ms: u64) -> OrchestratorResult<String> {
        (**self).best_move(time_ms).await
    }

    async fn best_move_with_searchmoves(&mut self, time_ms: u64, candidates: &[String]) -> OrchestratorResult<String> {
        (**self).best_move_with_searchmoves(time_ms, candidates).await
    }

    async fn stop(&mut self) -> OrchestratorResult<()> {
        (**self).stop().await
    }

    async fn kill(&mut self) -> OrchestratorResult<()> {
        (**self).kill().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Path-keyed registry of [`EnginePool`]s, so games that happen to share
/// an engine binary share one bounded pool of processes instead of each
/// spawning its own (spec.md §5: engines are shared via the pool across
/// concurrently running games). A `DashMap` rather than one
/// mutex-guarded `HashMap` lets many games look up or create an entry
/// concurrently without serializing behind a single lock for the whole
/// registry — the same reasoning `EngineManager` applies to its own
/// `DashMap`-keyed table, generalized here from a `(tab, path)` key down
/// to a bare path since this registry has no notion of tabs.
#[derive(Clone, Default)]
pub struct PoolRegistry {
    pools: Arc<DashMap<String, EnginePool>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        PoolRegistry { pools: Arc::new(DashMap::new()) }
    }

    /// Return the pool for `path`, creating it with the given sizing if
    /// this is the first game to reference that binary.
    pub fn get_or_create(&self, path: &str, capacity: usize, warm_floor: usize, idle_threshold: Duration) -> EnginePool {
        self.pools
            .entry(path.to_string())
            .or_insert_with(|| EnginePool::new(path, capacity, warm_floor, idle_threshold))
            .clone()
    }

    /// Spawn a background task that reaps idle engines in every pool
    /// this registry currently knows about, once per `interval` —
    /// generalizes spec.md §4.2's per-game reaper to run once across
    /// every path-keyed pool rather than needing one task per game.
    pub fn spawn_reaper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                for pool in registry.pools.iter() {
                    pool.reap_idle().await;
                }
            }
        })
    }
}
