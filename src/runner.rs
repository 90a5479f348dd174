use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::engine::{Progress, SequenceEngine};
use crate::error::ConfigError;
use crate::model::Sequence;

struct Shared {
    engine: Mutex<SequenceEngine>,
    wake: Condvar,
    shutdown: AtomicBool,
}

/// Drives a [`SequenceEngine`] from a dedicated worker thread.
///
/// The worker holds the engine lock whenever it acts, so once [`Runner::stop`] returns no
/// further clicks or events happen for the stopped run.
pub struct Runner {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Runner {
    pub fn spawn(engine: SequenceEngine) -> Self {
        let shared = Arc::new(Shared {
            engine: Mutex::new(engine),
            wake: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || worker_loop(&worker_shared));
        Self { shared, worker: Some(worker) }
    }

    pub fn start(&self, sequence: Arc<Sequence>) -> Result<(), ConfigError> {
        self.shared.engine.lock().start(sequence, Instant::now())?;
        self.shared.wake.notify_one();
        Ok(())
    }

    pub fn stop(&self) {
        self.shared.engine.lock().stop();
        self.shared.wake.notify_one();
    }

    pub fn is_running(&self) -> bool { self.shared.engine.lock().is_running() }

    pub fn progress(&self) -> Option<Progress> { self.shared.engine.lock().progress() }

    /// Blocks until the current run ends or `timeout` passes. Returns whether it ended.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        // Overflow means no practical limit
        let deadline = Instant::now().checked_add(timeout);
        while self.is_running() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        true
    }
}

fn worker_loop(shared: &Shared) {
    let mut engine = shared.engine.lock();
    while !shared.shutdown.load(Ordering::Relaxed) {
        match engine.next_timer() {
            None => shared.wake.wait(&mut engine),
            Some((at, generation)) => {
                let now = Instant::now();
                if now >= at {
                    engine.fire(generation, now);
                    // Timers can be due on arrival; let start/stop in between
                    MutexGuard::bump(&mut engine);
                } else {
                    // Woken early by start/stop; the loop re-reads the timer
                    shared.wake.wait_until(&mut engine, at);
                }
            }
        }
    }
    debug!("runner worker exiting");
}

impl Drop for Runner {
    fn drop(&mut self) {
        {
            let mut engine = self.shared.engine.lock();
            engine.stop();
            self.shared.shutdown.store(true, Ordering::Relaxed);
        }
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("runner worker panicked");
            }
        }
    }
}
