use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Process-wide registry of per-sheet mutexes.
///
/// Two operations on the same sheet name serialize; different sheets never
/// contend. A timed acquisition returns its outcome to the caller instead of
/// swallowing it.
#[derive(Default, Clone)]
pub struct SheetLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

/// Returned when the timeout elapses before the sheet becomes free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTimedOut {
    pub sheet: String,
    pub waited: Duration,
}

impl SheetLocks {
    pub fn new() -> Self {
        SheetLocks::default()
    }

    fn entry(&self, sheet: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(sheet.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs `f` while holding the lock for `sheet`.
    pub fn run_exclusive<T>(
        &self,
        sheet: &str,
        timeout: Duration,
        f: impl FnOnce() -> T,
    ) -> Result<T, LockTimedOut> {
        let mutex = self.entry(sheet);
        let started = Instant::now();
        match mutex.try_lock_for(timeout) {
            Some(_guard) => {
                debug!("lock on '{}' acquired after {:?}", sheet, started.elapsed());
                Ok(f())
            }
            None => {
                let waited = started.elapsed();
                warn!("could not acquire lock on '{}' within {:?}", sheet, waited);
                Err(LockTimedOut {
                    sheet: sheet.to_string(),
                    waited,
                })
            }
        }
    }

    /// Runs `f` while holding the lock for `sheet`, waiting as long as it takes.
    pub fn run_blocking<T>(&self, sheet: &str, f: impl FnOnce() -> T) -> T {
        let mutex = self.entry(sheet);
        let _guard = mutex.lock();
        f()
    }

    pub fn is_locked(&self, sheet: &str) -> bool {
        self.entry(sheet).is_locked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn contended_lock_times_out_with_observable_outcome() {
        let locks = SheetLocks::new();
        let holder = locks.clone();
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            holder
                .run_exclusive("Form Responses 1", Duration::from_secs(1), || {
                    held_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
                .unwrap();
        });

        held_rx.recv().unwrap();
        let outcome = locks.run_exclusive("Form Responses 1", Duration::from_millis(20), || ());
        assert_eq!(outcome.unwrap_err().sheet, "Form Responses 1");

        // another sheet is unaffected
        assert!(locks.run_exclusive("Event 1", Duration::from_millis(20), || ()).is_ok());

        release_tx.send(()).unwrap();
        handle.join().unwrap();
        assert!(!locks.is_locked("Form Responses 1"));
    }
}
