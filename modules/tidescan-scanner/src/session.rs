//! Scan session context.
//!
//! Holds the state the dashboard would keep per user session (the loaded
//! configuration, the result store, and the scan-in-progress flag) as an
//! explicit object passed to the pipeline, never ambient globals. Two scans
//! never run concurrently against the same store: a second trigger while one
//! is active is rejected, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tidescan_common::{Config, ScanError};

use crate::store::ResultStore;

pub struct ScanSession {
    config: Config,
    store: Mutex<ResultStore>,
    scan_in_progress: AtomicBool,
}

impl ScanSession {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Mutex::new(ResultStore::new()),
            scan_in_progress: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lock the store for one operation. Callers hold the guard briefly and
    /// never across an await.
    pub fn store(&self) -> MutexGuard<'_, ResultStore> {
        self.store.lock().expect("result store lock poisoned")
    }

    /// Claim the session for a scan. Fails with a conflict error if a scan
    /// is already running; the returned guard releases the claim on drop,
    /// so an aborted scan leaves the session usable.
    pub fn begin_scan(&self) -> Result<ScanGuard<'_>, ScanError> {
        if self
            .scan_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ScanError::ScanInProgress);
        }
        Ok(ScanGuard { session: self })
    }

    pub fn scan_in_progress(&self) -> bool {
        self.scan_in_progress.load(Ordering::Acquire)
    }
}

pub struct ScanGuard<'a> {
    session: &'a ScanSession,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.session.scan_in_progress.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_scan_is_rejected_while_first_runs() {
        let session = ScanSession::new(Config::default());
        let guard = session.begin_scan().unwrap();
        assert!(matches!(
            session.begin_scan(),
            Err(ScanError::ScanInProgress)
        ));
        drop(guard);
        assert!(session.begin_scan().is_ok());
    }

    #[test]
    fn dropped_guard_releases_the_flag() {
        let session = ScanSession::new(Config::default());
        {
            let _guard = session.begin_scan().unwrap();
            assert!(session.scan_in_progress());
        }
        assert!(!session.scan_in_progress());
    }
}
