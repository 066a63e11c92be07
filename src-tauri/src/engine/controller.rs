//! Top-level orchestrator.
//!
//! Owns the [`AppStatus`] state machine and reconciles session, scan,
//! integrity and unfollow outcomes into one observable state. State lives
//! behind a short-lived lock that is never held across an `.await`; views
//! (derived list, windows, snapshots) are computed from it on demand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::avatar::resolve_avatar;
use super::backend::Backend;
use super::derive::derive;
use super::integrity::{IntegrityMonitor, PollHandle};
use super::presenter::{visible_window, Viewport, VirtualWindow, OVERSCAN, ROW_HEIGHT};
use super::progress::{progress_channel, ScanEvent, PROGRESS_CAPACITY};
use super::results::{ResultSet, ScanStats};
use super::scan::ScanEngine;
use super::session::{SessionManager, SessionStore};
use super::types::{
    AppStatus, Category, DerivationState, Filter, IntegrityBand, IntegrityLevel, Profile,
    ScanProgress, Session, SortOrder,
};
use crate::error::{AppError, ErrorKind};

/// Receives state changes. Implementations must not block.
pub trait StateObserver: Send + Sync {
    fn on_state(&self, snapshot: &AppSnapshot);
    fn on_progress(&self, progress: &ScanProgress);
}

/// Observer that drops everything.
pub struct NoopObserver;

impl StateObserver for NoopObserver {
    fn on_state(&self, _snapshot: &AppSnapshot) {}
    fn on_progress(&self, _progress: &ScanProgress) {}
}

/// A user-visible error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AppError> for UserError {
    fn from(err: &AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Everything the UI renders outside the list rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppSnapshot {
    pub revision: u64,
    pub status: AppStatus,
    pub loading: bool,
    pub integrity: u8,
    pub integrity_band: IntegrityBand,
    pub can_scan: bool,
    pub session: Option<Session>,
    pub progress: Option<ScanProgress>,
    pub progress_percent: u8,
    pub stats: Option<ScanStats>,
    pub derivation: DerivationState,
    pub visible_count: usize,
    pub total_count: usize,
    pub error: Option<UserError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub index: usize,
    pub category: Category,
    pub profile: Profile,
}

/// The rows to draw for one viewport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListWindow {
    pub revision: u64,
    pub window: VirtualWindow,
    pub row_height: f64,
    pub visible_count: usize,
    pub total_count: usize,
    pub rows: Vec<ListRow>,
}

struct ControllerState {
    status: AppStatus,
    loading: bool,
    session: Option<Session>,
    integrity: IntegrityLevel,
    progress: Option<ScanProgress>,
    results: Option<ResultSet>,
    derivation: DerivationState,
    error: Option<UserError>,
    revision: u64,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            status: AppStatus::Offline,
            loading: false,
            session: None,
            integrity: IntegrityLevel::FULL,
            progress: None,
            results: None,
            derivation: DerivationState::default(),
            error: None,
            revision: 0,
        }
    }

    fn traitors(&self) -> &[Profile] {
        self.results.as_ref().map(|r| r.traitors()).unwrap_or(&[])
    }

    fn snapshot(&self) -> AppSnapshot {
        let visible_count = derive(self.traitors(), &self.derivation).len();
        AppSnapshot {
            revision: self.revision,
            status: self.status,
            loading: self.loading,
            integrity: self.integrity.value(),
            integrity_band: self.integrity.band(),
            can_scan: !matches!(self.status, AppStatus::Offline)
                && !self.status.is_in_flight()
                && !self.loading
                && self.integrity.allows_actions(),
            session: self.session.clone(),
            progress: self.progress,
            progress_percent: self.progress.map(|p| p.percent()).unwrap_or(0),
            stats: self.results.as_ref().map(|r| r.stats()),
            derivation: self.derivation.clone(),
            visible_count,
            total_count: self.traitors().len(),
            error: self.error.clone(),
        }
    }
}

pub struct AppController {
    backend: Arc<dyn Backend>,
    sessions: SessionManager,
    integrity: IntegrityMonitor,
    scanner: ScanEngine,
    observer: Arc<dyn StateObserver>,
    state: Mutex<ControllerState>,
    poller: Mutex<Option<PollHandle>>,
    unfollow_gate: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl AppController {
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<dyn SessionStore>,
        observer: Arc<dyn StateObserver>,
    ) -> Self {
        let integrity = IntegrityMonitor::new(backend.clone());
        Self::with_monitor(backend, store, observer, integrity)
    }

    pub fn with_monitor(
        backend: Arc<dyn Backend>,
        store: Arc<dyn SessionStore>,
        observer: Arc<dyn StateObserver>,
        integrity: IntegrityMonitor,
    ) -> Self {
        Self {
            sessions: SessionManager::new(backend.clone(), store),
            scanner: ScanEngine::new(backend.clone()),
            integrity,
            backend,
            observer,
            state: Mutex::new(ControllerState::new()),
            poller: Mutex::new(None),
            unfollow_gate: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mutate state, bump the revision and notify observers outside the lock.
    fn update<R>(&self, f: impl FnOnce(&mut ControllerState) -> R) -> R {
        let (out, snapshot) = {
            let mut state = self.lock();
            let out = f(&mut state);
            state.revision += 1;
            (out, state.snapshot())
        };
        if !self.closed.load(Ordering::SeqCst) {
            self.observer.on_state(&snapshot);
        }
        out
    }

    pub fn status(&self) -> AppStatus {
        self.lock().status
    }

    pub fn snapshot(&self) -> AppSnapshot {
        self.lock().snapshot()
    }

    // -- Lifecycle --

    /// Startup: warm the connection, start integrity polling, try a silent restore.
    pub async fn start(self: &Arc<Self>) {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.warmup_connection().await {
                debug!("Warmup failed (ignored): {:#}", e);
            }
        });
        self.start_polling();
        if let Err(e) = self.restore().await {
            debug!("Startup restore: {}", e);
        }
    }

    /// Idempotent: a running poller is left alone.
    pub fn start_polling(self: &Arc<Self>) {
        let mut poller = self.poller.lock().unwrap_or_else(|p| p.into_inner());
        if poller.as_ref().map_or(false, |p| p.is_running()) {
            return;
        }
        let weak = Arc::downgrade(self);
        *poller = Some(self.integrity.spawn_polling(move |level| {
            if let Some(controller) = weak.upgrade() {
                controller.apply_integrity(level);
            }
        }));
        info!("Integrity polling started");
    }

    /// Stop the poll timer and silence all further notifications.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(mut handle) = self.poller.lock().unwrap_or_else(|p| p.into_inner()).take() {
            handle.stop();
        }
        info!("Controller shut down");
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map_or(false, |p| p.is_running())
    }

    // -- Session --

    /// Claim the session slot: refused while a scan or another session change
    /// is running, and for `offline_only` changes while a session is live.
    fn begin_session_change(
        &self,
        action: &'static str,
        clear_error: bool,
        offline_only: bool,
    ) -> Result<(), AppError> {
        let snapshot = {
            let mut state = self.lock();
            let live = offline_only && state.status != AppStatus::Offline;
            if state.status.is_in_flight() || state.loading || live {
                return Err(AppError::InvalidState {
                    action,
                    status: state.status,
                });
            }
            state.loading = true;
            if clear_error {
                state.error = None;
            }
            state.revision += 1;
            state.snapshot()
        };
        self.notify(&snapshot);
        Ok(())
    }

    /// Silent resume of the persisted session. Only runs while offline, so a
    /// failure never disturbs a live session; the status stays Offline.
    pub async fn restore(&self) -> Result<AppStatus, AppError> {
        self.begin_session_change("restore a session", false, true)?;

        match self.sessions.restore().await {
            Ok(session) => Ok(self.update(|s| {
                s.loading = false;
                s.session = Some(session);
                s.status = AppStatus::Ready;
                s.status
            })),
            Err(e) => {
                self.update(|s| s.loading = false);
                Err(e)
            }
        }
    }

    /// Load a session file picked by the user. Fully replaces the previous
    /// session and its results.
    pub async fn load_session(&self, path: &str) -> Result<AppStatus, AppError> {
        self.begin_session_change("load a session", true, false)?;

        match self.sessions.load(path).await {
            Ok(session) => Ok(self.update(|s| {
                s.loading = false;
                s.session = Some(session);
                s.results = None;
                s.progress = None;
                s.status = AppStatus::Ready;
                s.status
            })),
            Err(e) => {
                self.update(|s| {
                    s.loading = false;
                    s.session = None;
                    s.results = None;
                    s.progress = None;
                    s.status = AppStatus::Offline;
                    s.error = Some(UserError::from(&e));
                });
                Err(e)
            }
        }
    }

    // -- Scan --

    /// Run a scan of `target_username`, or of the session's own account.
    ///
    /// Rejected without touching the backend while another scan is in
    /// flight, while offline, or when integrity is below the threshold.
    pub async fn start_scan(&self, target_username: Option<String>) -> Result<ScanStats, AppError> {
        let identity = self.begin_scan()?;

        let user_id = match self
            .scanner
            .resolve_target(target_username.as_deref(), identity.as_deref())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                self.fail_scan(&e);
                return Err(e);
            }
        };

        self.update(|s| s.status = AppStatus::Scanning);

        let (tx, mut rx) = progress_channel(PROGRESS_CAPACITY);
        let scan = self.scanner.scan(&user_id, tx);
        let consume = async {
            while let Some(event) = rx.recv().await {
                if let ScanEvent::Progress(progress) = event {
                    self.apply_progress(progress);
                }
            }
        };
        let (outcome, ()) = tokio::join!(scan, consume);

        let outcome = match outcome {
            Ok(result) => Ok(self.update(|s| {
                let results = ResultSet::from(result);
                let stats = results.stats();
                s.results = Some(results);
                s.progress = None;
                s.status = AppStatus::Complete;
                stats
            })),
            Err(e) => {
                self.fail_scan(&e);
                Err(e)
            }
        };

        self.refresh_integrity().await;
        outcome
    }

    fn begin_scan(&self) -> Result<Option<String>, AppError> {
        let (identity, snapshot) = {
            let mut state = self.lock();
            if state.status.is_in_flight() {
                info!("Scan request ignored: scan already in flight");
                return Err(AppError::ScanInFlight);
            }
            if state.loading {
                return Err(AppError::InvalidState {
                    action: "scan",
                    status: state.status,
                });
            }
            if state.status == AppStatus::Offline {
                return Err(AppError::NoSession);
            }
            if !state.integrity.allows_actions() {
                let err = AppError::IntegrityTooLow {
                    level: state.integrity.value(),
                };
                warn!("{}", err);
                state.error = Some(UserError::from(&err));
                state.revision += 1;
                let snapshot = state.snapshot();
                drop(state);
                self.notify(&snapshot);
                return Err(err);
            }

            state.status = AppStatus::Preparing;
            state.progress = None;
            state.error = None;
            state.revision += 1;
            let identity = state.session.as_ref().and_then(|s| s.identity_id.clone());
            (identity, state.snapshot())
        };
        self.notify(&snapshot);
        Ok(identity)
    }

    fn fail_scan(&self, err: &AppError) {
        warn!("Scan failed: {}", err);
        self.update(|s| {
            s.progress = None;
            s.status = AppStatus::Ready;
            s.error = Some(UserError::from(err));
        });
    }

    fn apply_progress(&self, progress: ScanProgress) {
        let accepted = {
            let mut state = self.lock();
            if state.status == AppStatus::Scanning {
                state.progress = Some(progress);
                true
            } else {
                false
            }
        };
        if accepted && !self.closed.load(Ordering::SeqCst) {
            self.observer.on_progress(&progress);
        }
    }

    fn notify(&self, snapshot: &AppSnapshot) {
        if !self.closed.load(Ordering::SeqCst) {
            self.observer.on_state(snapshot);
        }
    }

    // -- Unfollow --

    /// Unfollow one entry of the current result set.
    ///
    /// Returns `Ok(false)` without calling the backend when the id is not in
    /// the result set (already removed, double click). Calls run one at a time.
    pub async fn unfollow(&self, profile_id: &str) -> Result<bool, AppError> {
        let _gate = self.unfollow_gate.lock().await;

        {
            let state = self.lock();
            if !state.results.as_ref().map_or(false, |r| r.contains(profile_id)) {
                debug!("Unfollow of {} ignored: not in result set", profile_id);
                return Ok(false);
            }
            if state.status.is_in_flight() {
                return Err(AppError::InvalidState {
                    action: "unfollow",
                    status: state.status,
                });
            }
            if !state.integrity.allows_actions() {
                let err = AppError::IntegrityTooLow {
                    level: state.integrity.value(),
                };
                drop(state);
                self.update(|s| s.error = Some(UserError::from(&err)));
                return Err(err);
            }
        }
        self.update(|s| s.error = None);

        let outcome = match self.backend.unfollow_user(profile_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::Unfollow("the platform rejected the request".to_string())),
            Err(e) => Err(AppError::Unfollow(format!("{:#}", e))),
        };

        match outcome {
            Ok(()) => {
                info!("Unfollowed {}", profile_id);
                self.update(|s| {
                    if let Some(results) = s.results.as_mut() {
                        results.remove(profile_id);
                    }
                });
                self.refresh_integrity().await;
                Ok(true)
            }
            Err(e) => {
                warn!("Unfollow of {} failed: {}", profile_id, e);
                self.update(|s| s.error = Some(UserError::from(&e)));
                Err(e)
            }
        }
    }

    // -- Integrity --

    pub async fn refresh_integrity(&self) {
        match self.integrity.read().await {
            Ok(level) => self.apply_integrity(level),
            Err(e) => warn!("Integrity refresh failed: {}", e),
        }
    }

    fn apply_integrity(&self, level: IntegrityLevel) {
        if self.lock().integrity == level {
            return;
        }
        self.update(|s| s.integrity = level);
    }

    // -- Derivation --

    pub fn set_filter(&self, filter: Filter) {
        self.update(|s| s.derivation.filter = filter);
    }

    pub fn set_sort_order(&self, sort_order: SortOrder) {
        self.update(|s| s.derivation.sort_order = sort_order);
    }

    pub fn set_search_query(&self, query: &str) {
        self.update(|s| s.derivation.search_query = query.to_string());
    }

    pub fn dismiss_error(&self) {
        self.update(|s| s.error = None);
    }

    /// Current display sequence.
    pub fn derived(&self) -> Vec<Profile> {
        let state = self.lock();
        derive(state.traitors(), &state.derivation)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Rows of the display sequence that fall inside `viewport`.
    pub fn list_window(&self, viewport: Viewport) -> ListWindow {
        let state = self.lock();
        let derived = derive(state.traitors(), &state.derivation);
        let window = visible_window(derived.len(), viewport, ROW_HEIGHT, OVERSCAN);
        let rows = derived[window.start..window.end]
            .iter()
            .enumerate()
            .map(|(offset, profile)| ListRow {
                index: window.start + offset,
                category: profile.category(),
                profile: (*profile).clone(),
            })
            .collect();
        ListWindow {
            revision: state.revision,
            window,
            row_height: ROW_HEIGHT,
            visible_count: derived.len(),
            total_count: state.traitors().len(),
            rows,
        }
    }

    pub async fn avatar(&self, url: &str, username: &str) -> String {
        resolve_avatar(self.backend.as_ref(), url, username).await
    }
}
