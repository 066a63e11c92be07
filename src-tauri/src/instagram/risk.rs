//! Backend-side stealth integrity tracking.
//!
//! 5 points per 100 profiles fetched, 1 point per unfollow, and one point back
//! per idle minute since the last risky action.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::engine::types::IntegrityLevel;

const PROFILES_PER_STEP: u32 = 100;
const POINTS_PER_STEP: u32 = 5;
const POINTS_PER_UNFOLLOW: u32 = 1;
const REGEN_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct RiskState {
    profiles_fetched: u32,
    unfollows: u32,
    last_action: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct RiskTracker {
    state: Mutex<RiskState>,
}

impl RiskTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch(&self, profiles: u32) {
        self.record_fetch_at(profiles, Instant::now());
    }

    pub fn record_unfollow(&self) {
        self.record_unfollow_at(Instant::now());
    }

    pub fn integrity(&self) -> IntegrityLevel {
        self.integrity_at(Instant::now())
    }

    fn record_fetch_at(&self, profiles: u32, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.profiles_fetched = state.profiles_fetched.saturating_add(profiles);
        state.last_action = Some(now);
    }

    fn record_unfollow_at(&self, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.unfollows = state.unfollows.saturating_add(1);
        state.last_action = Some(now);
    }

    fn integrity_at(&self, now: Instant) -> IntegrityLevel {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let penalty = (state.profiles_fetched / PROFILES_PER_STEP) * POINTS_PER_STEP
            + state.unfollows * POINTS_PER_UNFOLLOW;
        let regen = state
            .last_action
            .map(|last| (now.saturating_duration_since(last).as_secs() / REGEN_PERIOD.as_secs()) as u32)
            .unwrap_or(0);
        let value = 100u32.saturating_sub(penalty).saturating_add(regen).min(100);
        IntegrityLevel::new(value as u8)
    }
}
