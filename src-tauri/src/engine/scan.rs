use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use super::backend::Backend;
use super::progress::ProgressSender;
use super::types::{Profile, ScanResult, ScanStage};
use crate::error::AppError;

/// Upper bound on pages per stage, guards against a cursor that never ends.
const MAX_PAGES_PER_STAGE: usize = 10_000;

/// Runs the two-stage enumeration and computes the non-reciprocal set.
pub struct ScanEngine {
    backend: Arc<dyn Backend>,
}

impl ScanEngine {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Resolve the account to scan. An explicit username wins over the
    /// session's own identity and must resolve, otherwise the scan aborts.
    pub async fn resolve_target(
        &self,
        target_username: Option<&str>,
        session_identity: Option<&str>,
    ) -> Result<String, AppError> {
        match target_username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(username) => {
                info!("Resolving scan target '{}'", username);
                self.backend
                    .get_user_id(username)
                    .await
                    .map_err(|e| AppError::IdentityResolution {
                        username: username.to_string(),
                        reason: format!("{:#}", e),
                    })
            }
            None => session_identity
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or(AppError::NoIdentity),
        }
    }

    /// Enumerate followers then following for `user_id`.
    ///
    /// Progress is streamed through `progress`; the terminal event is sent
    /// here on both paths, so the caller only has to drain the receiver.
    pub async fn scan(
        &self,
        user_id: &str,
        mut progress: ProgressSender,
    ) -> Result<ScanResult, AppError> {
        let start = Instant::now();
        info!("Starting scan for user {}", user_id);

        let outcome = async {
            let followers = self
                .enumerate(user_id, ScanStage::Followers, &mut progress)
                .await?;
            let following = self
                .enumerate(user_id, ScanStage::Following, &mut progress)
                .await?;
            Ok::<_, AppError>((followers, following))
        }
        .await;

        match outcome {
            Ok((followers, following)) => {
                let traitors = compute_traitors(&followers, &following);
                let result = ScanResult {
                    total_followers: followers.len() as u32,
                    total_following: following.len() as u32,
                    traitors,
                    scan_time_ms: start.elapsed().as_millis() as u64,
                };
                info!(
                    "Scan complete: {} followers, {} following, {} not following back in {}ms",
                    result.total_followers,
                    result.total_following,
                    result.traitors.len(),
                    result.scan_time_ms
                );
                progress.finish(true).await;
                Ok(result)
            }
            Err(e) => {
                warn!("Scan for {} aborted: {}", user_id, e);
                progress.finish(false).await;
                Err(e)
            }
        }
    }

    async fn enumerate(
        &self,
        user_id: &str,
        stage: ScanStage,
        progress: &mut ProgressSender,
    ) -> Result<Vec<Profile>, AppError> {
        let mut profiles: Vec<Profile> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut total: Option<u32> = None;

        for _ in 0..MAX_PAGES_PER_STAGE {
            let page = self
                .backend
                .fetch_connections(user_id, stage, cursor.as_deref())
                .await
                .map_err(|e| AppError::Scan(format!("{} page failed: {:#}", stage.as_str(), e)))?;

            profiles.extend(page.profiles);
            // The reported count can lag the real list; never report less than fetched.
            let reported = *total.get_or_insert(page.total);
            let current = profiles.len() as u32;
            progress.emit(stage, current, reported.max(current)).await;

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => {
                    let done = profiles.len() as u32;
                    if reported > done {
                        // Last page: the stage is finished even if the count overstated it.
                        progress.emit(stage, done, done).await;
                    }
                    return Ok(profiles);
                }
            }
        }

        Err(AppError::Scan(format!(
            "{} enumeration exceeded {} pages",
            stage.as_str(),
            MAX_PAGES_PER_STAGE
        )))
    }
}

/// Everyone in `following` whose id is absent from `followers`, in following
/// order, each id at most once.
pub fn compute_traitors(followers: &[Profile], following: &[Profile]) -> Vec<Profile> {
    let follower_ids: HashSet<&str> = followers.iter().map(|p| p.id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    following
        .iter()
        .filter(|p| !follower_ids.contains(p.id.as_str()))
        .filter(|p| seen.insert(p.id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::profile;

    #[test]
    fn test_traitors_keep_following_order() {
        let followers = vec![profile("2", "bob")];
        let following = vec![
            profile("3", "zed"),
            profile("2", "bob"),
            profile("1", "amy"),
        ];
        let traitors = compute_traitors(&followers, &following);
        let names: Vec<_> = traitors.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, vec!["zed", "amy"]);
    }

    #[test]
    fn test_no_followers_means_everyone_is_a_traitor() {
        let following = vec![profile("1", "a"), profile("2", "b"), profile("3", "c")];
        assert_eq!(compute_traitors(&[], &following).len(), 3);
    }

    #[test]
    fn test_empty_following_yields_nothing() {
        assert!(compute_traitors(&[profile("1", "a")], &[]).is_empty());
    }

    #[test]
    fn test_duplicate_following_entries_collapse() {
        let following = vec![profile("1", "a"), profile("1", "a")];
        assert_eq!(compute_traitors(&[], &following).len(), 1);
    }
}
