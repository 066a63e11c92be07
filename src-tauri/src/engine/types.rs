use serde::{Deserialize, Serialize};

/// Integrity below this value disables scans and unfollows.
pub const ACTION_THRESHOLD: u8 = 20;
/// Lower bound of the "caution" band.
pub const CAUTION_THRESHOLD: u8 = 50;
/// Lower bound of the "optimal" band.
pub const OPTIMAL_THRESHOLD: u8 = 80;

/// An account as returned by the platform.
///
/// Immutable once produced by a scan and keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub full_name: String,
    #[serde(rename = "profile_pic_url")]
    pub avatar_url: String,
    #[serde(rename = "profile_pic_url_hd", default)]
    pub avatar_url_hd: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_business_account: bool,
    #[serde(default)]
    pub is_professional_account: bool,
    #[serde(default)]
    pub category_name: Option<String>,
}

/// Mutually exclusive classification of a [`Profile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Business,
    Private,
    Personal,
}

impl Profile {
    /// Business flags win over `is_private`.
    pub fn category(&self) -> Category {
        if self.is_business() {
            Category::Business
        } else if self.is_private {
            Category::Private
        } else {
            Category::Personal
        }
    }

    fn is_business(&self) -> bool {
        self.is_business_account
            || self.is_verified
            || self.is_professional_account
            || self
                .category_name
                .as_deref()
                .map_or(false, |c| !c.is_empty())
    }

    /// The best available avatar URL, HD first.
    pub fn best_avatar_url(&self) -> &str {
        self.avatar_url_hd
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.avatar_url)
    }
}

/// Where the live session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOrigin {
    Restored,
    Loaded,
}

/// The authenticated context. At most one is live at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub origin: SessionOrigin,
    pub path: Option<String>,
    pub identity_id: Option<String>,
    pub current_identity: Option<Profile>,
}

/// Remaining automation headroom, always within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntegrityLevel(u8);

impl IntegrityLevel {
    pub const FULL: IntegrityLevel = IntegrityLevel(100);

    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn band(self) -> IntegrityBand {
        match self.0 {
            v if v < ACTION_THRESHOLD => IntegrityBand::Danger,
            v if v < CAUTION_THRESHOLD => IntegrityBand::Risk,
            v if v < OPTIMAL_THRESHOLD => IntegrityBand::Caution,
            _ => IntegrityBand::Optimal,
        }
    }

    /// Whether risk-consuming actions are permitted.
    pub fn allows_actions(self) -> bool {
        self.0 >= ACTION_THRESHOLD
    }
}

impl Default for IntegrityLevel {
    fn default() -> Self {
        Self::FULL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityBand {
    Danger,
    Risk,
    Caution,
    Optimal,
}

/// Output of one completed scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Scan order, never sorted.
    pub traitors: Vec<Profile>,
    pub total_followers: u32,
    pub total_following: u32,
    pub scan_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    Followers,
    Following,
}

impl ScanStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanStage::Followers => "followers",
            ScanStage::Following => "following",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub stage: ScanStage,
    pub current: u32,
    pub total: u32,
}

impl ScanProgress {
    /// Completion in whole percent, capped at 100.
    pub fn percent(&self) -> u8 {
        let ratio = self.current as f64 / self.total.max(1) as f64;
        (ratio * 100.0).round().min(100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Personal,
    Business,
    Private,
}

impl Filter {
    pub fn matches(self, profile: &Profile) -> bool {
        match self {
            Filter::All => true,
            Filter::Personal => profile.category() == Category::Personal,
            Filter::Business => profile.category() == Category::Business,
            Filter::Private => profile.category() == Category::Private,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Default,
    AlphaAsc,
    AlphaDesc,
}

/// UI-only inputs of the derivation pipeline. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DerivationState {
    pub filter: Filter,
    pub sort_order: SortOrder,
    pub search_query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppStatus {
    Offline,
    Ready,
    Preparing,
    Scanning,
    Complete,
}

impl AppStatus {
    /// Preparing and Scanning both mean a scan owns the controller.
    pub fn is_in_flight(self) -> bool {
        matches!(self, AppStatus::Preparing | AppStatus::Scanning)
    }
}

#[cfg(test)]
pub(crate) fn profile(id: &str, username: &str) -> Profile {
    Profile {
        id: id.to_string(),
        username: username.to_string(),
        full_name: String::new(),
        avatar_url: format!("https://cdn.example.com/{}.jpg", id),
        avatar_url_hd: None,
        is_verified: false,
        is_private: false,
        is_business_account: false,
        is_professional_account: false,
        category_name: None,
    }
}
