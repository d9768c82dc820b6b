use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kindred_shared::errors::{AppError, AppResult};

pub type UserId = Uuid;
pub type MatchId = Uuid;
pub type MessageId = Uuid;

/// Dimension of the profile embedding space.
pub const EMBEDDING_DIM: usize = 1536;

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 99;

// --- Gender ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Woman,
    Man,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Woman, Gender::Man];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Woman => "woman",
            Gender::Man => "man",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "woman" => Ok(Gender::Woman),
            "man" => Ok(Gender::Man),
            other => Err(AppError::Validation(format!("unknown gender: {other}"))),
        }
    }
}

/// Parse a `lookingFor` tag list. `everyone` expands to every gender;
/// duplicates collapse, first occurrence wins.
pub fn parse_looking_for<S: AsRef<str>>(tags: &[S]) -> AppResult<Vec<Gender>> {
    let mut out: Vec<Gender> = Vec::with_capacity(Gender::ALL.len());
    for tag in tags {
        let expanded = if tag.as_ref().trim().eq_ignore_ascii_case("everyone") {
            Gender::ALL.to_vec()
        } else {
            vec![tag.as_ref().parse()?]
        };
        for g in expanded {
            if !out.contains(&g) {
                out.push(g);
            }
        }
    }
    if out.is_empty() {
        return Err(AppError::Validation("looking_for must not be empty".into()));
    }
    Ok(out)
}

// --- Location / AgeRange ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn new(min: u32, max: u32) -> AppResult<Self> {
        if min > max {
            return Err(AppError::Validation(format!(
                "age range min ({min}) exceeds max ({max})"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, age: u32) -> bool {
        self.min <= age && age <= self.max
    }
}

// --- UserProfile ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub age: u32,
    pub gender: Gender,
    pub bio: String,
    pub looking_for: Vec<Gender>,
    pub age_range: AgeRange,
    pub interests: Vec<String>,
    pub photos: Vec<String>,
    pub location: Option<Location>,
    /// Miles. `None` means unlimited.
    pub max_distance: Option<f64>,
    /// Seeded demo account, removable in bulk.
    #[serde(default)]
    pub is_demo: bool,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn has_embedding(&self) -> bool {
        self.embedding
            .as_ref()
            .is_some_and(|e| e.len() == EMBEDDING_DIM)
    }
}

/// Whole years between `dob` and `today`.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

// --- Swipes & matches ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Reject,
}

impl SwipeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeAction::Like => "like",
            SwipeAction::Reject => "reject",
        }
    }
}

impl std::str::FromStr for SwipeAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(SwipeAction::Like),
            "reject" => Ok(SwipeAction::Reject),
            other => Err(AppError::Validation(format!("unknown swipe action: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swipe {
    pub id: Uuid,
    pub swiper_id: UserId,
    pub swiped_id: UserId,
    pub action: SwipeAction,
    pub created_at: DateTime<Utc>,
}

/// A mutual like. `user1_id` is the swiper whose like completed the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub matched_at: DateTime<Utc>,
    pub ai_explanation: Option<String>,
}

impl Match {
    pub fn involves(&self, user_id: UserId) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    pub fn other_user(&self, me: UserId) -> Option<UserId> {
        if self.user1_id == me {
            Some(self.user2_id)
        } else if self.user2_id == me {
            Some(self.user1_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwipeOutcome {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
}

impl SwipeOutcome {
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn matched(match_id: MatchId) -> Self {
        Self {
            matched: true,
            match_id: Some(match_id),
        }
    }
}

// --- Messages ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub match_id: MatchId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

// --- Daily picks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickStatus {
    Pending,
    Liked,
    Passed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPick {
    pub picked_user_id: UserId,
    pub score: f64,
    pub ai_explanation: String,
    pub shared_interests: Vec<String>,
    pub status: PickStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPickSet {
    pub user_id: UserId,
    pub picks: Vec<DailyPick>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl DailyPickSet {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn all_reviewed(&self) -> bool {
        !self.picks.is_empty() && self.picks.iter().all(|p| p.status != PickStatus::Pending)
    }

    pub fn pick_mut(&mut self, picked_user_id: UserId) -> Option<&mut DailyPick> {
        self.picks.iter_mut().find(|p| p.picked_user_id == picked_user_id)
    }
}
