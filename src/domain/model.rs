use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::attributes::SignupAttributes;
use crate::utils::error::FillError;

/// 單一活動內，同一 provider 同一 fill type 的最大指派數
pub const MAX_PER_PROVIDER: u32 = 2;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(UserId);
id_type!(ActivityId);
id_type!(SignupId);
id_type!(PairId);
id_type!(ProviderId);
id_type!(AssignmentId);
id_type!(LedgerEntryId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillType {
    Slots,
    Weight,
}

impl FillType {
    pub const ALL: [FillType; 2] = [FillType::Slots, FillType::Weight];

    pub fn as_str(&self) -> &'static str {
        match self {
            FillType::Slots => "slots",
            FillType::Weight => "weight",
        }
    }
}

impl fmt::Display for FillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillType {
    type Err = FillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slots" => Ok(FillType::Slots),
            "weight" => Ok(FillType::Weight),
            other => Err(FillError::validation(format!(
                "Unknown fill type '{}', expected 'slots' or 'weight'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Transport,
    Raid,
    Other,
}

/// 由外部 CRUD 層建立的活動，此處只關心類型與建立者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub title: String,
    pub kind: ActivityKind,
    pub creator_id: UserId,
}

impl Activity {
    pub fn is_transport(&self) -> bool {
        self.kind == ActivityKind::Transport
    }

    pub fn is_creator(&self, user: UserId) -> bool {
        self.creator_id == user
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signup {
    pub id: SignupId,
    pub activity_id: ActivityId,
    pub player_id: UserId,
    pub player_name: String,
    pub attributes: SignupAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSignup {
    pub activity_id: ActivityId,
    pub player_id: UserId,
    pub player_name: String,
    pub attributes: SignupAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub user_id: UserId,
    pub provides_slots: bool,
    pub provides_weight: bool,
    pub is_active: bool,
    pub slots_origin: Option<String>,
    pub slots_target: Option<String>,
    pub weight_origin: Option<String>,
    pub weight_target: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Provider {
    pub fn supports(&self, fill_type: FillType) -> bool {
        match fill_type {
            FillType::Slots => self.provides_slots,
            FillType::Weight => self.provides_weight,
        }
    }
}

/// Provider 的能力與描述，建立與更新共用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provides_slots: bool,
    pub provides_weight: bool,
    pub slots_origin: Option<String>,
    pub slots_target: Option<String>,
    pub weight_origin: Option<String>,
    pub weight_target: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    SessionParticipation,
    Assignment,
    ManualAdjustment,
    Bonus,
    Penalty,
    Correction,
}

impl LedgerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerReason::SessionParticipation => "session_participation",
            LedgerReason::Assignment => "assignment",
            LedgerReason::ManualAdjustment => "manual_adjustment",
            LedgerReason::Bonus => "bonus",
            LedgerReason::Penalty => "penalty",
            LedgerReason::Correction => "correction",
        }
    }
}

impl fmt::Display for LedgerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerReason {
    type Err = FillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "session_participation" => Ok(LedgerReason::SessionParticipation),
            "assignment" => Ok(LedgerReason::Assignment),
            "manual_adjustment" => Ok(LedgerReason::ManualAdjustment),
            "bonus" => Ok(LedgerReason::Bonus),
            "penalty" => Ok(LedgerReason::Penalty),
            "correction" => Ok(LedgerReason::Correction),
            other => Err(FillError::validation(format!(
                "Unknown ledger reason '{}'",
                other
            ))),
        }
    }
}

/// 不可變的點數紀錄，priority 的唯一來源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointLedgerEntry {
    pub id: LedgerEntryId,
    pub provider_id: ProviderId,
    pub activity_id: Option<ActivityId>,
    pub points: i64,
    pub reason: LedgerReason,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub provider_id: ProviderId,
    pub activity_id: Option<ActivityId>,
    pub points: i64,
    pub reason: LedgerReason,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportPair {
    pub id: PairId,
    pub activity_id: ActivityId,
    pub fighter_signup_id: SignupId,
    pub transporter_signup_id: SignupId,
}

impl TransportPair {
    pub fn contains(&self, signup: SignupId) -> bool {
        self.fighter_signup_id == signup || self.transporter_signup_id == signup
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransportPair {
    pub activity_id: ActivityId,
    pub fighter_signup_id: SignupId,
    pub transporter_signup_id: SignupId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillAssignment {
    pub id: AssignmentId,
    pub activity_id: ActivityId,
    pub pair_id: PairId,
    pub provider_id: ProviderId,
    pub fill_type: FillType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFillAssignment {
    pub activity_id: ActivityId,
    pub pair_id: PairId,
    pub provider_id: ProviderId,
    pub fill_type: FillType,
}

/// 附帶目前 priority 的指派，給 UI 顯示用
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentView {
    pub assignment: FillAssignment,
    pub provider_user_id: UserId,
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStanding {
    pub provider: Provider,
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHistory {
    pub provider: Provider,
    pub priority: i64,
    pub entries: Vec<PointLedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoAssignReport {
    pub created_count: usize,
    pub created: Vec<FillAssignment>,
    pub unfilled: Vec<(PairId, FillType)>,
    pub assignments: Vec<AssignmentView>,
}
