//! Import of collaborator data (activities and raw signups).
//!
//! Signup attribute bags arrive untyped and are validated here, once.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::attributes::SignupAttributes;
use crate::domain::model::{Activity, ActivityId, NewSignup, UserId};
use crate::domain::ports::FillRepository;
use crate::utils::error::{FillError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub signups: Vec<RawSignup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSignup {
    pub activity_id: ActivityId,
    pub player_id: UserId,
    pub player_name: String,
    #[serde(default)]
    pub attributes: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub activities: usize,
    pub signups: usize,
    pub rejected: Vec<String>,
}

impl SeedFile {
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// 匯入外部資料；單筆 signup 失敗只記錄不中斷
pub async fn import_seed<R>(repo: &R, seed: SeedFile) -> Result<ImportSummary>
where
    R: FillRepository + ?Sized,
{
    let mut summary = ImportSummary::default();

    for activity in seed.activities {
        repo.insert_activity(activity).await?;
        summary.activities += 1;
    }

    for raw in seed.signups {
        match import_signup(repo, &raw).await {
            Ok(()) => summary.signups += 1,
            Err(e) => {
                tracing::warn!(
                    "⚠️ Skipping signup of {} in activity {}: {}",
                    raw.player_name,
                    raw.activity_id,
                    e
                );
                summary
                    .rejected
                    .push(format!("{}@{}: {}", raw.player_name, raw.activity_id, e));
            }
        }
    }

    tracing::info!(
        "📥 Imported {} activities and {} signups ({} rejected)",
        summary.activities,
        summary.signups,
        summary.rejected.len()
    );
    Ok(summary)
}

async fn import_signup<R>(repo: &R, raw: &RawSignup) -> Result<()>
where
    R: FillRepository + ?Sized,
{
    let activity = repo
        .activity(raw.activity_id)
        .await?
        .ok_or_else(|| FillError::not_found("activity", raw.activity_id))?;
    let player_name = crate::utils::validation::require_text("player_name", &raw.player_name)?;
    let attributes = SignupAttributes::from_raw(activity.kind, &raw.attributes)?;

    repo.insert_signup(NewSignup {
        activity_id: activity.id,
        player_id: raw.player_id,
        player_name,
        attributes,
    })
    .await?;
    Ok(())
}
