use serde::{Deserialize, Serialize};

use crate::core::capacity::CapacityTracker;
use crate::domain::model::{ActivityId, FillType, NewFillAssignment, PairId, ProviderId, UserId};
use crate::domain::ports::FillRepository;
use crate::utils::error::{FillError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub activity_id: ActivityId,
    pub pair_id: PairId,
    pub provider_id: ProviderId,
    pub fill_type: FillType,
}

/// 手動指派前的檢查，依序執行，第一個失敗的條件決定錯誤
pub struct ManualAssignmentValidator<'a, R: ?Sized> {
    repo: &'a R,
    max_per_provider: u32,
}

impl<'a, R> ManualAssignmentValidator<'a, R>
where
    R: FillRepository + ?Sized,
{
    pub fn new(repo: &'a R, max_per_provider: u32) -> Self {
        Self {
            repo,
            max_per_provider,
        }
    }

    pub async fn validate(
        &self,
        request: &AssignmentRequest,
        caller: UserId,
    ) -> Result<NewFillAssignment> {
        let activity = self
            .repo
            .activity(request.activity_id)
            .await?
            .ok_or_else(|| FillError::not_found("activity", request.activity_id))?;

        if !activity.is_creator(caller) {
            return Err(FillError::unauthorized(
                "only the activity creator can assign providers",
            ));
        }

        // 停用的 provider 視同不存在
        let provider = self
            .repo
            .provider(request.provider_id)
            .await?
            .filter(|provider| provider.is_active)
            .ok_or_else(|| FillError::not_found("provider", request.provider_id))?;

        if !provider.supports(request.fill_type) {
            return Err(FillError::validation(format!(
                "Provider {} does not provide {}",
                provider.id, request.fill_type
            )));
        }

        let pair = self
            .repo
            .pair(request.pair_id)
            .await?
            .ok_or_else(|| FillError::not_found("pair", request.pair_id))?;

        if pair.activity_id != activity.id {
            return Err(FillError::validation(format!(
                "Pair {} belongs to another activity",
                pair.id
            )));
        }

        let existing = self.repo.assignments_for_activity(activity.id).await?;
        let tracker = CapacityTracker::from_assignments(&existing, self.max_per_provider);
        if !tracker.has_capacity(provider.id, request.fill_type) {
            return Err(FillError::validation(format!(
                "Provider {} already serves {} pairs with {} in this activity",
                provider.id,
                tracker.count(provider.id, request.fill_type),
                request.fill_type
            )));
        }

        if existing
            .iter()
            .any(|a| a.pair_id == pair.id && a.fill_type == request.fill_type)
        {
            return Err(FillError::validation(format!(
                "Pair {} already has a {} provider",
                pair.id, request.fill_type
            )));
        }

        Ok(NewFillAssignment {
            activity_id: activity.id,
            pair_id: pair.id,
            provider_id: provider.id,
            fill_type: request.fill_type,
        })
    }
}
