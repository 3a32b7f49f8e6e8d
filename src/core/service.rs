use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::auto_assign::AutoAssignEngine;
use crate::core::ledger::{assignment_entries, compare_standing, priorities_by_provider, priority, priority_of};
use crate::core::locks::ActivityLocks;
use crate::core::manual_assign::{AssignmentRequest, ManualAssignmentValidator};
use crate::core::pairing::PairRegistry;
use crate::core::partner_match::{MatchSession, PreferredPartnerMatcher};
use crate::domain::model::{
    Activity, ActivityId, AssignmentId, AssignmentView, AutoAssignReport, FillAssignment,
    FillType, LedgerReason, NewLedgerEntry, PairId, PointLedgerEntry, Provider, ProviderHistory,
    ProviderId, ProviderProfile, ProviderStanding, Signup, SignupId, TransportPair, UserId,
    MAX_PER_PROVIDER,
};
use crate::domain::ports::FillRepository;
use crate::utils::error::{FillError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub max_per_provider: u32,
    pub fill_order: Vec<FillType>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_per_provider: MAX_PER_PROVIDER,
            fill_order: FillType::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRequest {
    pub provider_id: ProviderId,
    pub points: i64,
    pub reason: LedgerReason,
    pub activity_id: Option<ActivityId>,
    pub note: Option<String>,
}

/// 引擎對外的操作入口。所有「先讀後寫」的流程都在活動鎖內執行。
pub struct FillService<R: FillRepository> {
    repo: R,
    settings: EngineSettings,
    locks: ActivityLocks,
}

impl<R: FillRepository> FillService<R> {
    pub fn new(repo: R, settings: EngineSettings) -> Self {
        Self {
            repo,
            settings,
            locks: ActivityLocks::new(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    async fn require_activity(&self, id: ActivityId) -> Result<Activity> {
        self.repo
            .activity(id)
            .await?
            .ok_or_else(|| FillError::not_found("activity", id))
    }

    async fn require_provider(&self, id: ProviderId) -> Result<Provider> {
        self.repo
            .provider(id)
            .await?
            .ok_or_else(|| FillError::not_found("provider", id))
    }

    async fn require_signup(&self, id: SignupId) -> Result<Signup> {
        self.repo
            .signup(id)
            .await?
            .ok_or_else(|| FillError::not_found("signup", id))
    }

    async fn require_pair(&self, id: PairId) -> Result<TransportPair> {
        self.repo
            .pair(id)
            .await?
            .ok_or_else(|| FillError::not_found("pair", id))
    }

    fn require_creator(activity: &Activity, caller: UserId, action: &str) -> Result<()> {
        if activity.is_creator(caller) {
            Ok(())
        } else {
            Err(FillError::unauthorized(format!(
                "only the activity creator can {}",
                action
            )))
        }
    }

    fn require_owner(provider: &Provider, caller: UserId) -> Result<()> {
        if provider.user_id == caller {
            Ok(())
        } else {
            Err(FillError::unauthorized(
                "only the owner can change a provider",
            ))
        }
    }

    // ---- assignments ----

    pub async fn list_assignments(&self, activity_id: ActivityId) -> Result<Vec<AssignmentView>> {
        let activity = self.require_activity(activity_id).await?;
        let mut assignments = self.repo.assignments_for_activity(activity.id).await?;
        assignments.sort_by_key(|a| a.id);

        let providers: HashMap<ProviderId, Provider> = self
            .repo
            .providers()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let priorities = priorities_by_provider(&self.repo.ledger_entries().await?);

        assignments
            .into_iter()
            .map(|assignment| {
                let provider = providers
                    .get(&assignment.provider_id)
                    .ok_or_else(|| FillError::not_found("provider", assignment.provider_id))?;
                Ok(AssignmentView {
                    provider_user_id: provider.user_id,
                    priority: priority_of(&priorities, provider.id),
                    assignment,
                })
            })
            .collect()
    }

    pub async fn auto_assign(
        &self,
        activity_id: ActivityId,
        caller: UserId,
    ) -> Result<AutoAssignReport> {
        let outcome = {
            let _guard = self.locks.acquire(activity_id).await;
            AutoAssignEngine::new(
                &self.repo,
                self.settings.max_per_provider,
                &self.settings.fill_order,
            )
            .run(activity_id, caller)
            .await?
        };

        let assignments = self.list_assignments(activity_id).await?;
        Ok(AutoAssignReport {
            created_count: outcome.created.len(),
            created: outcome.created,
            unfilled: outcome.unfilled,
            assignments,
        })
    }

    pub async fn create_assignment(
        &self,
        request: AssignmentRequest,
        caller: UserId,
    ) -> Result<FillAssignment> {
        let _guard = self.locks.acquire(request.activity_id).await;

        let new_assignment = ManualAssignmentValidator::new(&self.repo, self.settings.max_per_provider)
            .validate(&request, caller)
            .await?;
        let ledger = assignment_entries(new_assignment.provider_id, new_assignment.activity_id);
        let assignment = self.repo.insert_assignment(new_assignment, ledger).await?;

        tracing::info!(
            "✅ Provider {} assigned {} for pair {} in activity {}",
            assignment.provider_id,
            assignment.fill_type,
            assignment.pair_id,
            assignment.activity_id
        );
        Ok(assignment)
    }

    pub async fn delete_assignment(&self, id: AssignmentId, caller: UserId) -> Result<()> {
        let assignment = self
            .repo
            .assignment(id)
            .await?
            .ok_or_else(|| FillError::not_found("assignment", id))?;
        let activity = self.require_activity(assignment.activity_id).await?;
        Self::require_creator(&activity, caller, "remove assignments")?;

        let _guard = self.locks.acquire(activity.id).await;
        self.repo.delete_assignment(id).await?;
        tracing::info!("🗑️ Assignment {} removed from activity {}", id, activity.id);
        Ok(())
    }

    // ---- providers & points ----

    pub async fn register_provider(
        &self,
        user: UserId,
        profile: ProviderProfile,
    ) -> Result<ProviderStanding> {
        let profile = normalize_profile(profile)?;

        if !self.repo.has_transport_participation(user).await? {
            return Err(FillError::unauthorized(
                "register as provider after taking part in a transport activity",
            ));
        }

        if let Some(existing) = self.repo.provider_for_user(user).await? {
            return Err(FillError::conflict(format!(
                "user {} already has provider {}",
                user, existing.id
            )));
        }

        let provider = self.repo.insert_provider(user, profile).await?;
        tracing::info!(
            "📝 Provider {} registered for user {} (slots: {}, weight: {})",
            provider.id,
            user,
            provider.provides_slots,
            provider.provides_weight
        );
        Ok(ProviderStanding {
            provider,
            priority: 0,
        })
    }

    pub async fn update_provider(
        &self,
        provider_id: ProviderId,
        caller: UserId,
        profile: ProviderProfile,
    ) -> Result<Provider> {
        let provider = self.require_provider(provider_id).await?;
        Self::require_owner(&provider, caller)?;
        let profile = normalize_profile(profile)?;

        self.repo
            .update_provider(Provider {
                provides_slots: profile.provides_slots,
                provides_weight: profile.provides_weight,
                slots_origin: profile.slots_origin,
                slots_target: profile.slots_target,
                weight_origin: profile.weight_origin,
                weight_target: profile.weight_target,
                notes: profile.notes,
                ..provider
            })
            .await
    }

    pub async fn deactivate_provider(
        &self,
        provider_id: ProviderId,
        caller: UserId,
    ) -> Result<Provider> {
        self.set_provider_active(provider_id, caller, false).await
    }

    pub async fn reactivate_provider(
        &self,
        provider_id: ProviderId,
        caller: UserId,
    ) -> Result<Provider> {
        self.set_provider_active(provider_id, caller, true).await
    }

    async fn set_provider_active(
        &self,
        provider_id: ProviderId,
        caller: UserId,
        is_active: bool,
    ) -> Result<Provider> {
        let provider = self.require_provider(provider_id).await?;
        Self::require_owner(&provider, caller)?;
        if provider.is_active == is_active {
            return Ok(provider);
        }
        let updated = self
            .repo
            .update_provider(Provider {
                is_active,
                ..provider
            })
            .await?;
        tracing::info!(
            "Provider {} {}",
            updated.id,
            if is_active { "reactivated" } else { "deactivated" }
        );
        Ok(updated)
    }

    pub async fn add_points(
        &self,
        request: PointsRequest,
        caller: UserId,
    ) -> Result<PointLedgerEntry> {
        let provider = self.require_provider(request.provider_id).await?;

        if let Some(activity_id) = request.activity_id {
            let activity = self.require_activity(activity_id).await?;
            Self::require_creator(&activity, caller, "award points for it")?;
        }

        if request.points == 0 {
            return Err(FillError::validation("points must be non-zero"));
        }

        let note = request
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let entry = self
            .repo
            .append_ledger(NewLedgerEntry {
                provider_id: provider.id,
                activity_id: request.activity_id,
                points: request.points,
                reason: request.reason,
                note,
            })
            .await?;
        tracing::info!(
            "➕ {} points ({}) for provider {} by user {}",
            entry.points,
            entry.reason,
            provider.id,
            caller
        );
        Ok(entry)
    }

    /// Active providers, highest priority first, ties by id.
    pub async fn list_providers(&self) -> Result<Vec<ProviderStanding>> {
        let priorities = priorities_by_provider(&self.repo.ledger_entries().await?);
        let mut ranked: Vec<(Provider, i64)> = self
            .repo
            .providers()
            .await?
            .into_iter()
            .filter(|p| p.is_active)
            .map(|p| {
                let priority = priority_of(&priorities, p.id);
                (p, priority)
            })
            .collect();
        ranked.sort_by(|a, b| compare_standing((&a.0, a.1), (&b.0, b.1)));

        Ok(ranked
            .into_iter()
            .map(|(provider, priority)| ProviderStanding { provider, priority })
            .collect())
    }

    pub async fn provider_ledger(&self, provider_id: ProviderId) -> Result<ProviderHistory> {
        let provider = self.require_provider(provider_id).await?;
        let mut entries = self.repo.ledger_for_provider(provider.id).await?;
        entries.sort_by_key(|e| e.id);
        Ok(ProviderHistory {
            priority: priority(&entries),
            provider,
            entries,
        })
    }

    // ---- pairs ----

    pub async fn create_pair(
        &self,
        activity_id: ActivityId,
        fighter: SignupId,
        transporter: SignupId,
        caller: UserId,
    ) -> Result<TransportPair> {
        let activity = self.require_activity(activity_id).await?;
        if !activity.is_transport() {
            return Err(FillError::validation(format!(
                "Activity {} is not a transport activity",
                activity.id
            )));
        }

        let fighter = self.require_signup(fighter).await?;
        let transporter = self.require_signup(transporter).await?;
        let is_participant = fighter.player_id == caller || transporter.player_id == caller;
        if !activity.is_creator(caller) && !is_participant {
            return Err(FillError::unauthorized(
                "only the activity creator or one of the partners can create a pair",
            ));
        }

        let _guard = self.locks.acquire(activity.id).await;
        let mut registry = PairRegistry::load(&self.repo, activity.id).await?;
        let pair = registry.create(&self.repo, &fighter, &transporter).await?;
        tracing::info!(
            "🔗 Pair {} created: {} + {}",
            pair.id,
            fighter.player_name,
            transporter.player_name
        );
        Ok(pair)
    }

    pub async fn update_pair(
        &self,
        pair_id: PairId,
        fighter: SignupId,
        transporter: SignupId,
        caller: UserId,
    ) -> Result<TransportPair> {
        let pair = self.require_pair(pair_id).await?;
        let activity = self.require_activity(pair.activity_id).await?;
        Self::require_creator(&activity, caller, "change pairs")?;

        let fighter = self.require_signup(fighter).await?;
        let transporter = self.require_signup(transporter).await?;

        let _guard = self.locks.acquire(activity.id).await;
        let mut registry = PairRegistry::load(&self.repo, activity.id).await?;
        registry
            .update(&self.repo, pair.id, &fighter, &transporter)
            .await
    }

    pub async fn delete_pair(&self, pair_id: PairId, caller: UserId) -> Result<()> {
        let pair = self.require_pair(pair_id).await?;
        let activity = self.require_activity(pair.activity_id).await?;
        Self::require_creator(&activity, caller, "remove pairs")?;

        let _guard = self.locks.acquire(activity.id).await;
        self.repo.delete_pair(pair.id).await?;
        tracing::info!("🗑️ Pair {} removed from activity {}", pair.id, activity.id);
        Ok(())
    }

    /// Runs the preferred-partner pass at most once per activity and session.
    pub async fn match_partners(
        &self,
        activity_id: ActivityId,
        session: &mut MatchSession,
    ) -> Result<Vec<TransportPair>> {
        let activity = self.require_activity(activity_id).await?;
        if !activity.is_transport() || session.has_run(activity.id) {
            return Ok(Vec::new());
        }

        let _guard = self.locks.acquire(activity.id).await;
        let signups = self.repo.signups_for_activity(activity.id).await?;
        let mut registry = PairRegistry::load(&self.repo, activity.id).await?;
        // 讀取都成功才算這個 session 跑過
        session.begin(activity.id);
        Ok(PreferredPartnerMatcher::new(&self.repo)
            .run(&signups, &mut registry)
            .await)
    }

    pub async fn remove_activity(&self, activity_id: ActivityId, caller: UserId) -> Result<()> {
        let activity = self.require_activity(activity_id).await?;
        Self::require_creator(&activity, caller, "delete it")?;
        let _guard = self.locks.acquire(activity.id).await;
        self.repo.remove_activity(activity.id).await
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_profile(profile: ProviderProfile) -> Result<ProviderProfile> {
    if !profile.provides_slots && !profile.provides_weight {
        return Err(FillError::validation(
            "A provider must offer slots, weight or both",
        ));
    }
    Ok(ProviderProfile {
        provides_slots: profile.provides_slots,
        provides_weight: profile.provides_weight,
        slots_origin: clean(profile.slots_origin),
        slots_target: clean(profile.slots_target),
        weight_origin: clean(profile.weight_origin),
        weight_target: clean(profile.weight_target),
        notes: clean(profile.notes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::domain::attributes::{SignupAttributes, TransportRole, TransportSignup};
    use crate::domain::model::{ActivityKind, NewFillAssignment, NewSignup, NewTransportPair};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// MemoryStore whose next signup listing fails once.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_next_listing: AtomicBool,
    }

    #[async_trait]
    impl FillRepository for FlakyStore {
        async fn activity(&self, id: ActivityId) -> Result<Option<Activity>> {
            self.inner.activity(id).await
        }
        async fn insert_activity(&self, activity: Activity) -> Result<Activity> {
            self.inner.insert_activity(activity).await
        }
        async fn remove_activity(&self, id: ActivityId) -> Result<()> {
            self.inner.remove_activity(id).await
        }
        async fn signup(&self, id: SignupId) -> Result<Option<Signup>> {
            self.inner.signup(id).await
        }
        async fn signups_for_activity(&self, activity: ActivityId) -> Result<Vec<Signup>> {
            if self.fail_next_listing.swap(false, Ordering::SeqCst) {
                return Err(FillError::IoError(std::io::Error::other("store offline")));
            }
            self.inner.signups_for_activity(activity).await
        }
        async fn insert_signup(&self, signup: NewSignup) -> Result<Signup> {
            self.inner.insert_signup(signup).await
        }
        async fn has_transport_participation(&self, user: UserId) -> Result<bool> {
            self.inner.has_transport_participation(user).await
        }
        async fn pair(&self, id: PairId) -> Result<Option<TransportPair>> {
            self.inner.pair(id).await
        }
        async fn pairs_for_activity(&self, activity: ActivityId) -> Result<Vec<TransportPair>> {
            self.inner.pairs_for_activity(activity).await
        }
        async fn insert_pair(&self, pair: NewTransportPair) -> Result<TransportPair> {
            self.inner.insert_pair(pair).await
        }
        async fn update_pair(&self, pair: TransportPair) -> Result<TransportPair> {
            self.inner.update_pair(pair).await
        }
        async fn delete_pair(&self, id: PairId) -> Result<()> {
            self.inner.delete_pair(id).await
        }
        async fn provider(&self, id: ProviderId) -> Result<Option<Provider>> {
            self.inner.provider(id).await
        }
        async fn provider_for_user(&self, user: UserId) -> Result<Option<Provider>> {
            self.inner.provider_for_user(user).await
        }
        async fn providers(&self) -> Result<Vec<Provider>> {
            self.inner.providers().await
        }
        async fn insert_provider(&self, user: UserId, profile: ProviderProfile) -> Result<Provider> {
            self.inner.insert_provider(user, profile).await
        }
        async fn update_provider(&self, provider: Provider) -> Result<Provider> {
            self.inner.update_provider(provider).await
        }
        async fn assignment(&self, id: AssignmentId) -> Result<Option<FillAssignment>> {
            self.inner.assignment(id).await
        }
        async fn assignments_for_activity(
            &self,
            activity: ActivityId,
        ) -> Result<Vec<FillAssignment>> {
            self.inner.assignments_for_activity(activity).await
        }
        async fn insert_assignment(
            &self,
            assignment: NewFillAssignment,
            ledger: Vec<NewLedgerEntry>,
        ) -> Result<FillAssignment> {
            self.inner.insert_assignment(assignment, ledger).await
        }
        async fn delete_assignment(&self, id: AssignmentId) -> Result<()> {
            self.inner.delete_assignment(id).await
        }
        async fn ledger_entries(&self) -> Result<Vec<PointLedgerEntry>> {
            self.inner.ledger_entries().await
        }
        async fn ledger_for_provider(&self, provider: ProviderId) -> Result<Vec<PointLedgerEntry>> {
            self.inner.ledger_for_provider(provider).await
        }
        async fn append_ledger(&self, entry: NewLedgerEntry) -> Result<PointLedgerEntry> {
            self.inner.append_ledger(entry).await
        }
    }

    fn transport_signup(player: u64, name: &str, role: TransportRole, hint: Option<&str>) -> NewSignup {
        NewSignup {
            activity_id: ActivityId(1),
            player_id: UserId(player),
            player_name: name.to_string(),
            attributes: SignupAttributes::Transport(TransportSignup {
                role,
                origin: "Lymhurst".to_string(),
                destination: "Caerleon".to_string(),
                preferred_partner: hint.map(str::to_string),
            }),
        }
    }

    #[tokio::test]
    async fn test_failed_load_does_not_use_up_the_session() {
        let store = FlakyStore::default();
        store
            .insert_activity(Activity {
                id: ActivityId(1),
                title: "Caerleon haul".to_string(),
                kind: ActivityKind::Transport,
                creator_id: UserId(1),
            })
            .await
            .unwrap();
        store
            .insert_signup(transport_signup(10, "Ash", TransportRole::Fighter, Some("Mule")))
            .await
            .unwrap();
        store
            .insert_signup(transport_signup(11, "Mule", TransportRole::Transporter, None))
            .await
            .unwrap();

        let service = FillService::new(store, EngineSettings::default());
        let mut session = MatchSession::new();

        service
            .repository()
            .fail_next_listing
            .store(true, Ordering::SeqCst);
        let err = service
            .match_partners(ActivityId(1), &mut session)
            .await
            .unwrap_err();
        assert!(matches!(err, FillError::IoError(_)));
        assert!(!session.has_run(ActivityId(1)));

        let created = service
            .match_partners(ActivityId(1), &mut session)
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        assert!(session.has_run(ActivityId(1)));
    }
}
