use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::attributes::TransportRole;
use crate::domain::model::{
    Activity, ActivityId, ActivityKind, AssignmentId, FillAssignment, LedgerEntryId,
    NewFillAssignment, NewLedgerEntry, NewSignup, NewTransportPair, PairId, PointLedgerEntry,
    Provider, ProviderId, ProviderProfile, Signup, SignupId, TransportPair, UserId,
};
use crate::domain::ports::FillRepository;
use crate::utils::error::{FillError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequences {
    pub signup: u64,
    pub pair: u64,
    pub provider: u64,
    pub assignment: u64,
    pub ledger: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

/// 整個資料庫的內容，也是 JSON 快照的格式
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub signups: Vec<Signup>,
    #[serde(default)]
    pub pairs: Vec<TransportPair>,
    #[serde(default)]
    pub providers: Vec<Provider>,
    #[serde(default)]
    pub assignments: Vec<FillAssignment>,
    #[serde(default)]
    pub ledger: Vec<PointLedgerEntry>,
    #[serde(default)]
    pub sequences: Sequences,
}

impl StoreState {
    fn activity(&self, id: ActivityId) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    fn signup(&self, id: SignupId) -> Option<&Signup> {
        self.signups.iter().find(|s| s.id == id)
    }

    fn pair_containing(&self, signup: SignupId, except: Option<PairId>) -> Option<&TransportPair> {
        self.pairs
            .iter()
            .filter(|p| Some(p.id) != except)
            .find(|p| p.contains(signup))
    }

    fn check_pair_members(
        &self,
        activity: ActivityId,
        fighter: SignupId,
        transporter: SignupId,
        except: Option<PairId>,
    ) -> Result<()> {
        if self.activity(activity).is_none() {
            return Err(FillError::not_found("activity", activity));
        }

        for (id, role) in [
            (fighter, TransportRole::Fighter),
            (transporter, TransportRole::Transporter),
        ] {
            let signup = self
                .signup(id)
                .ok_or_else(|| FillError::not_found("signup", id))?;
            if signup.activity_id != activity {
                return Err(FillError::validation(format!(
                    "Signup {} does not belong to activity {}",
                    id, activity
                )));
            }
            if signup.attributes.role() != Some(role) {
                return Err(FillError::validation(format!(
                    "Signup {} is not a {}",
                    id, role
                )));
            }
            if let Some(existing) = self.pair_containing(id, except) {
                return Err(FillError::conflict(format!(
                    "signup {} is already in pair {}",
                    id, existing.id
                )));
            }
        }
        Ok(())
    }

    fn push_ledger(&mut self, entry: NewLedgerEntry) -> PointLedgerEntry {
        let entry = PointLedgerEntry {
            id: LedgerEntryId(next(&mut self.sequences.ledger)),
            provider_id: entry.provider_id,
            activity_id: entry.activity_id,
            points: entry.points,
            reason: entry.reason,
            note: entry.note,
            created_at: Utc::now(),
        };
        self.ledger.push(entry.clone());
        entry
    }
}

/// In-memory `FillRepository`. Every write holds the state lock for its whole
/// duration, so multi-row writes are atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl FillRepository for MemoryStore {
    async fn activity(&self, id: ActivityId) -> Result<Option<Activity>> {
        Ok(self.state.read().await.activity(id).cloned())
    }

    async fn insert_activity(&self, activity: Activity) -> Result<Activity> {
        let mut state = self.state.write().await;
        if state.activity(activity.id).is_some() {
            return Err(FillError::conflict(format!("activity {}", activity.id)));
        }
        state.activities.push(activity.clone());
        Ok(activity)
    }

    async fn remove_activity(&self, id: ActivityId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.activity(id).is_none() {
            return Err(FillError::not_found("activity", id));
        }
        state.activities.retain(|a| a.id != id);
        state.signups.retain(|s| s.activity_id != id);
        state.pairs.retain(|p| p.activity_id != id);
        state.assignments.retain(|a| a.activity_id != id);
        state.ledger.retain(|e| e.activity_id != Some(id));
        Ok(())
    }

    async fn signup(&self, id: SignupId) -> Result<Option<Signup>> {
        Ok(self.state.read().await.signup(id).cloned())
    }

    async fn signups_for_activity(&self, activity: ActivityId) -> Result<Vec<Signup>> {
        let state = self.state.read().await;
        Ok(state
            .signups
            .iter()
            .filter(|s| s.activity_id == activity)
            .cloned()
            .collect())
    }

    async fn insert_signup(&self, signup: NewSignup) -> Result<Signup> {
        let mut state = self.state.write().await;
        if state.activity(signup.activity_id).is_none() {
            return Err(FillError::not_found("activity", signup.activity_id));
        }
        if state
            .signups
            .iter()
            .any(|s| s.activity_id == signup.activity_id && s.player_id == signup.player_id)
        {
            return Err(FillError::conflict(format!(
                "player {} already signed up for activity {}",
                signup.player_id, signup.activity_id
            )));
        }

        let signup = Signup {
            id: SignupId(next(&mut state.sequences.signup)),
            activity_id: signup.activity_id,
            player_id: signup.player_id,
            player_name: signup.player_name,
            attributes: signup.attributes,
        };
        state.signups.push(signup.clone());
        Ok(signup)
    }

    async fn has_transport_participation(&self, user: UserId) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.signups.iter().any(|s| {
            s.player_id == user
                && state
                    .activity(s.activity_id)
                    .is_some_and(|a| a.kind == ActivityKind::Transport)
        }))
    }

    async fn pair(&self, id: PairId) -> Result<Option<TransportPair>> {
        let state = self.state.read().await;
        Ok(state.pairs.iter().find(|p| p.id == id).cloned())
    }

    async fn pairs_for_activity(&self, activity: ActivityId) -> Result<Vec<TransportPair>> {
        let state = self.state.read().await;
        Ok(state
            .pairs
            .iter()
            .filter(|p| p.activity_id == activity)
            .cloned()
            .collect())
    }

    async fn insert_pair(&self, pair: NewTransportPair) -> Result<TransportPair> {
        let mut state = self.state.write().await;
        state.check_pair_members(
            pair.activity_id,
            pair.fighter_signup_id,
            pair.transporter_signup_id,
            None,
        )?;

        let pair = TransportPair {
            id: PairId(next(&mut state.sequences.pair)),
            activity_id: pair.activity_id,
            fighter_signup_id: pair.fighter_signup_id,
            transporter_signup_id: pair.transporter_signup_id,
        };
        state.pairs.push(pair.clone());
        Ok(pair)
    }

    async fn update_pair(&self, pair: TransportPair) -> Result<TransportPair> {
        let mut state = self.state.write().await;
        let current = state
            .pairs
            .iter()
            .find(|p| p.id == pair.id)
            .ok_or_else(|| FillError::not_found("pair", pair.id))?;
        if current.activity_id != pair.activity_id {
            return Err(FillError::validation("a pair cannot move to another activity"));
        }
        state.check_pair_members(
            pair.activity_id,
            pair.fighter_signup_id,
            pair.transporter_signup_id,
            Some(pair.id),
        )?;

        if let Some(slot) = state.pairs.iter_mut().find(|p| p.id == pair.id) {
            *slot = pair.clone();
        }
        Ok(pair)
    }

    async fn delete_pair(&self, id: PairId) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.pairs.len();
        state.pairs.retain(|p| p.id != id);
        if state.pairs.len() == before {
            return Err(FillError::not_found("pair", id));
        }
        state.assignments.retain(|a| a.pair_id != id);
        Ok(())
    }

    async fn provider(&self, id: ProviderId) -> Result<Option<Provider>> {
        let state = self.state.read().await;
        Ok(state.providers.iter().find(|p| p.id == id).cloned())
    }

    async fn provider_for_user(&self, user: UserId) -> Result<Option<Provider>> {
        let state = self.state.read().await;
        Ok(state.providers.iter().find(|p| p.user_id == user).cloned())
    }

    async fn providers(&self) -> Result<Vec<Provider>> {
        Ok(self.state.read().await.providers.clone())
    }

    async fn insert_provider(&self, user: UserId, profile: ProviderProfile) -> Result<Provider> {
        let mut state = self.state.write().await;
        if state.providers.iter().any(|p| p.user_id == user) {
            return Err(FillError::conflict(format!("provider for user {}", user)));
        }

        let provider = Provider {
            id: ProviderId(next(&mut state.sequences.provider)),
            user_id: user,
            provides_slots: profile.provides_slots,
            provides_weight: profile.provides_weight,
            is_active: true,
            slots_origin: profile.slots_origin,
            slots_target: profile.slots_target,
            weight_origin: profile.weight_origin,
            weight_target: profile.weight_target,
            notes: profile.notes,
            created_at: Utc::now(),
        };
        state.providers.push(provider.clone());
        Ok(provider)
    }

    async fn update_provider(&self, provider: Provider) -> Result<Provider> {
        let mut state = self.state.write().await;
        let slot = state
            .providers
            .iter_mut()
            .find(|p| p.id == provider.id)
            .ok_or_else(|| FillError::not_found("provider", provider.id))?;
        *slot = provider.clone();
        Ok(provider)
    }

    async fn assignment(&self, id: AssignmentId) -> Result<Option<FillAssignment>> {
        let state = self.state.read().await;
        Ok(state.assignments.iter().find(|a| a.id == id).cloned())
    }

    async fn assignments_for_activity(
        &self,
        activity: ActivityId,
    ) -> Result<Vec<FillAssignment>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.activity_id == activity)
            .cloned()
            .collect())
    }

    async fn insert_assignment(
        &self,
        assignment: NewFillAssignment,
        ledger: Vec<NewLedgerEntry>,
    ) -> Result<FillAssignment> {
        let mut state = self.state.write().await;

        let pair = state
            .pairs
            .iter()
            .find(|p| p.id == assignment.pair_id)
            .ok_or_else(|| FillError::not_found("pair", assignment.pair_id))?;
        if pair.activity_id != assignment.activity_id {
            return Err(FillError::validation(format!(
                "Pair {} belongs to another activity",
                pair.id
            )));
        }
        if !state.providers.iter().any(|p| p.id == assignment.provider_id) {
            return Err(FillError::not_found("provider", assignment.provider_id));
        }
        if state
            .assignments
            .iter()
            .any(|a| a.pair_id == assignment.pair_id && a.fill_type == assignment.fill_type)
        {
            return Err(FillError::conflict(format!(
                "{} assignment for pair {}",
                assignment.fill_type, assignment.pair_id
            )));
        }

        let created = FillAssignment {
            id: AssignmentId(next(&mut state.sequences.assignment)),
            activity_id: assignment.activity_id,
            pair_id: assignment.pair_id,
            provider_id: assignment.provider_id,
            fill_type: assignment.fill_type,
            created_at: Utc::now(),
        };
        state.assignments.push(created.clone());
        for entry in ledger {
            state.push_ledger(entry);
        }
        Ok(created)
    }

    async fn delete_assignment(&self, id: AssignmentId) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.assignments.len();
        state.assignments.retain(|a| a.id != id);
        if state.assignments.len() == before {
            return Err(FillError::not_found("assignment", id));
        }
        Ok(())
    }

    async fn ledger_entries(&self) -> Result<Vec<PointLedgerEntry>> {
        Ok(self.state.read().await.ledger.clone())
    }

    async fn ledger_for_provider(&self, provider: ProviderId) -> Result<Vec<PointLedgerEntry>> {
        let state = self.state.read().await;
        Ok(state
            .ledger
            .iter()
            .filter(|e| e.provider_id == provider)
            .cloned()
            .collect())
    }

    async fn append_ledger(&self, entry: NewLedgerEntry) -> Result<PointLedgerEntry> {
        let mut state = self.state.write().await;
        if !state.providers.iter().any(|p| p.id == entry.provider_id) {
            return Err(FillError::not_found("provider", entry.provider_id));
        }
        Ok(state.push_ledger(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attributes::{SignupAttributes, TransportSignup};
    use crate::domain::model::{FillType, LedgerReason};

    fn transport_signup(activity: u64, player: u64, role: TransportRole) -> NewSignup {
        NewSignup {
            activity_id: ActivityId(activity),
            player_id: UserId(player),
            player_name: format!("player-{}", player),
            attributes: SignupAttributes::Transport(TransportSignup {
                role,
                origin: "Bridgewatch".to_string(),
                destination: "Caerleon".to_string(),
                preferred_partner: None,
            }),
        }
    }

    async fn seeded() -> (MemoryStore, TransportPair, Provider) {
        let store = MemoryStore::new();
        store
            .insert_activity(Activity {
                id: ActivityId(1),
                title: "Caerleon run".to_string(),
                kind: ActivityKind::Transport,
                creator_id: UserId(1),
            })
            .await
            .unwrap();
        let fighter = store
            .insert_signup(transport_signup(1, 10, TransportRole::Fighter))
            .await
            .unwrap();
        let transporter = store
            .insert_signup(transport_signup(1, 11, TransportRole::Transporter))
            .await
            .unwrap();
        let pair = store
            .insert_pair(NewTransportPair {
                activity_id: ActivityId(1),
                fighter_signup_id: fighter.id,
                transporter_signup_id: transporter.id,
            })
            .await
            .unwrap();
        let provider = store
            .insert_provider(
                UserId(10),
                ProviderProfile {
                    provides_slots: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (store, pair, provider)
    }

    #[tokio::test]
    async fn test_duplicate_signup_conflicts() {
        let (store, _, _) = seeded().await;
        let err = store
            .insert_signup(transport_signup(1, 10, TransportRole::Fighter))
            .await
            .unwrap_err();
        assert!(matches!(err, FillError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_signup_in_two_pairs_conflicts() {
        let (store, pair, _) = seeded().await;
        let other = store
            .insert_signup(transport_signup(1, 12, TransportRole::Transporter))
            .await
            .unwrap();
        let err = store
            .insert_pair(NewTransportPair {
                activity_id: ActivityId(1),
                fighter_signup_id: pair.fighter_signup_id,
                transporter_signup_id: other.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FillError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_assignment_uniqueness_and_ledger_written_together() {
        let (store, pair, provider) = seeded().await;
        let new_assignment = NewFillAssignment {
            activity_id: ActivityId(1),
            pair_id: pair.id,
            provider_id: provider.id,
            fill_type: FillType::Slots,
        };
        let ledger = vec![NewLedgerEntry {
            provider_id: provider.id,
            activity_id: Some(ActivityId(1)),
            points: 1,
            reason: LedgerReason::SessionParticipation,
            note: None,
        }];

        store
            .insert_assignment(new_assignment.clone(), ledger.clone())
            .await
            .unwrap();
        let err = store
            .insert_assignment(new_assignment, ledger)
            .await
            .unwrap_err();
        assert!(matches!(err, FillError::Conflict { .. }));

        // the rejected insert wrote nothing
        assert_eq!(store.ledger_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_pair_cascades_assignments() {
        let (store, pair, provider) = seeded().await;
        store
            .insert_assignment(
                NewFillAssignment {
                    activity_id: ActivityId(1),
                    pair_id: pair.id,
                    provider_id: provider.id,
                    fill_type: FillType::Slots,
                },
                vec![],
            )
            .await
            .unwrap();

        store.delete_pair(pair.id).await.unwrap();
        assert!(store
            .assignments_for_activity(ActivityId(1))
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            store.delete_pair(pair.id).await.unwrap_err(),
            FillError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_remove_activity_cascades() {
        let (store, _, provider) = seeded().await;
        store
            .append_ledger(NewLedgerEntry {
                provider_id: provider.id,
                activity_id: Some(ActivityId(1)),
                points: 3,
                reason: LedgerReason::Bonus,
                note: None,
            })
            .await
            .unwrap();
        store
            .append_ledger(NewLedgerEntry {
                provider_id: provider.id,
                activity_id: None,
                points: 2,
                reason: LedgerReason::ManualAdjustment,
                note: None,
            })
            .await
            .unwrap();

        store.remove_activity(ActivityId(1)).await.unwrap();

        let state = store.snapshot().await;
        assert!(state.activities.is_empty());
        assert!(state.signups.is_empty());
        assert!(state.pairs.is_empty());
        assert_eq!(state.ledger.len(), 1);
        assert_eq!(state.providers.len(), 1);
    }

    #[tokio::test]
    async fn test_transport_participation() {
        let (store, _, _) = seeded().await;
        assert!(store.has_transport_participation(UserId(10)).await.unwrap());
        assert!(!store.has_transport_participation(UserId(99)).await.unwrap());
    }
}
