//! Greedy provider assignment for transport activities.
//!
//! Pairs are walked in creation order. For every pair and every fill type the
//! highest-priority provider that still has capacity in this activity is
//! chosen. Equal priorities fall back to provider id ascending. Pairs that
//! already have a provider for a fill type are left untouched, which makes a
//! second run without intervening changes a no-op.

use std::collections::HashSet;

use crate::core::capacity::CapacityTracker;
use crate::core::ledger::{assignment_entries, compare_standing, priorities_by_provider, priority_of};
use crate::core::pairing::PairRegistry;
use crate::domain::model::{
    ActivityId, FillAssignment, FillType, NewFillAssignment, PairId, Provider, ProviderId,
    TransportPair, UserId,
};
use crate::domain::ports::FillRepository;
use crate::utils::error::{FillError, Result};

/// 依 priority 排好的候選 provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub provider_id: ProviderId,
    pub priority: i64,
}

/// Ranks the active providers able to serve `fill_type`.
pub fn rank_candidates(
    providers: &[Provider],
    priorities: &std::collections::HashMap<ProviderId, i64>,
    fill_type: FillType,
) -> Vec<Candidate> {
    let mut ranked: Vec<(&Provider, i64)> = providers
        .iter()
        .filter(|p| p.is_active && p.supports(fill_type))
        .map(|p| (p, priority_of(priorities, p.id)))
        .collect();
    ranked.sort_by(|a, b| compare_standing(*a, *b));
    ranked
        .into_iter()
        .map(|(p, priority)| Candidate {
            provider_id: p.id,
            priority,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentPlan {
    pub planned: Vec<NewFillAssignment>,
    pub unfilled: Vec<(PairId, FillType)>,
}

/// 純計算：決定每個 pair 每種 fill type 該由誰提供，不寫入任何資料
pub fn plan_assignments(
    activity: ActivityId,
    pairs: &[TransportPair],
    slots: &[Candidate],
    weight: &[Candidate],
    existing: &[FillAssignment],
    fill_order: &[FillType],
    max_per_provider: u32,
) -> AssignmentPlan {
    let mut tracker = CapacityTracker::from_assignments(existing, max_per_provider);
    let already: HashSet<(PairId, FillType)> =
        existing.iter().map(|a| (a.pair_id, a.fill_type)).collect();

    let mut plan = AssignmentPlan::default();
    for pair in pairs {
        for &fill_type in fill_order {
            if already.contains(&(pair.id, fill_type)) {
                continue;
            }

            let candidates = match fill_type {
                FillType::Slots => slots,
                FillType::Weight => weight,
            };

            let chosen = candidates
                .iter()
                .find(|c| tracker.has_capacity(c.provider_id, fill_type));

            match chosen {
                Some(candidate) => {
                    tracker.record(candidate.provider_id, fill_type);
                    tracing::debug!(
                        "Pair {} {} -> provider {} (priority {})",
                        pair.id,
                        fill_type,
                        candidate.provider_id,
                        candidate.priority
                    );
                    plan.planned.push(NewFillAssignment {
                        activity_id: activity,
                        pair_id: pair.id,
                        provider_id: candidate.provider_id,
                        fill_type,
                    });
                }
                None => {
                    tracing::debug!("Pair {} {} left unassigned", pair.id, fill_type);
                    plan.unfilled.push((pair.id, fill_type));
                }
            }
        }
    }
    plan
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoAssignOutcome {
    pub created: Vec<FillAssignment>,
    pub unfilled: Vec<(PairId, FillType)>,
}

pub struct AutoAssignEngine<'a, R: ?Sized> {
    repo: &'a R,
    max_per_provider: u32,
    fill_order: &'a [FillType],
}

impl<'a, R> AutoAssignEngine<'a, R>
where
    R: FillRepository + ?Sized,
{
    pub fn new(repo: &'a R, max_per_provider: u32, fill_order: &'a [FillType]) -> Self {
        Self {
            repo,
            max_per_provider,
            fill_order,
        }
    }

    /// 呼叫端需持有該活動的鎖
    pub async fn run(&self, activity_id: ActivityId, caller: UserId) -> Result<AutoAssignOutcome> {
        let activity = self
            .repo
            .activity(activity_id)
            .await?
            .ok_or_else(|| FillError::not_found("activity", activity_id))?;

        if !activity.is_creator(caller) {
            return Err(FillError::unauthorized(
                "only the activity creator can run auto-assign",
            ));
        }

        if !activity.is_transport() {
            return Err(FillError::validation(format!(
                "Activity {} is not a transport activity",
                activity.id
            )));
        }

        let registry = PairRegistry::load(self.repo, activity.id).await?;
        if registry.is_empty() {
            return Err(FillError::validation(
                "Create transport pairs before auto-assigning providers",
            ));
        }

        let providers = self.repo.providers().await?;
        let ledger = self.repo.ledger_entries().await?;
        let priorities = priorities_by_provider(&ledger);

        let slots = rank_candidates(&providers, &priorities, FillType::Slots);
        let weight = rank_candidates(&providers, &priorities, FillType::Weight);
        if slots.is_empty() && weight.is_empty() {
            return Err(FillError::validation(
                "No active provider supports slots or weight",
            ));
        }

        let existing = self.repo.assignments_for_activity(activity.id).await?;
        let plan = plan_assignments(
            activity.id,
            registry.pairs(),
            &slots,
            &weight,
            &existing,
            self.fill_order,
            self.max_per_provider,
        );

        let mut created = Vec::with_capacity(plan.planned.len());
        for new_assignment in plan.planned {
            let ledger = assignment_entries(new_assignment.provider_id, activity.id);
            let assignment = self.repo.insert_assignment(new_assignment, ledger).await?;
            created.push(assignment);
        }

        tracing::info!(
            "🚚 Auto-assign for activity {}: {} created, {} left open across {} pairs",
            activity.id,
            created.len(),
            plan.unfilled.len(),
            registry.pairs().len()
        );

        Ok(AutoAssignOutcome {
            created,
            unfilled: plan.unfilled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AssignmentId, MAX_PER_PROVIDER};
    use crate::domain::model::SignupId;
    use chrono::Utc;
    use std::collections::HashMap;

    const ORDER: [FillType; 2] = [FillType::Slots, FillType::Weight];

    fn pairs(count: u64) -> Vec<TransportPair> {
        (1..=count)
            .map(|id| TransportPair {
                id: PairId(id),
                activity_id: ActivityId(1),
                fighter_signup_id: SignupId(id * 2),
                transporter_signup_id: SignupId(id * 2 + 1),
            })
            .collect()
    }

    fn provider(id: u64, slots: bool, weight: bool) -> Provider {
        Provider {
            id: ProviderId(id),
            user_id: UserId(100 + id),
            provides_slots: slots,
            provides_weight: weight,
            is_active: true,
            slots_origin: None,
            slots_target: None,
            weight_origin: None,
            weight_target: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn candidate(id: u64, priority: i64) -> Candidate {
        Candidate {
            provider_id: ProviderId(id),
            priority,
        }
    }

    #[test]
    fn test_rank_candidates_by_priority_then_id() {
        let providers = vec![
            provider(3, true, false),
            provider(1, true, true),
            provider(2, true, false),
            provider(4, false, true),
        ];
        let priorities = HashMap::from([(ProviderId(1), 2), (ProviderId(2), 5), (ProviderId(3), 2)]);

        let ranked = rank_candidates(&providers, &priorities, FillType::Slots);
        let ids: Vec<u64> = ranked.iter().map(|c| c.provider_id.0).collect();
        assert_eq!(ids, vec![2, 1, 3]);

        let ranked = rank_candidates(&providers, &priorities, FillType::Weight);
        let ids: Vec<u64> = ranked.iter().map(|c| c.provider_id.0).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_rank_candidates_skips_inactive() {
        let mut inactive = provider(1, true, true);
        inactive.is_active = false;
        let ranked = rank_candidates(&[inactive], &HashMap::new(), FillType::Slots);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_plan_fills_highest_priority_until_capacity() {
        let slots = vec![candidate(1, 5), candidate(2, 2)];
        let plan = plan_assignments(
            ActivityId(1),
            &pairs(3),
            &slots,
            &[],
            &[],
            &ORDER,
            MAX_PER_PROVIDER,
        );

        let slot_plan: Vec<(u64, u64)> = plan
            .planned
            .iter()
            .map(|a| (a.pair_id.0, a.provider_id.0))
            .collect();
        assert_eq!(slot_plan, vec![(1, 1), (2, 1), (3, 2)]);
        // no weight providers at all
        assert_eq!(plan.unfilled.len(), 3);
        assert!(plan.unfilled.iter().all(|(_, ft)| *ft == FillType::Weight));
    }

    #[test]
    fn test_plan_leaves_slot_open_when_everyone_is_full() {
        let slots = vec![candidate(1, 0)];
        let plan = plan_assignments(
            ActivityId(1),
            &pairs(3),
            &slots,
            &[],
            &[],
            &[FillType::Slots],
            MAX_PER_PROVIDER,
        );
        assert_eq!(plan.planned.len(), 2);
        assert_eq!(plan.unfilled, vec![(PairId(3), FillType::Slots)]);
    }

    #[test]
    fn test_plan_respects_existing_assignments() {
        let existing = vec![FillAssignment {
            id: AssignmentId(1),
            activity_id: ActivityId(1),
            pair_id: PairId(1),
            provider_id: ProviderId(1),
            fill_type: FillType::Slots,
            created_at: Utc::now(),
        }];
        let slots = vec![candidate(1, 5), candidate(2, 2)];
        let plan = plan_assignments(
            ActivityId(1),
            &pairs(3),
            &slots,
            &[],
            &existing,
            &[FillType::Slots],
            MAX_PER_PROVIDER,
        );

        let slot_plan: Vec<(u64, u64)> = plan
            .planned
            .iter()
            .map(|a| (a.pair_id.0, a.provider_id.0))
            .collect();
        // pair 1 is skipped, provider 1 has room for only one more
        assert_eq!(slot_plan, vec![(2, 1), (3, 2)]);
    }

    #[test]
    fn test_plan_is_empty_when_everything_assigned() {
        let existing: Vec<FillAssignment> = pairs(2)
            .iter()
            .flat_map(|pair| {
                ORDER.iter().enumerate().map(move |(i, ft)| FillAssignment {
                    id: AssignmentId(pair.id.0 * 10 + i as u64),
                    activity_id: ActivityId(1),
                    pair_id: pair.id,
                    provider_id: ProviderId(pair.id.0),
                    fill_type: *ft,
                    created_at: Utc::now(),
                })
            })
            .collect();

        let plan = plan_assignments(
            ActivityId(1),
            &pairs(2),
            &[candidate(9, 10)],
            &[candidate(9, 10)],
            &existing,
            &ORDER,
            MAX_PER_PROVIDER,
        );
        assert_eq!(plan, AssignmentPlan::default());
    }
}
