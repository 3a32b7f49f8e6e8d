use std::collections::HashMap;

use crate::domain::model::{FillAssignment, FillType, ProviderId};

/// 單一活動內每個 (provider, fill type) 的指派數
#[derive(Debug, Clone)]
pub struct CapacityTracker {
    max_per_provider: u32,
    counts: HashMap<(ProviderId, FillType), u32>,
}

impl CapacityTracker {
    pub fn new(max_per_provider: u32) -> Self {
        Self {
            max_per_provider,
            counts: HashMap::new(),
        }
    }

    /// Seeds the counts from the assignments that already exist in the activity.
    pub fn from_assignments<'a, I>(assignments: I, max_per_provider: u32) -> Self
    where
        I: IntoIterator<Item = &'a FillAssignment>,
    {
        let mut tracker = Self::new(max_per_provider);
        for assignment in assignments {
            tracker.record(assignment.provider_id, assignment.fill_type);
        }
        tracker
    }

    pub fn count(&self, provider: ProviderId, fill_type: FillType) -> u32 {
        self.counts.get(&(provider, fill_type)).copied().unwrap_or(0)
    }

    pub fn has_capacity(&self, provider: ProviderId, fill_type: FillType) -> bool {
        self.count(provider, fill_type) < self.max_per_provider
    }

    pub fn record(&mut self, provider: ProviderId, fill_type: FillType) {
        *self.counts.entry((provider, fill_type)).or_insert(0) += 1;
    }

    pub fn counts(&self) -> &HashMap<(ProviderId, FillType), u32> {
        &self.counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ActivityId, AssignmentId, PairId, MAX_PER_PROVIDER};
    use chrono::Utc;

    fn assignment(id: u64, provider: u64, fill_type: FillType) -> FillAssignment {
        FillAssignment {
            id: AssignmentId(id),
            activity_id: ActivityId(1),
            pair_id: PairId(id),
            provider_id: ProviderId(provider),
            fill_type,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts_are_per_fill_type() {
        let existing = vec![
            assignment(1, 1, FillType::Slots),
            assignment(2, 1, FillType::Slots),
            assignment(3, 1, FillType::Weight),
        ];
        let tracker = CapacityTracker::from_assignments(&existing, MAX_PER_PROVIDER);

        assert_eq!(tracker.count(ProviderId(1), FillType::Slots), 2);
        assert_eq!(tracker.count(ProviderId(1), FillType::Weight), 1);
        assert!(!tracker.has_capacity(ProviderId(1), FillType::Slots));
        assert!(tracker.has_capacity(ProviderId(1), FillType::Weight));
        assert!(tracker.has_capacity(ProviderId(2), FillType::Slots));
    }

    #[test]
    fn test_record_reaches_limit() {
        let mut tracker = CapacityTracker::new(MAX_PER_PROVIDER);
        tracker.record(ProviderId(5), FillType::Weight);
        assert!(tracker.has_capacity(ProviderId(5), FillType::Weight));
        tracker.record(ProviderId(5), FillType::Weight);
        assert!(!tracker.has_capacity(ProviderId(5), FillType::Weight));
        assert_eq!(tracker.counts().len(), 1);
    }
}
