//! Point ledger helpers and priority derivation.
//!
//! Priority is never stored. It is always the sum of a provider's ledger
//! entries across every activity.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::model::{
    ActivityId, LedgerReason, NewLedgerEntry, PointLedgerEntry, Provider, ProviderId,
};

/// 單一 provider 的 priority = 所有紀錄的點數總和
pub fn priority<'a, I>(entries: I) -> i64
where
    I: IntoIterator<Item = &'a PointLedgerEntry>,
{
    entries.into_iter().map(|entry| entry.points).sum()
}

/// 一次算出所有 provider 的 priority；沒有紀錄的 provider 不會出現在結果中
pub fn priorities_by_provider(entries: &[PointLedgerEntry]) -> HashMap<ProviderId, i64> {
    let mut totals = HashMap::new();
    for entry in entries {
        *totals.entry(entry.provider_id).or_insert(0) += entry.points;
    }
    totals
}

pub fn priority_of(totals: &HashMap<ProviderId, i64>, provider: ProviderId) -> i64 {
    totals.get(&provider).copied().unwrap_or(0)
}

/// Descending priority, then provider id ascending.
pub fn compare_standing(a: (&Provider, i64), b: (&Provider, i64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id))
}

/// 每筆指派寫入兩筆紀錄：出席 +1、被使用 -1
pub fn assignment_entries(provider: ProviderId, activity: ActivityId) -> Vec<NewLedgerEntry> {
    vec![
        NewLedgerEntry {
            provider_id: provider,
            activity_id: Some(activity),
            points: 1,
            reason: LedgerReason::SessionParticipation,
            note: None,
        },
        NewLedgerEntry {
            provider_id: provider,
            activity_id: Some(activity),
            points: -1,
            reason: LedgerReason::Assignment,
            note: None,
        },
    ]
}
