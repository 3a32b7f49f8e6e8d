//! Preferred-partner auto pairing.
//!
//! Matching is a heuristic. Names and hints are compared with case-sensitive
//! substring containment in either direction, so "Bob" in a hint also matches
//! a player called "Bobby". Whitespace-only hints never match.

use std::collections::HashSet;

use crate::core::pairing::PairRegistry;
use crate::domain::attributes::TransportRole;
use crate::domain::model::{ActivityId, Signup, SignupId, TransportPair};
use crate::domain::ports::FillRepository;

/// Loose reference: the hint contains the name or the name contains the hint.
fn references(hint: Option<&str>, name: &str) -> bool {
    let name = name.trim();
    match hint {
        Some(hint) if !name.is_empty() => hint.contains(name) || name.contains(hint),
        _ => false,
    }
}

fn hint_of(signup: &Signup) -> Option<&str> {
    signup
        .attributes
        .transport()
        .and_then(|transport| transport.partner_hint())
}

/// 互相確認：任一方的提示指向對方即可，不要求雙方都寫
pub fn is_mutual(fighter: &Signup, transporter: &Signup) -> bool {
    references(hint_of(transporter), &fighter.player_name)
        || references(hint_of(fighter), &transporter.player_name)
}

/// Proposes fighter/transporter matches among unpaired signups.
///
/// Fighters are visited in signup order; each one takes the first unclaimed
/// transporter it matches. A match starts from either side's hint, so a
/// fighter without a hint can still be picked by a transporter naming them.
/// A signup is claimed by at most one proposal per pass.
pub fn propose_matches<'a>(
    signups: &'a [Signup],
    registry: &PairRegistry,
) -> Vec<(&'a Signup, &'a Signup)> {
    let mut ordered: Vec<&Signup> = signups
        .iter()
        .filter(|s| s.activity_id == registry.activity() && !registry.is_paired(s.id))
        .collect();
    ordered.sort_by_key(|s| s.id);

    let fighters: Vec<&Signup> = ordered
        .iter()
        .copied()
        .filter(|s| s.attributes.role() == Some(TransportRole::Fighter))
        .collect();
    let transporters: Vec<&Signup> = ordered
        .iter()
        .copied()
        .filter(|s| s.attributes.role() == Some(TransportRole::Transporter))
        .collect();

    let mut claimed: HashSet<SignupId> = HashSet::new();
    let mut matches = Vec::new();

    for fighter in fighters {
        let found = transporters.iter().copied().find(|transporter| {
            !claimed.contains(&transporter.id)
                && is_mutual(fighter, transporter)
        });

        if let Some(transporter) = found {
            claimed.insert(fighter.id);
            claimed.insert(transporter.id);
            matches.push((fighter, transporter));
        }
    }

    matches
}

/// Remembers which activities already ran the matcher in one client session.
#[derive(Debug, Default, Clone)]
pub struct MatchSession {
    visited: HashSet<ActivityId>,
}

impl MatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 第一次呼叫回傳 true，之後同一活動都回傳 false
    pub fn begin(&mut self, activity: ActivityId) -> bool {
        self.visited.insert(activity)
    }

    pub fn has_run(&self, activity: ActivityId) -> bool {
        self.visited.contains(&activity)
    }
}

pub struct PreferredPartnerMatcher<'a, R: ?Sized> {
    repo: &'a R,
}

impl<'a, R> PreferredPartnerMatcher<'a, R>
where
    R: FillRepository + ?Sized,
{
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Best-effort pass: individual failures are logged and skipped.
    pub async fn run(&self, signups: &[Signup], registry: &mut PairRegistry) -> Vec<TransportPair> {
        let proposals: Vec<(Signup, Signup)> = propose_matches(signups, registry)
            .into_iter()
            .map(|(fighter, transporter)| (fighter.clone(), transporter.clone()))
            .collect();

        let mut created = Vec::new();
        for (fighter, transporter) in proposals {
            match registry.create(self.repo, &fighter, &transporter).await {
                Ok(pair) => {
                    tracing::debug!(
                        "Paired {} with {} (pair {})",
                        fighter.player_name,
                        transporter.player_name,
                        pair.id
                    );
                    created.push(pair);
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Could not pair {} with {}: {}",
                        fighter.player_name,
                        transporter.player_name,
                        e
                    );
                }
            }
        }

        if !created.is_empty() {
            tracing::info!(
                "🤝 Preferred-partner matching created {} pairs in activity {}",
                created.len(),
                registry.activity()
            );
        }
        created
    }
}
