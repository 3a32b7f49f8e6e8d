#![allow(dead_code)]

use guild_fill::domain::attributes::SignupAttributes;
use guild_fill::domain::model::{
    Activity, ActivityId, ActivityKind, LedgerReason, NewSignup, ProviderId, ProviderProfile,
    Signup, TransportPair, UserId,
};
use guild_fill::domain::ports::FillRepository;
use guild_fill::{EngineSettings, FillService, MemoryStore, PointsRequest};
use serde_json::json;

pub const CREATOR: UserId = UserId(1);
pub const RUN: ActivityId = ActivityId(1);
pub const HISTORY: ActivityId = ActivityId(99);

pub struct Fixture {
    pub service: FillService<MemoryStore>,
    pub pairs: Vec<TransportPair>,
}

impl Fixture {
    pub fn store(&self) -> &MemoryStore {
        self.service.repository()
    }
}

pub async fn add_activity(store: &MemoryStore, id: ActivityId, kind: ActivityKind) {
    store
        .insert_activity(Activity {
            id,
            title: format!("activity {}", id),
            kind,
            creator_id: CREATOR,
        })
        .await
        .unwrap();
}

pub async fn add_signup(
    store: &MemoryStore,
    activity: ActivityId,
    player: u64,
    name: &str,
    role: &str,
    hint: Option<&str>,
) -> Signup {
    let raw = json!({
        "role": role,
        "origin": "Thetford",
        "destination": "Caerleon",
        "preferredPartner": hint,
    });
    store
        .insert_signup(NewSignup {
            activity_id: activity,
            player_id: UserId(player),
            player_name: name.to_string(),
            attributes: SignupAttributes::from_raw(ActivityKind::Transport, &raw).unwrap(),
        })
        .await
        .unwrap()
}

/// Transport activity `RUN` with `pair_count` fighter/transporter pairs, plus an
/// older transport activity `HISTORY` used to give provider owners participation.
pub async fn transport_fixture(pair_count: u64) -> Fixture {
    let store = MemoryStore::new();
    add_activity(&store, RUN, ActivityKind::Transport).await;
    add_activity(&store, HISTORY, ActivityKind::Transport).await;

    let service = FillService::new(store, EngineSettings::default());
    let mut pairs = Vec::new();
    for i in 0..pair_count {
        let fighter = add_signup(
            service.repository(),
            RUN,
            100 + i * 2,
            &format!("Fighter{}", i),
            "Fighter",
            None,
        )
        .await;
        let transporter = add_signup(
            service.repository(),
            RUN,
            101 + i * 2,
            &format!("Hauler{}", i),
            "Transporter",
            None,
        )
        .await;
        let pair = service
            .create_pair(RUN, fighter.id, transporter.id, CREATOR)
            .await
            .unwrap();
        pairs.push(pair);
    }

    Fixture { service, pairs }
}

/// Registers a provider for `user` and gives it `points` of priority.
pub async fn add_provider(
    service: &FillService<MemoryStore>,
    user: u64,
    slots: bool,
    weight: bool,
    points: i64,
) -> ProviderId {
    add_signup(
        service.repository(),
        HISTORY,
        user,
        &format!("Provider{}", user),
        "Transporter",
        None,
    )
    .await;

    let standing = service
        .register_provider(
            UserId(user),
            ProviderProfile {
                provides_slots: slots,
                provides_weight: weight,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(standing.priority, 0);

    if points != 0 {
        service
            .add_points(
                PointsRequest {
                    provider_id: standing.provider.id,
                    points,
                    reason: LedgerReason::Bonus,
                    activity_id: None,
                    note: None,
                },
                UserId(user),
            )
            .await
            .unwrap();
    }
    standing.provider.id
}

pub async fn priority(service: &FillService<MemoryStore>, provider: ProviderId) -> i64 {
    service.provider_ledger(provider).await.unwrap().priority
}
