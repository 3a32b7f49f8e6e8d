use crate::domain::model::{
    Activity, ActivityId, AssignmentId, FillAssignment, NewFillAssignment, NewLedgerEntry,
    NewSignup, NewTransportPair, PairId, PointLedgerEntry, Provider, ProviderId, ProviderProfile,
    Signup, SignupId, TransportPair, UserId,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// 引擎需要的持久化操作。
///
/// 實作必須自行保證唯一性約束（同一 signup 只能在一個 pair、
/// 同一 (pair, fill type) 只能有一筆指派），違反時回傳 `FillError::Conflict`。
#[async_trait]
pub trait FillRepository: Send + Sync {
    async fn activity(&self, id: ActivityId) -> Result<Option<Activity>>;
    async fn insert_activity(&self, activity: Activity) -> Result<Activity>;
    /// Removes the activity together with everything scoped to it.
    async fn remove_activity(&self, id: ActivityId) -> Result<()>;

    async fn signup(&self, id: SignupId) -> Result<Option<Signup>>;
    async fn signups_for_activity(&self, activity: ActivityId) -> Result<Vec<Signup>>;
    async fn insert_signup(&self, signup: NewSignup) -> Result<Signup>;
    /// Whether the user ever signed up for a transport activity.
    async fn has_transport_participation(&self, user: UserId) -> Result<bool>;

    async fn pair(&self, id: PairId) -> Result<Option<TransportPair>>;
    async fn pairs_for_activity(&self, activity: ActivityId) -> Result<Vec<TransportPair>>;
    async fn insert_pair(&self, pair: NewTransportPair) -> Result<TransportPair>;
    async fn update_pair(&self, pair: TransportPair) -> Result<TransportPair>;
    /// Deleting a pair also deletes its fill assignments.
    async fn delete_pair(&self, id: PairId) -> Result<()>;

    async fn provider(&self, id: ProviderId) -> Result<Option<Provider>>;
    async fn provider_for_user(&self, user: UserId) -> Result<Option<Provider>>;
    async fn providers(&self) -> Result<Vec<Provider>>;
    async fn insert_provider(&self, user: UserId, profile: ProviderProfile) -> Result<Provider>;
    async fn update_provider(&self, provider: Provider) -> Result<Provider>;

    async fn assignment(&self, id: AssignmentId) -> Result<Option<FillAssignment>>;
    async fn assignments_for_activity(&self, activity: ActivityId)
        -> Result<Vec<FillAssignment>>;
    /// Inserts the assignment and its ledger entries as one unit.
    async fn insert_assignment(
        &self,
        assignment: NewFillAssignment,
        ledger: Vec<NewLedgerEntry>,
    ) -> Result<FillAssignment>;
    async fn delete_assignment(&self, id: AssignmentId) -> Result<()>;

    async fn ledger_entries(&self) -> Result<Vec<PointLedgerEntry>>;
    async fn ledger_for_provider(&self, provider: ProviderId) -> Result<Vec<PointLedgerEntry>>;
    async fn append_ledger(&self, entry: NewLedgerEntry) -> Result<PointLedgerEntry>;
}
