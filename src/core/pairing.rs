use crate::domain::attributes::TransportRole;
use crate::domain::model::{ActivityId, NewTransportPair, PairId, Signup, SignupId, TransportPair};
use crate::domain::ports::FillRepository;
use crate::utils::error::{FillError, Result};

/// 一個活動內所有的 TransportPair，建立或更新 pair 前都會經過這裡檢查
#[derive(Debug, Clone)]
pub struct PairRegistry {
    activity: ActivityId,
    pairs: Vec<TransportPair>,
}

impl PairRegistry {
    pub fn from_pairs(activity: ActivityId, mut pairs: Vec<TransportPair>) -> Self {
        pairs.sort_by_key(|pair| pair.id);
        Self { activity, pairs }
    }

    pub async fn load<R>(repo: &R, activity: ActivityId) -> Result<Self>
    where
        R: FillRepository + ?Sized,
    {
        let pairs = repo.pairs_for_activity(activity).await?;
        Ok(Self::from_pairs(activity, pairs))
    }

    pub fn activity(&self) -> ActivityId {
        self.activity
    }

    /// Pairs ordered by id, i.e. creation order.
    pub fn pairs(&self) -> &[TransportPair] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pair_of(&self, signup: SignupId) -> Option<&TransportPair> {
        self.pairs.iter().find(|pair| pair.contains(signup))
    }

    pub fn is_paired(&self, signup: SignupId) -> bool {
        self.pair_of(signup).is_some()
    }

    /// 檢查兩個 signup 能否組成 pair。`replacing` 為正在更新的 pair，其成員不算已配對。
    pub fn check_new_pair(
        &self,
        fighter: &Signup,
        transporter: &Signup,
        replacing: Option<PairId>,
    ) -> Result<NewTransportPair> {
        for signup in [fighter, transporter] {
            if signup.activity_id != self.activity {
                return Err(FillError::validation(format!(
                    "Signup {} does not belong to activity {}",
                    signup.id, self.activity
                )));
            }
        }

        expect_role(fighter, TransportRole::Fighter)?;
        expect_role(transporter, TransportRole::Transporter)?;

        for signup in [fighter, transporter] {
            if let Some(existing) = self.pair_of(signup.id) {
                if Some(existing.id) != replacing {
                    return Err(FillError::validation(format!(
                        "{} is already paired (pair {})",
                        signup.player_name, existing.id
                    )));
                }
            }
        }

        Ok(NewTransportPair {
            activity_id: self.activity,
            fighter_signup_id: fighter.id,
            transporter_signup_id: transporter.id,
        })
    }

    pub async fn create<R>(
        &mut self,
        repo: &R,
        fighter: &Signup,
        transporter: &Signup,
    ) -> Result<TransportPair>
    where
        R: FillRepository + ?Sized,
    {
        let new_pair = self.check_new_pair(fighter, transporter, None)?;
        let pair = repo.insert_pair(new_pair).await?;
        self.pairs.push(pair.clone());
        Ok(pair)
    }

    pub async fn update<R>(
        &mut self,
        repo: &R,
        pair_id: PairId,
        fighter: &Signup,
        transporter: &Signup,
    ) -> Result<TransportPair>
    where
        R: FillRepository + ?Sized,
    {
        if !self.pairs.iter().any(|pair| pair.id == pair_id) {
            return Err(FillError::not_found("pair", pair_id));
        }

        let checked = self.check_new_pair(fighter, transporter, Some(pair_id))?;
        let updated = repo
            .update_pair(TransportPair {
                id: pair_id,
                activity_id: checked.activity_id,
                fighter_signup_id: checked.fighter_signup_id,
                transporter_signup_id: checked.transporter_signup_id,
            })
            .await?;

        if let Some(slot) = self.pairs.iter_mut().find(|pair| pair.id == pair_id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }
}

fn expect_role(signup: &Signup, role: TransportRole) -> Result<()> {
    match signup.attributes.role() {
        Some(actual) if actual == role => Ok(()),
        Some(actual) => Err(FillError::validation(format!(
            "{} signed up as {}, expected {}",
            signup.player_name, actual, role
        ))),
        None => Err(FillError::validation(format!(
            "{} is not a transport signup",
            signup.player_name
        ))),
    }
}
