use anyhow::{anyhow, Result};
use kismat_types::{
    Account, AccountId, Bet, Draw, DrawId, EngineError, Journal, Key, NumberLimit, StakeBucket,
    Value,
};
use std::collections::BTreeMap;

use crate::state::{State, Status};

/// Pending-change overlay over a [`State`] snapshot.
///
/// Reads see buffered writes; nothing touches the backing store until the
/// caller applies [`Txn::commit`]'s batch. Dropping the overlay instead is a
/// rollback.
pub struct Txn<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,
}

impl<'a, S: State> Txn<'a, S> {
    pub fn new(state: &'a S) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),
        }
    }

    pub async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    pub fn insert(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    pub fn remove(&mut self, key: Key) {
        self.pending.insert(key, Status::Delete);
    }

    /// Drain the buffered changes for application via [`State::apply`].
    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }

    // --- typed accessors -------------------------------------------------

    pub async fn account(&self, id: &AccountId) -> Result<Option<Account>> {
        Ok(match self.get(&Key::Account(id.clone())).await? {
            Some(Value::Account(account)) => Some(account),
            _ => None,
        })
    }

    pub async fn expect_account(&self, id: &AccountId) -> Result<Account, EngineError> {
        self.account(id)
            .await?
            .ok_or_else(|| EngineError::UnknownAccount(id.to_string()))
    }

    pub async fn journal(&self, id: &AccountId) -> Result<Journal> {
        Ok(match self.get(&Key::Journal(id.clone())).await? {
            Some(Value::Journal(journal)) => journal,
            _ => Journal::default(),
        })
    }

    pub async fn draw(&self, id: &DrawId) -> Result<Option<Draw>> {
        Ok(match self.get(&Key::Draw(id.clone())).await? {
            Some(Value::Draw(draw)) => Some(draw),
            _ => None,
        })
    }

    pub async fn expect_draw(&self, id: &DrawId) -> Result<Draw, EngineError> {
        self.draw(id)
            .await?
            .ok_or_else(|| EngineError::MarketUnavailable(id.to_string()))
    }

    pub async fn bets(&self, draw: &DrawId) -> Result<Vec<Bet>> {
        Ok(match self.get(&Key::Bets(draw.clone())).await? {
            Some(Value::Bets(bets)) => bets,
            _ => Vec::new(),
        })
    }

    pub async fn number_limit(&self, bucket: StakeBucket, number: &str) -> Result<Option<u64>> {
        Ok(
            match self
                .get(&Key::NumberLimit(bucket, number.to_owned()))
                .await?
            {
                Some(Value::NumberLimit(limit)) => Some(limit.limit),
                _ => None,
            },
        )
    }

    pub async fn admin_id(&self) -> Result<Option<AccountId>> {
        Ok(match self.get(&Key::AdminId).await? {
            Some(Value::Id(id)) => Some(id),
            _ => None,
        })
    }

    /// The singleton Admin account. Its absence is a deployment fault, not a
    /// business failure.
    pub async fn admin(&self) -> Result<Account, EngineError> {
        let id = self
            .admin_id()
            .await?
            .ok_or_else(|| anyhow!("admin account not provisioned"))?;
        self.expect_account(&id).await
    }

    pub async fn draw_directory(&self) -> Result<Vec<DrawId>> {
        Ok(match self.get(&Key::DrawDirectory).await? {
            Some(Value::DrawDirectory(draws)) => draws,
            _ => Vec::new(),
        })
    }

    /// Allocate the next bet id from the monotonic sequence.
    pub async fn next_bet_id(&mut self) -> Result<u64> {
        let last = match self.get(&Key::BetSequence).await? {
            Some(Value::Sequence(seq)) => seq,
            _ => 0,
        };
        let next = last
            .checked_add(1)
            .ok_or_else(|| anyhow!("bet sequence exhausted"))?;
        self.insert(Key::BetSequence, Value::Sequence(next));
        Ok(next)
    }

    // --- typed writers ---------------------------------------------------

    pub fn put_account(&mut self, account: Account) {
        self.insert(Key::Account(account.id.clone()), Value::Account(account));
    }

    pub fn put_journal(&mut self, id: AccountId, journal: Journal) {
        self.insert(Key::Journal(id), Value::Journal(journal));
    }

    pub fn put_draw(&mut self, draw: Draw) {
        self.insert(Key::Draw(draw.id.clone()), Value::Draw(draw));
    }

    pub fn put_bets(&mut self, draw: DrawId, bets: Vec<Bet>) {
        self.insert(Key::Bets(draw), Value::Bets(bets));
    }

    pub fn put_draw_directory(&mut self, draws: Vec<DrawId>) {
        self.insert(Key::DrawDirectory, Value::DrawDirectory(draws));
    }

    pub fn set_admin_id(&mut self, id: AccountId) {
        self.insert(Key::AdminId, Value::Id(id));
    }

    pub fn put_number_limit(&mut self, limit: NumberLimit) {
        self.insert(
            Key::NumberLimit(limit.bucket, limit.number.clone()),
            Value::NumberLimit(limit),
        );
    }
}
