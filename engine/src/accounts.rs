//! Account provisioning and maintenance.
//!
//! These are the thin operator flows around the core: they exist here rather
//! than in the transport layer because account creation and deletion must
//! stay in lockstep with the wallet journal.

use anyhow::anyhow;
use kismat_types::{
    Account, AccountId, AccountKind, BetLimits, EngineError, Key, PrizeRates, Role,
};
use tracing::info;

use crate::ledger::post_in;
use crate::state::State;
use crate::txn::Txn;

/// Parameters for [`create_account`].
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub id: AccountId,
    pub name: String,
    pub role: Role,
    /// Credited as an opening entry. For non-admin accounts the amount is
    /// debited from the Admin float so system money is conserved.
    pub opening_balance: u64,
}

/// Provision an account.
///
/// Enforces the single-Admin invariant and, for users, that the parent
/// dealer exists. An opening balance posts through the ledger inside the
/// same transaction.
pub async fn create_account<S: State>(
    state: &mut S,
    new: NewAccount,
    now: u64,
) -> Result<Account, EngineError> {
    let (account, changes) = {
        let mut txn = Txn::new(&*state);
        if txn.account(&new.id).await?.is_some() {
            return Err(EngineError::DuplicateAccount(new.id.to_string()));
        }
        match &new.role {
            Role::Admin => {
                if let Some(existing) = txn.admin_id().await? {
                    return Err(
                        anyhow!("admin account already provisioned as {existing}").into()
                    );
                }
            }
            Role::Dealer(_) => {}
            Role::User(profile) => {
                let dealer = txn.expect_account(&profile.dealer).await?;
                if dealer.kind() != AccountKind::Dealer {
                    return Err(EngineError::UnknownAccount(profile.dealer.to_string()));
                }
            }
        }

        let account = Account {
            id: new.id.clone(),
            name: new.name,
            wallet: 0,
            role: new.role,
        };
        let is_admin = account.kind() == AccountKind::Admin;
        txn.put_account(account);
        if is_admin {
            txn.set_admin_id(new.id.clone());
        }

        if new.opening_balance > 0 {
            if !is_admin {
                let admin = txn.admin().await?;
                post_in(
                    &mut txn,
                    &admin.id,
                    &format!("opening balance for {}", new.id),
                    new.opening_balance,
                    0,
                    now,
                )
                .await?;
            }
            post_in(&mut txn, &new.id, "opening balance", 0, new.opening_balance, now).await?;
        }

        let account = txn.expect_account(&new.id).await?;
        (account, txn.commit())
    };
    state.apply(changes).await?;
    info!(account = %account.id, kind = ?account.kind(), "account created");
    Ok(account)
}

/// Flip the betting restriction on a dealer or user.
pub async fn set_restricted<S: State>(
    state: &mut S,
    id: &AccountId,
    restricted: bool,
) -> Result<(), EngineError> {
    let changes = {
        let mut txn = Txn::new(&*state);
        let mut account = txn.expect_account(id).await?;
        match &mut account.role {
            Role::Admin => return Err(anyhow!("admin account cannot be restricted").into()),
            Role::Dealer(profile) => profile.restricted = restricted,
            Role::User(profile) => profile.restricted = restricted,
        }
        txn.put_account(account);
        txn.commit()
    };
    state.apply(changes).await?;
    Ok(())
}

/// Rate/limit fields updatable after creation. `None` leaves a field as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateRates {
    pub commission_bps: Option<u32>,
    pub prize_rates: Option<PrizeRates>,
    /// Users only.
    pub bet_limits: Option<BetLimits>,
}

/// Update a dealer's or user's commission, prize rates, or bet limits.
pub async fn update_rates<S: State>(
    state: &mut S,
    id: &AccountId,
    update: UpdateRates,
) -> Result<(), EngineError> {
    let changes = {
        let mut txn = Txn::new(&*state);
        let mut account = txn.expect_account(id).await?;
        match &mut account.role {
            Role::Admin => return Err(anyhow!("admin account carries no rates").into()),
            Role::Dealer(profile) => {
                if update.bet_limits.is_some() {
                    return Err(anyhow!("bet limits apply to users only").into());
                }
                if let Some(bps) = update.commission_bps {
                    profile.commission_bps = bps;
                }
                if let Some(rates) = update.prize_rates {
                    profile.prize_rates = rates;
                }
            }
            Role::User(profile) => {
                if let Some(bps) = update.commission_bps {
                    profile.commission_bps = bps;
                }
                if let Some(rates) = update.prize_rates {
                    profile.prize_rates = rates;
                }
                if let Some(limits) = update.bet_limits {
                    profile.bet_limits = limits;
                }
            }
        }
        txn.put_account(account);
        txn.commit()
    };
    state.apply(changes).await?;
    Ok(())
}

/// Delete a user account and its journal. Users only; dealers and the Admin
/// persist for the life of the deployment. Bets already admitted remain
/// until the cycle reset and settle as orphans (skipped with a warning).
pub async fn delete_user<S: State>(state: &mut S, id: &AccountId) -> Result<(), EngineError> {
    let changes = {
        let mut txn = Txn::new(&*state);
        let account = txn.expect_account(id).await?;
        if account.kind() != AccountKind::User {
            return Err(anyhow!("only user accounts can be deleted").into());
        }
        txn.remove(Key::Account(id.clone()));
        txn.remove(Key::Journal(id.clone()));
        txn.commit()
    };
    state.apply(changes).await?;
    info!(account = %id, "user deleted");
    Ok(())
}
