//! Ledger store: append-only postings with running balance snapshots.

use anyhow::anyhow;
use kismat_types::{
    AccountId, AccountKind, EngineError, LedgerEntry, WalletView, MAX_DESCRIPTION_LENGTH,
};
use tracing::debug;

use crate::state::State;
use crate::txn::Txn;

/// Append a posting inside an open transaction.
///
/// Each entry stores the balance after itself, and the account row's cached
/// wallet is updated in the same buffered batch, so the two can never be
/// observed out of step. Non-admin accounts may not debit past zero; the
/// Admin account is the liquidity sink/source and is exempt.
pub(crate) async fn post_in<S: State>(
    txn: &mut Txn<'_, S>,
    id: &AccountId,
    description: &str,
    debit: u64,
    credit: u64,
    now: u64,
) -> Result<LedgerEntry, EngineError> {
    let mut account = txn.expect_account(id).await?;
    let mut journal = txn.journal(id).await?;
    let balance = journal.balance();

    if debit > 0 && account.kind() != AccountKind::Admin {
        let available = u64::try_from(balance).unwrap_or(0);
        if debit > available {
            return Err(EngineError::InsufficientFunds {
                debit,
                balance: available,
            });
        }
    }

    let next = balance
        .checked_sub_unsigned(debit)
        .and_then(|b| b.checked_add_unsigned(credit))
        .ok_or_else(|| anyhow!("balance overflow for {id}"))?;

    // Cap the description on a char boundary; a byte-index truncate panics
    // mid-codepoint.
    let mut cut = MAX_DESCRIPTION_LENGTH.min(description.len());
    while !description.is_char_boundary(cut) {
        cut -= 1;
    }
    let description = description[..cut].to_owned();
    let entry = LedgerEntry {
        seq: journal.entries.len() as u64 + 1,
        account: id.clone(),
        kind: account.kind(),
        ts: now,
        description,
        debit,
        credit,
        balance: next,
    };
    debug!(account = %id, debit, credit, balance = next, "posted ledger entry");

    journal.entries.push(entry.clone());
    txn.put_journal(id.clone(), journal);
    account.wallet = next;
    txn.put_account(account);
    Ok(entry)
}

/// Append a single posting as its own transaction.
///
/// Thin account flows (top-up, withdrawal, opening balances) go through
/// here; bet admission and settlement batch their postings instead.
pub async fn post<S: State>(
    state: &mut S,
    id: &AccountId,
    description: &str,
    debit: u64,
    credit: u64,
    now: u64,
) -> Result<LedgerEntry, EngineError> {
    let (entry, changes) = {
        let mut txn = Txn::new(&*state);
        let entry = post_in(&mut txn, id, description, debit, credit, now).await?;
        (entry, txn.commit())
    };
    state.apply(changes).await?;
    Ok(entry)
}

/// Current wallet value: the latest journal snapshot, 0 with no entries.
pub async fn balance<S: State>(state: &S, id: &AccountId) -> Result<i64, EngineError> {
    let txn = Txn::new(state);
    txn.expect_account(id).await?;
    Ok(txn.journal(id).await?.balance())
}

/// Wallet display row.
pub async fn wallet_view<S: State>(state: &S, id: &AccountId) -> Result<WalletView, EngineError> {
    let txn = Txn::new(state);
    let account = txn.expect_account(id).await?;
    Ok(WalletView {
        account: account.id,
        kind: account.role.kind(),
        balance: account.wallet,
    })
}

/// Move `amount` from the Admin float into an account, atomically.
pub async fn top_up<S: State>(
    state: &mut S,
    id: &AccountId,
    amount: u64,
    now: u64,
) -> Result<(), EngineError> {
    let changes = {
        let mut txn = Txn::new(&*state);
        let admin = txn.admin().await?;
        post_in(
            &mut txn,
            &admin.id,
            &format!("top-up to {id}"),
            amount,
            0,
            now,
        )
        .await?;
        post_in(&mut txn, id, "top-up", 0, amount, now).await?;
        txn.commit()
    };
    state.apply(changes).await?;
    Ok(())
}

/// Move `amount` out of an account back to the Admin float, atomically.
/// Fails `InsufficientFunds` when the account cannot cover it.
pub async fn withdraw<S: State>(
    state: &mut S,
    id: &AccountId,
    amount: u64,
    now: u64,
) -> Result<(), EngineError> {
    let changes = {
        let mut txn = Txn::new(&*state);
        let admin = txn.admin().await?;
        post_in(&mut txn, id, "withdrawal", amount, 0, now).await?;
        post_in(
            &mut txn,
            &admin.id,
            &format!("withdrawal from {id}"),
            0,
            amount,
            now,
        )
        .await?;
        txn.commit()
    };
    state.apply(changes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{seed_admin, seed_dealer, seed_user, NOW};
    use crate::state::Memory;

    #[tokio::test]
    async fn posting_tracks_running_balance() {
        let mut state = Memory::default();
        seed_admin(&mut state, 0).await;
        let dealer = seed_dealer(&mut state, "d1", 0).await;

        post(&mut state, &dealer, "opening", 0, 1_000, NOW)
            .await
            .unwrap();
        let entry = post(&mut state, &dealer, "fee", 300, 0, NOW + 1)
            .await
            .unwrap();
        assert_eq!(entry.seq, 2);
        assert_eq!(entry.balance, 700);
        assert_eq!(balance(&state, &dealer).await.unwrap(), 700);

        let txn = Txn::new(&state);
        assert!(txn.journal(&dealer).await.unwrap().replay_consistent());
    }

    #[tokio::test]
    async fn non_admin_cannot_overdraw() {
        let mut state = Memory::default();
        let admin = seed_admin(&mut state, 0).await;
        seed_dealer(&mut state, "d1", 0).await;
        let user = seed_user(&mut state, "u1", "d1", 500).await;

        let err = post(&mut state, &user, "overdraft", 501, 0, NOW)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientFunds {
                debit: 501,
                balance: 500
            }
        ));
        // No partial effect.
        assert_eq!(balance(&state, &user).await.unwrap(), 500);

        // Admin runs negative freely.
        post(&mut state, &admin, "prize float", 10_000, 0, NOW)
            .await
            .unwrap();
        assert!(balance(&state, &admin).await.unwrap() < 0);
    }

    #[tokio::test]
    async fn top_up_and_withdraw_conserve_money() {
        let mut state = Memory::default();
        let admin = seed_admin(&mut state, 100_000).await;
        seed_dealer(&mut state, "d1", 0).await;
        let user = seed_user(&mut state, "u1", "d1", 0).await;

        top_up(&mut state, &user, 2_000, NOW).await.unwrap();
        assert_eq!(balance(&state, &user).await.unwrap(), 2_000);
        assert_eq!(balance(&state, &admin).await.unwrap(), 98_000);

        withdraw(&mut state, &user, 500, NOW + 10).await.unwrap();
        assert_eq!(balance(&state, &user).await.unwrap(), 1_500);
        assert_eq!(balance(&state, &admin).await.unwrap(), 98_500);

        // Withdrawing more than the wallet rolls the pair back together.
        let err = withdraw(&mut state, &user, 5_000, NOW + 20)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));
        assert_eq!(balance(&state, &user).await.unwrap(), 1_500);
        assert_eq!(balance(&state, &admin).await.unwrap(), 98_500);
    }

    #[tokio::test]
    async fn long_multibyte_description_is_capped_not_fatal() {
        let mut state = Memory::default();
        seed_admin(&mut state, 0).await;
        let dealer = seed_dealer(&mut state, "d1", 0).await;

        // 100 three-byte chars: byte 256 falls inside a codepoint.
        let description = "€".repeat(100);
        let entry = post(&mut state, &dealer, &description, 0, 50, NOW)
            .await
            .unwrap();
        assert!(entry.description.len() <= MAX_DESCRIPTION_LENGTH);
        assert!(entry.description.chars().all(|c| c == '€'));
        assert_eq!(entry.balance, 50);
    }

    #[tokio::test]
    async fn unknown_account_is_reported() {
        let mut state = Memory::default();
        seed_admin(&mut state, 0).await;
        let err = post(&mut state, &AccountId::new("ghost"), "x", 0, 1, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownAccount(_)));
    }
}
