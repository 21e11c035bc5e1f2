//! Stake limiter: layered exposure ceilings per draw, per number, per bucket.

use chrono::NaiveDate;
use kismat_types::{
    AccountId, Bet, BetGroup, BetLimits, DrawId, EngineError, Key, NumberLimit, NumberStake,
    StakeBucket, StakeSummary,
};
use std::collections::BTreeMap;
use tracing::debug;

use crate::clock::trading_date;
use crate::state::State;
use crate::txn::Txn;

/// Cumulative stake per `(bucket, number)` across a set of bets. Duplicate
/// numbers within one bet each stake again.
pub(crate) fn stake_by_number(bets: &[Bet]) -> BTreeMap<(StakeBucket, String), u64> {
    let mut totals = BTreeMap::new();
    for bet in bets {
        let bucket = bet.sub_game.bucket();
        for number in &bet.numbers {
            let slot: &mut u64 = totals.entry((bucket, number.clone())).or_default();
            *slot = slot.saturating_add(bet.amount_per_number);
        }
    }
    totals
}

fn personal_cap(limits: &BetLimits, bucket: StakeBucket) -> u64 {
    if bucket.is_one_digit() {
        limits.one_digit
    } else {
        limits.two_digit
    }
}

/// A picked number must be all digits and sized for its bucket: one digit
/// for the open/close buckets, two for the two-digit bucket.
pub(crate) fn validate_number(bucket: StakeBucket, number: &str) -> Result<(), EngineError> {
    let expected = if bucket.is_one_digit() { 1 } else { 2 };
    if number.len() != expected || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EngineError::MalformedNumber(number.to_owned()));
    }
    Ok(())
}

/// Enforce the user's per-draw aggregate ceiling (0 = unlimited).
pub(crate) fn check_per_draw_cap(
    existing: &[Bet],
    user: &AccountId,
    limits: &BetLimits,
    request_total: u64,
) -> Result<(), EngineError> {
    if limits.per_draw == 0 {
        return Ok(());
    }
    let prior: u64 = existing
        .iter()
        .filter(|bet| &bet.user == user)
        .map(|bet| bet.total_amount)
        .fold(0, u64::saturating_add);
    let attempted = prior.saturating_add(request_total);
    if attempted > limits.per_draw {
        return Err(EngineError::PerDrawCapExceeded {
            attempted,
            limit: limits.per_draw,
        });
    }
    Ok(())
}

/// Run the per-number ceilings over a proposed set of groups against the
/// draw's existing bets, all from one consistent snapshot.
///
/// Per (bucket, number): the global `NumberLimit` ceiling first, then the
/// user's per-bucket cap. The personal cap deliberately measures the
/// number's global cumulative stake, not the user's own share; this matches
/// the system this engine replaces.
pub(crate) async fn check_exposure<S: State>(
    txn: &Txn<'_, S>,
    existing: &[Bet],
    groups: &[BetGroup],
    limits: &BetLimits,
) -> Result<(), EngineError> {
    let mut proposed: BTreeMap<(StakeBucket, String), u64> = BTreeMap::new();
    for group in groups {
        let bucket = group.sub_game.bucket();
        for number in &group.numbers {
            validate_number(bucket, number)?;
            let slot: &mut u64 = proposed.entry((bucket, number.clone())).or_default();
            *slot = slot.saturating_add(group.amount_per_number);
        }
    }

    let current = stake_by_number(existing);
    for ((bucket, number), added) in proposed {
        let staked = current.get(&(bucket, number.clone())).copied().unwrap_or(0);
        let would_be = staked.saturating_add(added);

        if let Some(limit) = txn.number_limit(bucket, &number).await? {
            if would_be > limit {
                debug!(%number, ?bucket, staked, added, limit, "global stake cap hit");
                return Err(EngineError::MarketCapacityExceeded {
                    number,
                    current: staked,
                    limit,
                });
            }
        }

        let cap = personal_cap(limits, bucket);
        if cap != 0 && would_be > cap {
            debug!(%number, ?bucket, staked, added, cap, "personal stake cap hit");
            return Err(EngineError::PersonalCapExceeded { number, limit: cap });
        }
    }
    Ok(())
}

/// Install (or replace) the global ceiling for one number.
pub async fn set_number_limit<S: State>(
    state: &mut S,
    bucket: StakeBucket,
    number: &str,
    limit: u64,
) -> Result<(), EngineError> {
    validate_number(bucket, number)?;
    let changes = {
        let mut txn = Txn::new(&*state);
        txn.put_number_limit(NumberLimit {
            bucket,
            number: number.to_owned(),
            limit,
        });
        txn.commit()
    };
    state.apply(changes).await?;
    Ok(())
}

/// Remove the global ceiling for one number.
pub async fn clear_number_limit<S: State>(
    state: &mut S,
    bucket: StakeBucket,
    number: &str,
) -> Result<(), EngineError> {
    let changes = {
        let mut txn = Txn::new(&*state);
        txn.remove(Key::NumberLimit(bucket, number.to_owned()));
        txn.commit()
    };
    state.apply(changes).await?;
    Ok(())
}

/// Per-number stake totals for display, optionally filtered by draw, dealer,
/// and trading-zone calendar date. Served from the current snapshot without
/// locking.
pub async fn stake_summary<S: State>(
    state: &S,
    draw: Option<&DrawId>,
    dealer: Option<&AccountId>,
    date: Option<NaiveDate>,
) -> Result<StakeSummary, EngineError> {
    let txn = Txn::new(state);
    let mut bets = Vec::new();
    match draw {
        Some(id) => bets.extend(txn.bets(id).await?),
        None => {
            for id in txn.draw_directory().await? {
                bets.extend(txn.bets(&id).await?);
            }
        }
    }
    bets.retain(|bet| {
        dealer.map_or(true, |d| &bet.dealer == d)
            && date.map_or(true, |day| trading_date(bet.ts) == Some(day))
    });

    let totals = stake_by_number(&bets)
        .into_iter()
        .map(|((bucket, number), total)| NumberStake {
            bucket,
            number,
            total,
        })
        .collect();
    Ok(StakeSummary { totals })
}
