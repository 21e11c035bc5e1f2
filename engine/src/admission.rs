//! Bet admission: one atomic unit from restriction check to bet rows.

use anyhow::anyhow;
use kismat_types::{
    AccountId, Bet, BetGroup, DrawId, EngineError, Role, COMMISSION_SCALE,
};
use tracing::{debug, info};

use crate::clock::is_market_open;
use crate::ledger::post_in;
use crate::limits::{check_exposure, check_per_draw_cap};
use crate::state::State;
use crate::txn::Txn;

fn commission(total: u64, bps: u32) -> u64 {
    ((total as u128 * bps as u128) / COMMISSION_SCALE as u128) as u64
}

/// Admit a batch of bet groups for one user on one draw.
///
/// Checks run in a fixed order (restriction, market window, per-draw cap,
/// exposure ceilings, wallet) and the first violation aborts the whole
/// request; there is no partial admission. On success the stake moves
/// user → admin with commission rebates flowing back, and one bet row is
/// written per picked number.
pub async fn place_bets<S: State>(
    state: &mut S,
    now: u64,
    user_id: &AccountId,
    draw_id: &DrawId,
    groups: Vec<BetGroup>,
    placed_by: &AccountId,
) -> Result<Vec<Bet>, EngineError> {
    let (bets, changes) = {
        let mut txn = Txn::new(&*state);

        let user = txn.expect_account(user_id).await?;
        let Role::User(profile) = user.role.clone() else {
            return Err(EngineError::UnknownAccount(user_id.to_string()));
        };
        if profile.restricted {
            return Err(EngineError::AccountRestricted(user_id.to_string()));
        }

        let dealer = txn.expect_account(&profile.dealer).await?;
        let draw = txn.expect_draw(draw_id).await?;
        if !is_market_open(draw.close_time, now) {
            return Err(EngineError::MarketClosed(draw.id.to_string()));
        }

        let request_total: u64 = groups.iter().map(BetGroup::total).fold(0, u64::saturating_add);
        if groups.is_empty() || request_total == 0 {
            return Err(anyhow!("empty bet request").into());
        }

        let mut existing = txn.bets(draw_id).await?;
        check_per_draw_cap(&existing, user_id, &profile.bet_limits, request_total)?;
        check_exposure(&txn, &existing, &groups, &profile.bet_limits).await?;

        let wallet = u64::try_from(user.wallet).unwrap_or(0);
        if request_total > wallet {
            return Err(EngineError::InsufficientBalance {
                requested: request_total,
                wallet,
            });
        }

        // Stake moves to the admin float; commission rebates flow back out of
        // it, netting to zero across user, dealer, and admin.
        let admin = txn.admin().await?;
        post_in(
            &mut txn,
            user_id,
            &format!("stake on {}", draw.name),
            request_total,
            0,
            now,
        )
        .await?;
        let user_commission = commission(request_total, profile.commission_bps);
        if user_commission > 0 {
            post_in(&mut txn, user_id, "commission rebate", 0, user_commission, now).await?;
        }
        post_in(
            &mut txn,
            &admin.id,
            &format!("stake from {user_id} on {}", draw.name),
            0,
            request_total,
            now,
        )
        .await?;
        if user_commission > 0 {
            post_in(
                &mut txn,
                &admin.id,
                &format!("commission rebate for {user_id}"),
                user_commission,
                0,
                now,
            )
            .await?;
        }
        let dealer_bps = match &dealer.role {
            Role::Dealer(dealer_profile) => dealer_profile.commission_bps,
            _ => 0,
        };
        let margin_bps = dealer_bps.saturating_sub(profile.commission_bps);
        let dealer_commission = commission(request_total, margin_bps);
        if dealer_commission > 0 {
            post_in(
                &mut txn,
                &admin.id,
                &format!("dealer commission for {}", dealer.id),
                dealer_commission,
                0,
                now,
            )
            .await?;
            post_in(
                &mut txn,
                &dealer.id,
                &format!("commission on {user_id} stake"),
                0,
                dealer_commission,
                now,
            )
            .await?;
        }

        // One bet row per picked number; a duplicate number stakes again.
        let mut bets = Vec::new();
        for group in groups {
            for number in group.numbers {
                let id = txn.next_bet_id().await?;
                let bet = Bet {
                    id,
                    user: user_id.clone(),
                    dealer: dealer.id.clone(),
                    draw: draw_id.clone(),
                    sub_game: group.sub_game,
                    numbers: vec![number],
                    amount_per_number: group.amount_per_number,
                    total_amount: group.amount_per_number,
                    ts: now,
                };
                debug!(bet = bet.id, sub_game = ?bet.sub_game, total = bet.total_amount, "bet admitted");
                existing.push(bet.clone());
                bets.push(bet);
            }
        }
        txn.put_bets(draw_id.clone(), existing);
        (bets, txn.commit())
    };
    state.apply(changes).await?;
    info!(
        user = %user_id, draw = %draw_id, placed_by = %placed_by,
        count = bets.len(), "bet request admitted"
    );
    Ok(bets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::balance;
    use crate::mocks::{open_market_now, standard_house, StandardHouse};
    use crate::state::Memory;
    use kismat_types::{StakeBucket, SubGame};

    fn group(sub_game: SubGame, numbers: &[&str], amount: u64) -> BetGroup {
        BetGroup {
            sub_game,
            numbers: numbers.iter().map(|n| n.to_string()).collect(),
            amount_per_number: amount,
        }
    }

    #[tokio::test]
    async fn worked_example_two_numbers() {
        let mut state = Memory::default();
        let StandardHouse {
            admin,
            dealer,
            user,
            draw,
            ..
        } = standard_house(&mut state, 1_000).await;
        let now = open_market_now();

        let bets = place_bets(
            &mut state,
            now,
            &user,
            &draw,
            vec![group(SubGame::TwoDigit, &["14", "25"], 100)],
            &user,
        )
        .await
        .unwrap();
        // One row per picked number.
        assert_eq!(bets.len(), 2);
        assert!(bets.iter().all(|bet| bet.total_amount == 100));

        // 5% user commission and a 2% dealer margin on a 200 stake.
        assert_eq!(balance(&state, &user).await.unwrap(), 1_000 - 200 + 10);
        assert_eq!(balance(&state, &dealer).await.unwrap(), 4);
        assert_eq!(balance(&state, &admin).await.unwrap(), 10_000 + 200 - 10 - 4);
    }

    #[tokio::test]
    async fn admission_conserves_system_money() {
        let mut state = Memory::default();
        let StandardHouse {
            admin,
            dealer,
            user,
            draw,
            ..
        } = standard_house(&mut state, 1_000).await;
        let before = balance(&state, &admin).await.unwrap()
            + balance(&state, &dealer).await.unwrap()
            + balance(&state, &user).await.unwrap();

        place_bets(
            &mut state,
            open_market_now(),
            &user,
            &draw,
            vec![
                group(SubGame::TwoDigit, &["14", "25", "36"], 100),
                group(SubGame::OneDigitOpen, &["7"], 50),
            ],
            &user,
        )
        .await
        .unwrap();

        let after = balance(&state, &admin).await.unwrap()
            + balance(&state, &dealer).await.unwrap()
            + balance(&state, &user).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn closed_market_rejects() {
        let mut state = Memory::default();
        let StandardHouse { user, draw, .. } = standard_house(&mut state, 1_000).await;
        // 15:00 PKT is before the cycle opens.
        let closed = crate::mocks::pkt(2026, 8, 30, 15, 0);
        let err = place_bets(
            &mut state,
            closed,
            &user,
            &draw,
            vec![group(SubGame::TwoDigit, &["14"], 100)],
            &user,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::MarketClosed(_)));
    }

    #[tokio::test]
    async fn restricted_user_rejects() {
        let mut state = Memory::default();
        let StandardHouse { user, draw, .. } = standard_house(&mut state, 1_000).await;
        crate::accounts::set_restricted(&mut state, &user, true)
            .await
            .unwrap();
        let err = place_bets(
            &mut state,
            open_market_now(),
            &user,
            &draw,
            vec![group(SubGame::TwoDigit, &["14"], 100)],
            &user,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::AccountRestricted(_)));
    }

    #[tokio::test]
    async fn capacity_breach_leaves_no_trace() {
        let mut state = Memory::default();
        let StandardHouse {
            admin,
            user,
            draw,
            ..
        } = standard_house(&mut state, 1_000).await;
        crate::limits::set_number_limit(&mut state, StakeBucket::TwoDigit, "14", 150)
            .await
            .unwrap();

        let rows_before = state.len();
        let err = place_bets(
            &mut state,
            open_market_now(),
            &user,
            &draw,
            vec![group(SubGame::TwoDigit, &["14", "25"], 100)],
            &user,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::MarketCapacityExceeded { .. }));
        assert_eq!(state.len(), rows_before);
        assert_eq!(balance(&state, &user).await.unwrap(), 1_000);
        assert_eq!(balance(&state, &admin).await.unwrap(), 10_000);
    }

    #[tokio::test]
    async fn insufficient_wallet_rejects_whole_batch() {
        let mut state = Memory::default();
        let StandardHouse { user, draw, .. } = standard_house(&mut state, 150).await;
        let err = place_bets(
            &mut state,
            open_market_now(),
            &user,
            &draw,
            vec![group(SubGame::TwoDigit, &["14", "25"], 100)],
            &user,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientBalance {
                requested: 200,
                wallet: 150
            }
        ));
    }

    #[tokio::test]
    async fn per_draw_cap_applies_before_exposure() {
        let mut state = Memory::default();
        let StandardHouse { user, draw, .. } = standard_house(&mut state, 10_000).await;
        crate::accounts::update_rates(
            &mut state,
            &user,
            crate::accounts::UpdateRates {
                bet_limits: Some(kismat_types::BetLimits {
                    per_draw: 300,
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = place_bets(
            &mut state,
            open_market_now(),
            &user,
            &draw,
            vec![group(SubGame::TwoDigit, &["14", "25"], 200)],
            &user,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::PerDrawCapExceeded { .. }));
    }

    #[tokio::test]
    async fn personal_cap_measures_global_stake() {
        let mut state = Memory::default();
        let StandardHouse {
            user,
            second_user,
            draw,
            ..
        } = standard_house(&mut state, 10_000).await;
        // Another bettor fills 400 of the number's stake.
        place_bets(
            &mut state,
            open_market_now(),
            &second_user,
            &draw,
            vec![group(SubGame::TwoDigit, &["14"], 400)],
            &second_user,
        )
        .await
        .unwrap();

        crate::accounts::update_rates(
            &mut state,
            &user,
            crate::accounts::UpdateRates {
                bet_limits: Some(kismat_types::BetLimits {
                    two_digit: 500,
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // The user has no prior stake on "14", yet the cap trips because the
        // check measures the number's global cumulative stake.
        let err = place_bets(
            &mut state,
            open_market_now(),
            &user,
            &draw,
            vec![group(SubGame::TwoDigit, &["14"], 200)],
            &user,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::PersonalCapExceeded { .. }));
    }
}
