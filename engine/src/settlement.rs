//! Draw lifecycle and settlement.
//!
//! A draw moves `awaiting result → declared (editable) → approved`; approval
//! walks every bet on the draw and posts prizes and dealer profits out of
//! the Admin float in one transaction. A coupled pair of draws shares its
//! close digit through an explicit two-ended relation, never by name.

use anyhow::anyhow;
use kismat_types::{
    Bet, Coupling, Draw, DrawId, DrawKind, DrawResult, EngineError, Key, PrizeRates, Role,
    SubGame,
};
use tracing::{info, warn};

use crate::ledger::post_in;
use crate::state::State;
use crate::txn::Txn;

fn parse_digit(raw: &str) -> Result<u8, EngineError> {
    let raw = raw.trim();
    match raw.as_bytes() {
        [b @ b'0'..=b'9'] => Ok(b - b'0'),
        _ => Err(EngineError::MalformedNumber(raw.to_owned())),
    }
}

fn parse_two_digits(raw: &str) -> Result<(u8, u8), EngineError> {
    let raw = raw.trim();
    match raw.as_bytes() {
        [a @ b'0'..=b'9', b @ b'0'..=b'9'] => Ok((a - b'0', b - b'0')),
        _ => Err(EngineError::MalformedNumber(raw.to_owned())),
    }
}

fn digit_of(number: &str) -> Option<u8> {
    match number.as_bytes() {
        [b @ b'0'..=b'9'] => Some(b - b'0'),
        _ => None,
    }
}

fn prize_rate(rates: &PrizeRates, sub_game: SubGame) -> u64 {
    match sub_game {
        SubGame::OneDigitOpen => rates.one_digit_open,
        SubGame::OneDigitClose => rates.one_digit_close,
        SubGame::TwoDigit | SubGame::Combo => rates.two_digit,
    }
}

fn matches_number(sub_game: SubGame, number: &str, kind: DrawKind, result: DrawResult, full: &str) -> bool {
    match sub_game {
        // Open-digit bets only win against a two-digit result.
        SubGame::OneDigitOpen => {
            kind == DrawKind::TwoDigit
                && digit_of(number).zip(result.open).is_some_and(|(a, b)| a == b)
        }
        // Against a one-digit draw the whole result *is* the close digit, so
        // one comparison covers both draw kinds.
        SubGame::OneDigitClose => digit_of(number).zip(result.close).is_some_and(|(a, b)| a == b),
        SubGame::TwoDigit | SubGame::Combo => number == full,
    }
}

fn winning_count(bet: &Bet, kind: DrawKind, result: DrawResult, full: &str) -> u64 {
    bet.numbers
        .iter()
        .filter(|number| matches_number(bet.sub_game, number, kind, result, full))
        .count() as u64
}

/// Register a draw. A close time that fails to parse leaves the market
/// permanently closed rather than erroring.
pub async fn register_draw<S: State>(
    state: &mut S,
    id: &DrawId,
    name: &str,
    kind: DrawKind,
    close_time: &str,
    visible: bool,
) -> Result<Draw, EngineError> {
    let (draw, changes) = {
        let mut txn = Txn::new(&*state);
        if txn.draw(id).await?.is_some() {
            return Err(anyhow!("draw {id} already registered").into());
        }
        let draw = Draw {
            id: id.clone(),
            name: name.to_owned(),
            kind,
            close_time: kismat_types::DrawTime::parse(close_time),
            result: None,
            payouts_approved: false,
            visible,
            coupling: None,
        };
        if draw.close_time.is_none() {
            warn!(draw = %id, close_time, "unparseable close time; market will never open");
        }
        let mut directory = txn.draw_directory().await?;
        directory.push(id.clone());
        txn.put_draw_directory(directory);
        txn.put_draw(draw.clone());
        (draw, txn.commit())
    };
    state.apply(changes).await?;
    Ok(draw)
}

/// Couple a two-digit draw to the one-digit draw that supplies its close
/// digit. Written on both ends so either side resolves the other.
pub async fn couple_draws<S: State>(
    state: &mut S,
    primary: &DrawId,
    secondary: &DrawId,
) -> Result<(), EngineError> {
    let changes = {
        let mut txn = Txn::new(&*state);
        let mut first = txn.expect_draw(primary).await?;
        let mut second = txn.expect_draw(secondary).await?;
        if first.kind != DrawKind::TwoDigit || second.kind != DrawKind::OneDigitClose {
            return Err(anyhow!("coupling requires a two-digit primary and a one-digit-close secondary").into());
        }
        first.coupling = Some(Coupling::ClosesVia(secondary.clone()));
        second.coupling = Some(Coupling::CloseDigitFor(primary.clone()));
        txn.put_draw(first);
        txn.put_draw(second);
        txn.commit()
    };
    state.apply(changes).await?;
    Ok(())
}

/// Display-only visibility flag.
pub async fn set_visibility<S: State>(
    state: &mut S,
    id: &DrawId,
    visible: bool,
) -> Result<(), EngineError> {
    let changes = {
        let mut txn = Txn::new(&*state);
        let mut draw = txn.expect_draw(id).await?;
        draw.visible = visible;
        txn.put_draw(draw);
        txn.commit()
    };
    state.apply(changes).await?;
    Ok(())
}

/// Compute the declared result for `draw` from a raw number, pulling the
/// close digit from a coupled secondary when one has already declared.
async fn resolve_declaration<S: State>(
    txn: &Txn<'_, S>,
    draw: &Draw,
    number: &str,
) -> Result<DrawResult, EngineError> {
    match draw.kind {
        DrawKind::OneDigitClose => Ok(DrawResult {
            open: None,
            close: Some(parse_digit(number)?),
        }),
        DrawKind::TwoDigit => match &draw.coupling {
            Some(Coupling::ClosesVia(secondary)) => {
                let open = parse_digit(number)?;
                let close = match txn.draw(secondary).await? {
                    Some(partner) => partner.result.and_then(|r| r.close),
                    None => None,
                };
                Ok(DrawResult {
                    open: Some(open),
                    close,
                })
            }
            _ => {
                let (open, close) = parse_two_digits(number)?;
                Ok(DrawResult {
                    open: Some(open),
                    close: Some(close),
                })
            }
        },
    }
}

/// Push a one-digit draw's declared digit into the primary it closes,
/// filling a pending close (`overwrite = false`) or rewriting it outright.
async fn propagate_close_digit<S: State>(
    txn: &mut Txn<'_, S>,
    draw: &Draw,
    digit: u8,
    overwrite: bool,
) -> Result<(), EngineError> {
    let Some(Coupling::CloseDigitFor(primary_id)) = &draw.coupling else {
        return Ok(());
    };
    let Some(mut primary) = txn.draw(primary_id).await? else {
        return Ok(());
    };
    let Some(mut result) = primary.result else {
        // The primary has not declared its open digit yet; it will pick the
        // close digit up from this draw when it does.
        return Ok(());
    };
    if result.close.is_some() && !overwrite {
        return Ok(());
    }
    result.close = Some(digit);
    primary.result = Some(result);
    txn.put_draw(primary);
    Ok(())
}

/// Declare a draw's winning number. Fails `AlreadyDeclared` when a result
/// exists. For a coupled primary the raw number is the open digit alone; for
/// its secondary the declared digit also completes the primary, in either
/// declaration order.
pub async fn declare_winner<S: State>(
    state: &mut S,
    id: &DrawId,
    number: &str,
) -> Result<Draw, EngineError> {
    let (draw, changes) = {
        let mut txn = Txn::new(&*state);
        let mut draw = txn.expect_draw(id).await?;
        if draw.result.is_some() {
            return Err(EngineError::AlreadyDeclared(id.to_string()));
        }
        let result = resolve_declaration(&txn, &draw, number).await?;
        draw.result = Some(result);
        if draw.kind == DrawKind::OneDigitClose {
            if let Some(digit) = result.close {
                propagate_close_digit(&mut txn, &draw, digit, false).await?;
            }
        }
        txn.put_draw(draw.clone());
        (draw, txn.commit())
    };
    state.apply(changes).await?;
    info!(draw = %id, number, "result declared");
    Ok(draw)
}

/// Overwrite a declared-but-unapproved result, applying the same coupling
/// rules symmetrically.
pub async fn update_winning_number<S: State>(
    state: &mut S,
    id: &DrawId,
    number: &str,
) -> Result<Draw, EngineError> {
    let (draw, changes) = {
        let mut txn = Txn::new(&*state);
        let mut draw = txn.expect_draw(id).await?;
        let Some(existing) = draw.result else {
            return Err(EngineError::NoResultOrAlreadyApproved(id.to_string()));
        };
        if draw.payouts_approved {
            return Err(EngineError::NoResultOrAlreadyApproved(id.to_string()));
        }

        let result = match (draw.kind, &draw.coupling) {
            // Rewriting a coupled primary replaces the open half only; the
            // close half still belongs to the secondary.
            (DrawKind::TwoDigit, Some(Coupling::ClosesVia(_))) => DrawResult {
                open: Some(parse_digit(number)?),
                close: existing.close,
            },
            (DrawKind::TwoDigit, _) => {
                let (open, close) = parse_two_digits(number)?;
                DrawResult {
                    open: Some(open),
                    close: Some(close),
                }
            }
            (DrawKind::OneDigitClose, _) => DrawResult {
                open: None,
                close: Some(parse_digit(number)?),
            },
        };
        draw.result = Some(result);
        if draw.kind == DrawKind::OneDigitClose {
            if let Some(digit) = result.close {
                propagate_close_digit(&mut txn, &draw, digit, true).await?;
            }
        }
        txn.put_draw(draw.clone());
        (draw, txn.commit())
    };
    state.apply(changes).await?;
    info!(draw = %id, number, "result updated");
    Ok(draw)
}

/// Settle every bet on a draw against its final result and mark payouts
/// approved. Fails `PayoutConditionsNotMet` unless a complete result exists
/// and payouts are not yet approved; a second call therefore fails and posts
/// nothing.
pub async fn approve_payouts<S: State>(
    state: &mut S,
    now: u64,
    id: &DrawId,
) -> Result<Draw, EngineError> {
    let (draw, changes) = {
        let mut txn = Txn::new(&*state);
        let mut draw = txn.expect_draw(id).await?;
        if draw.payouts_approved {
            return Err(EngineError::PayoutConditionsNotMet(id.to_string()));
        }
        let Some(result) = draw.final_result() else {
            return Err(EngineError::PayoutConditionsNotMet(id.to_string()));
        };
        let full = result
            .full_number(draw.kind)
            .ok_or_else(|| anyhow!("final result failed to render"))?;

        let admin = txn.admin().await?;
        for bet in txn.bets(id).await? {
            let wins = winning_count(&bet, draw.kind, result, &full);
            if wins == 0 {
                continue;
            }
            let Some(user) = txn.account(&bet.user).await? else {
                warn!(bet = bet.id, user = %bet.user, "winning bet for deleted user; skipping");
                continue;
            };
            let Role::User(profile) = &user.role else {
                warn!(bet = bet.id, user = %bet.user, "bet owner is not a user; skipping");
                continue;
            };
            let user_rate = prize_rate(&profile.prize_rates, bet.sub_game);
            let user_prize = wins
                .checked_mul(bet.amount_per_number)
                .and_then(|v| v.checked_mul(user_rate))
                .ok_or_else(|| anyhow!("prize overflow for bet {}", bet.id))?;
            if user_prize > 0 {
                post_in(
                    &mut txn,
                    &bet.user,
                    &format!("prize on {} ({full})", draw.name),
                    0,
                    user_prize,
                    now,
                )
                .await?;
                post_in(
                    &mut txn,
                    &admin.id,
                    &format!("prize to {} on {}", bet.user, draw.name),
                    user_prize,
                    0,
                    now,
                )
                .await?;
            }

            let dealer_rate = match txn.account(&bet.dealer).await? {
                Some(dealer) => match &dealer.role {
                    Role::Dealer(dealer_profile) => {
                        prize_rate(&dealer_profile.prize_rates, bet.sub_game)
                    }
                    _ => 0,
                },
                None => 0,
            };
            let margin = dealer_rate.saturating_sub(user_rate);
            let dealer_profit = wins
                .checked_mul(bet.amount_per_number)
                .and_then(|v| v.checked_mul(margin))
                .ok_or_else(|| anyhow!("profit overflow for bet {}", bet.id))?;
            if dealer_profit > 0 {
                post_in(
                    &mut txn,
                    &bet.dealer,
                    &format!("profit on {} ({full})", draw.name),
                    0,
                    dealer_profit,
                    now,
                )
                .await?;
                post_in(
                    &mut txn,
                    &admin.id,
                    &format!("profit to {} on {}", bet.dealer, draw.name),
                    dealer_profit,
                    0,
                    now,
                )
                .await?;
            }
        }

        draw.payouts_approved = true;
        txn.put_draw(draw.clone());
        (draw, txn.commit())
    };
    state.apply(changes).await?;
    info!(draw = %id, "payouts approved");
    Ok(draw)
}

/// Start a fresh cycle: clear every draw's result and approval flag and
/// delete all bets. Ledger history is untouched. Invoked once per business
/// day by an external scheduler anchored to the trading timezone.
pub async fn reset_cycle<S: State>(state: &mut S) -> Result<(), EngineError> {
    let changes = {
        let mut txn = Txn::new(&*state);
        for id in txn.draw_directory().await? {
            if let Some(mut draw) = txn.draw(&id).await? {
                draw.result = None;
                draw.payouts_approved = false;
                txn.put_draw(draw);
            }
            txn.remove(Key::Bets(id));
        }
        txn.commit()
    };
    state.apply(changes).await?;
    info!("cycle reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{coupled_pair, standard_house, StandardHouse};
    use crate::state::Memory;
    use kismat_types::{display_result, DrawStatus};

    #[tokio::test]
    async fn double_declaration_rejected() {
        let mut state = Memory::default();
        let StandardHouse { draw, .. } = standard_house(&mut state, 0).await;
        declare_winner(&mut state, &draw, "14").await.unwrap();
        let err = declare_winner(&mut state, &draw, "25").await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyDeclared(_)));
    }

    #[tokio::test]
    async fn malformed_numbers_rejected() {
        let mut state = Memory::default();
        let StandardHouse { draw, .. } = standard_house(&mut state, 0).await;
        for raw in ["7", "abc", "1 4x", ""] {
            let err = declare_winner(&mut state, &draw, raw).await.unwrap_err();
            assert!(matches!(err, EngineError::MalformedNumber(_)), "{raw:?}");
        }
    }

    #[tokio::test]
    async fn coupling_completes_in_either_order() {
        // Secondary first.
        let mut state = Memory::default();
        standard_house(&mut state, 0).await;
        let (ak, akc) = coupled_pair(&mut state).await;
        declare_winner(&mut state, &akc, "7").await.unwrap();
        let declared = declare_winner(&mut state, &ak, "4").await.unwrap();
        assert_eq!(declared.result.unwrap().full_number(DrawKind::TwoDigit).as_deref(), Some("47"));

        // Primary first: the close half stays pending until the secondary
        // declares.
        let mut state = Memory::default();
        standard_house(&mut state, 0).await;
        let (ak, akc) = coupled_pair(&mut state).await;
        let declared = declare_winner(&mut state, &ak, "4").await.unwrap();
        let pending = declared.result.unwrap();
        assert_eq!(display_result(DrawKind::TwoDigit, &pending), "4*");
        assert_eq!(declared.status(), DrawStatus::Declared);
        assert!(declared.final_result().is_none());

        declare_winner(&mut state, &akc, "7").await.unwrap();
        let txn = Txn::new(&state);
        let completed = txn.expect_draw(&ak).await.unwrap();
        assert_eq!(
            completed.final_result().unwrap().full_number(DrawKind::TwoDigit).as_deref(),
            Some("47")
        );
    }

    #[tokio::test]
    async fn update_rewrites_either_half() {
        let mut state = Memory::default();
        standard_house(&mut state, 0).await;
        let (ak, akc) = coupled_pair(&mut state).await;
        declare_winner(&mut state, &ak, "4").await.unwrap();
        declare_winner(&mut state, &akc, "7").await.unwrap();

        // Rewriting the secondary rewrites the primary's close digit too.
        update_winning_number(&mut state, &akc, "9").await.unwrap();
        let txn = Txn::new(&state);
        let primary = txn.expect_draw(&ak).await.unwrap();
        assert_eq!(
            primary.result.unwrap().full_number(DrawKind::TwoDigit).as_deref(),
            Some("49")
        );
        drop(txn);

        // Rewriting the primary's open digit preserves the coupled close.
        update_winning_number(&mut state, &ak, "5").await.unwrap();
        let txn = Txn::new(&state);
        let primary = txn.expect_draw(&ak).await.unwrap();
        assert_eq!(
            primary.result.unwrap().full_number(DrawKind::TwoDigit).as_deref(),
            Some("59")
        );
    }

    #[tokio::test]
    async fn update_requires_unapproved_result() {
        let mut state = Memory::default();
        let StandardHouse { draw, .. } = standard_house(&mut state, 0).await;
        let err = update_winning_number(&mut state, &draw, "14")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoResultOrAlreadyApproved(_)));

        declare_winner(&mut state, &draw, "14").await.unwrap();
        approve_payouts(&mut state, crate::mocks::NOW, &draw)
            .await
            .unwrap();
        let err = update_winning_number(&mut state, &draw, "25")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NoResultOrAlreadyApproved(_)));
    }

    #[tokio::test]
    async fn approval_needs_final_result() {
        let mut state = Memory::default();
        standard_house(&mut state, 0).await;
        let (ak, _) = coupled_pair(&mut state).await;
        // Open digit alone is not a final result.
        declare_winner(&mut state, &ak, "4").await.unwrap();
        let err = approve_payouts(&mut state, crate::mocks::NOW, &ak)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PayoutConditionsNotMet(_)));
    }
}
