//! Test fixtures: an in-memory house with one dealer and two users, plus
//! timestamp helpers anchored in the trading timezone.

use chrono::{FixedOffset, TimeZone};
use kismat_types::{
    AccountId, BetLimits, DealerProfile, DrawId, DrawKind, PrizeRates, Role, UserProfile,
    TRADING_ZONE_OFFSET_SECS,
};

use crate::accounts::{create_account, NewAccount};
use crate::ledger::post;
use crate::settlement::{couple_draws, register_draw};
use crate::state::State;

/// 2026-08-30 17:00 in the trading timezone, one hour into a cycle.
pub const NOW: u64 = 1_788_091_200;

/// Unix timestamp for a local wall-clock reading in the trading timezone.
pub fn pkt(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> u64 {
    let zone = FixedOffset::east_opt(TRADING_ZONE_OFFSET_SECS).unwrap();
    zone.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
        .timestamp() as u64
}

/// A moment when the standard fixture's draw (closing 21:10) accepts bets.
pub fn open_market_now() -> u64 {
    NOW
}

fn prize_rates(one_open: u64, one_close: u64, two: u64) -> PrizeRates {
    PrizeRates {
        one_digit_open: one_open,
        one_digit_close: one_close,
        two_digit: two,
    }
}

/// User role under `dealer` with a 5% commission and standard prize rates.
pub fn user_role(dealer: &str) -> Role {
    Role::User(UserProfile {
        dealer: AccountId::new(dealer),
        commission_bps: 500,
        prize_rates: prize_rates(9, 8, 80),
        bet_limits: BetLimits::unlimited(),
        restricted: false,
    })
}

pub async fn seed_admin<S: State>(state: &mut S, opening: u64) -> AccountId {
    let account = create_account(
        state,
        NewAccount {
            id: AccountId::new("house"),
            name: "House".into(),
            role: Role::Admin,
            opening_balance: opening,
        },
        NOW,
    )
    .await
    .unwrap();
    account.id
}

/// Dealer with a 7% commission. The wallet is credited directly so the Admin
/// float stays untouched by fixture setup.
pub async fn seed_dealer<S: State>(state: &mut S, id: &str, wallet: u64) -> AccountId {
    let account = create_account(
        state,
        NewAccount {
            id: AccountId::new(id),
            name: id.to_uppercase(),
            role: Role::Dealer(DealerProfile {
                commission_bps: 700,
                prize_rates: prize_rates(10, 9, 85),
                restricted: false,
            }),
            opening_balance: 0,
        },
        NOW,
    )
    .await
    .unwrap();
    if wallet > 0 {
        post(state, &account.id, "seed balance", 0, wallet, NOW)
            .await
            .unwrap();
    }
    account.id
}

pub async fn seed_user<S: State>(
    state: &mut S,
    id: &str,
    dealer: &str,
    wallet: u64,
) -> AccountId {
    let account = create_account(
        state,
        NewAccount {
            id: AccountId::new(id),
            name: id.to_uppercase(),
            role: user_role(dealer),
            opening_balance: 0,
        },
        NOW,
    )
    .await
    .unwrap();
    if wallet > 0 {
        post(state, &account.id, "seed balance", 0, wallet, NOW)
            .await
            .unwrap();
    }
    account.id
}

/// The standard fixture: Admin float of 10,000, one dealer at 7% commission
/// with prize rates 10/9/85, two users at 5% with rates 9/8/80, and an open
/// two-digit draw closing 21:10.
pub struct StandardHouse {
    pub admin: AccountId,
    pub dealer: AccountId,
    pub user: AccountId,
    pub second_user: AccountId,
    pub draw: DrawId,
}

pub async fn standard_house<S: State>(state: &mut S, user_wallet: u64) -> StandardHouse {
    let admin = seed_admin(state, 10_000).await;
    let dealer = seed_dealer(state, "d1", 0).await;
    let user = seed_user(state, "u1", "d1", user_wallet).await;
    let second_user = seed_user(state, "u2", "d1", user_wallet).await;
    let draw = DrawId::new("ld");
    register_draw(state, &draw, "Lucky Draw", DrawKind::TwoDigit, "21:10", true)
        .await
        .unwrap();
    StandardHouse {
        admin,
        dealer,
        user,
        second_user,
        draw,
    }
}

/// A coupled pair: two-digit primary plus the one-digit draw supplying its
/// close digit.
pub async fn coupled_pair<S: State>(state: &mut S) -> (DrawId, DrawId) {
    let primary = DrawId::new("ak");
    let secondary = DrawId::new("akc");
    register_draw(state, &primary, "AK", DrawKind::TwoDigit, "21:10", true)
        .await
        .unwrap();
    register_draw(
        state,
        &secondary,
        "AK Close",
        DrawKind::OneDigitClose,
        "21:20",
        true,
    )
    .await
    .unwrap();
    couple_draws(state, &primary, &secondary).await.unwrap();
    (primary, secondary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_anchored_in_the_trading_zone() {
        assert_eq!(NOW, pkt(2026, 8, 30, 17, 0));
    }
}
