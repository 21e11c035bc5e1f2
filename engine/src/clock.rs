//! Clock/cycle resolver.
//!
//! The trading cycle runs 16:00 to 16:00 the next day in the fixed trading
//! timezone (PKT, UTC+5, no DST). All math happens on that offset; the host
//! timezone never participates. Pure functions, callable without
//! synchronization.

use chrono::{FixedOffset, TimeZone, Timelike};
use kismat_types::{DrawTime, CYCLE_OPEN_HOUR, TRADING_ZONE_OFFSET_SECS};

fn trading_zone() -> FixedOffset {
    FixedOffset::east_opt(TRADING_ZONE_OFFSET_SECS).expect("trading offset is in range")
}

/// Resolve the `(open, close)` instants (unix seconds) of the cycle
/// containing `now` for a draw closing at `close` local time.
///
/// The active cycle opened at 16:00 today if the local time-of-day is past
/// 16:00, else at 16:00 yesterday. A close time before 16:00 falls in the
/// early-morning continuation of the cycle, so it lands on the day after the
/// cycle's open date.
pub fn market_window(close: DrawTime, now_ts: u64) -> Option<(i64, i64)> {
    let tz = trading_zone();
    let now = tz.timestamp_opt(i64::try_from(now_ts).ok()?, 0).single()?;

    let today = now.date_naive();
    let open_date = if now.time().hour() < CYCLE_OPEN_HOUR {
        today.pred_opt()?
    } else {
        today
    };
    let close_date = if (close.hour as u32) < CYCLE_OPEN_HOUR {
        open_date.succ_opt()?
    } else {
        open_date
    };

    let open_naive = open_date.and_hms_opt(CYCLE_OPEN_HOUR, 0, 0)?;
    let close_naive = close_date.and_hms_opt(close.hour as u32, close.minute as u32, 0)?;
    let open_ts = tz.from_local_datetime(&open_naive).single()?.timestamp();
    let close_ts = tz.from_local_datetime(&close_naive).single()?.timestamp();
    Some((open_ts, close_ts))
}

/// Calendar date of an instant in the trading timezone, for display filters.
pub(crate) fn trading_date(ts: u64) -> Option<chrono::NaiveDate> {
    let tz = trading_zone();
    Some(tz.timestamp_opt(i64::try_from(ts).ok()?, 0).single()?.date_naive())
}

/// Whether the market is open at `now_ts`, half-open on the close instant.
///
/// A draw without a valid close time is permanently closed, never an error.
pub fn is_market_open(close_time: Option<DrawTime>, now_ts: u64) -> bool {
    match close_time.and_then(|close| market_window(close, now_ts)) {
        Some((open, close)) => {
            let now = now_ts as i64;
            open <= now && now < close
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::pkt;

    fn t(raw: &str) -> DrawTime {
        DrawTime::parse(raw).unwrap()
    }

    #[test]
    fn early_morning_close_spans_midnight() {
        // Before today's 16:00 open the previous cycle has already closed.
        assert!(!is_market_open(Some(t("00:55")), pkt(2026, 8, 30, 15, 0)));
        // After the open, the market runs until 00:55 the next calendar day.
        assert!(is_market_open(Some(t("00:55")), pkt(2026, 8, 30, 17, 0)));
        assert!(is_market_open(Some(t("00:55")), pkt(2026, 8, 31, 0, 54)));
        assert!(!is_market_open(Some(t("00:55")), pkt(2026, 8, 31, 0, 55)));
    }

    #[test]
    fn evening_close_stays_on_open_date() {
        let (open, close) = market_window(t("21:10"), pkt(2026, 8, 30, 17, 0)).unwrap();
        assert_eq!(open, pkt(2026, 8, 30, 16, 0) as i64);
        assert_eq!(close, pkt(2026, 8, 30, 21, 10) as i64);

        assert!(is_market_open(Some(t("21:10")), pkt(2026, 8, 30, 21, 9)));
        assert!(!is_market_open(Some(t("21:10")), pkt(2026, 8, 30, 21, 10)));
    }

    #[test]
    fn before_open_resolves_to_yesterdays_cycle() {
        let (open, close) = market_window(t("21:10"), pkt(2026, 8, 30, 3, 0)).unwrap();
        assert_eq!(open, pkt(2026, 8, 29, 16, 0) as i64);
        assert_eq!(close, pkt(2026, 8, 29, 21, 10) as i64);
        // That cycle's evening close is long past.
        assert!(!is_market_open(Some(t("21:10")), pkt(2026, 8, 30, 3, 0)));
        // But its early-morning draws are still trading.
        assert!(is_market_open(Some(t("04:30")), pkt(2026, 8, 30, 3, 0)));
    }

    #[test]
    fn open_boundary_is_inclusive() {
        assert!(is_market_open(Some(t("21:10")), pkt(2026, 8, 30, 16, 0)));
    }

    #[test]
    fn missing_close_time_never_opens() {
        assert!(!is_market_open(None, pkt(2026, 8, 30, 17, 0)));
        assert!(!is_market_open(DrawTime::parse("25:99"), pkt(2026, 8, 30, 17, 0)));
    }
}
