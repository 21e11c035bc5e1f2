use serde::{Deserialize, Serialize};

use super::{AccountId, AccountKind, DrawKind, DrawResult, StakeBucket};

/// Wallet display row for an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletView {
    pub account: AccountId,
    pub kind: AccountKind,
    pub balance: i64,
}

/// Cumulative stake on one number within one exposure bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberStake {
    pub bucket: StakeBucket,
    pub number: String,
    pub total: u64,
}

/// Per-number stake totals for display, sorted by bucket then number.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StakeSummary {
    pub totals: Vec<NumberStake>,
}

/// Render a result the way operators expect to read it: the close-pending
/// half of a two-digit draw shows as a trailing `*`.
pub fn display_result(kind: DrawKind, result: &DrawResult) -> String {
    match kind {
        DrawKind::TwoDigit => match (result.open, result.close) {
            (Some(open), Some(close)) => format!("{open}{close}"),
            (Some(open), None) => format!("{open}*"),
            _ => "-".into(),
        },
        DrawKind::OneDigitClose => match result.close {
            Some(close) => format!("{close}"),
            None => "-".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_pending_close_with_star() {
        let pending = DrawResult {
            open: Some(4),
            close: None,
        };
        assert_eq!(display_result(DrawKind::TwoDigit, &pending), "4*");
        let full = DrawResult {
            open: Some(4),
            close: Some(7),
        };
        assert_eq!(display_result(DrawKind::TwoDigit, &full), "47");
        let close = DrawResult {
            open: None,
            close: Some(9),
        };
        assert_eq!(display_result(DrawKind::OneDigitClose, &close), "9");
    }

    #[test]
    fn summary_serializes_for_the_display_surface() {
        let summary = StakeSummary {
            totals: vec![NumberStake {
                bucket: StakeBucket::TwoDigit,
                number: "14".into(),
                total: 150,
            }],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totals"][0]["number"], "14");
        assert_eq!(json["totals"][0]["total"], 150);
    }
}
