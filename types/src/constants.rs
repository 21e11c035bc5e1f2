/// Offset of the fixed trading timezone (PKT, UTC+5, no DST) in seconds.
pub const TRADING_ZONE_OFFSET_SECS: i32 = 5 * 60 * 60;

/// Local hour at which the daily trading cycle opens.
pub const CYCLE_OPEN_HOUR: u32 = 16;

/// Commission rates are expressed in basis points of stake.
pub const COMMISSION_SCALE: u64 = 10_000;

/// Maximum length for account and draw identifiers.
pub const MAX_ID_LENGTH: usize = 64;

/// Maximum length for account and draw display names.
pub const MAX_NAME_LENGTH: usize = 64;

/// Maximum length for a ledger entry description.
pub const MAX_DESCRIPTION_LENGTH: usize = 256;

/// Maximum length for a picked number string.
pub const MAX_NUMBER_LENGTH: usize = 2;

/// Maximum numbers accepted in a single bet group.
pub const MAX_NUMBERS_PER_GROUP: usize = 256;

/// Maximum ledger entries decoded for one account.
pub const MAX_JOURNAL_ENTRIES: usize = 1 << 20;

/// Maximum bet rows decoded for one draw.
pub const MAX_BETS_PER_DRAW: usize = 1 << 20;

/// Maximum draws decoded from the draw directory.
pub const MAX_DRAWS: usize = 1 << 10;
