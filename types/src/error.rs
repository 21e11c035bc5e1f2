use thiserror::Error;

/// Business-rule failures surfaced to callers.
///
/// All variants are expected outcomes, not crashes: an operation that returns
/// one has written nothing. `Storage` carries unexpected faults from the
/// backing store; those are fatal to the triggering request only.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("insufficient funds: debit {debit} exceeds balance {balance}")]
    InsufficientFunds { debit: u64, balance: u64 },

    #[error("account {0} is restricted from betting")]
    AccountRestricted(String),

    #[error("market {0} is closed")]
    MarketClosed(String),

    #[error("market {0} does not exist")]
    MarketUnavailable(String),

    #[error("stake limit reached for number {number}: {current} staked, limit {limit}")]
    MarketCapacityExceeded {
        number: String,
        current: u64,
        limit: u64,
    },

    #[error("personal stake limit reached for number {number}: limit {limit}")]
    PersonalCapExceeded { number: String, limit: u64 },

    #[error("per-draw stake limit reached: {attempted} against limit {limit}")]
    PerDrawCapExceeded { attempted: u64, limit: u64 },

    #[error("insufficient balance: request {requested} exceeds wallet {wallet}")]
    InsufficientBalance { requested: u64, wallet: u64 },

    #[error("draw {0} already has a declared result")]
    AlreadyDeclared(String),

    #[error("draw {0} has no result or is already approved")]
    NoResultOrAlreadyApproved(String),

    #[error("draw {0} is not ready for payout approval")]
    PayoutConditionsNotMet(String),

    #[error("account {0} does not exist")]
    UnknownAccount(String),

    #[error("account {0} already exists")]
    DuplicateAccount(String),

    #[error("malformed number {0:?}")]
    MalformedNumber(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
