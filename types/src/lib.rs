//! Domain types for the kismat ledger & settlement engine.
//!
//! Defines accounts, the append-only wallet journal, draws and their results,
//! bets, stake limits, the persisted key/value layout, and the business-error
//! taxonomy shared by the engine and its callers.

mod account;
mod api;
mod bet;
mod codec;
mod constants;
mod draw;
mod error;
mod ledger;
mod limits;
mod state;

pub use account::{Account, AccountId, AccountKind, BetLimits, DealerProfile, PrizeRates, Role, UserProfile};
pub use api::{display_result, NumberStake, StakeSummary, WalletView};
pub use bet::{Bet, BetGroup, StakeBucket, SubGame};
pub use codec::{read_string, string_encode_size, write_string};
pub use constants::*;
pub use draw::{Coupling, Draw, DrawId, DrawKind, DrawResult, DrawStatus, DrawTime};
pub use error::EngineError;
pub use ledger::{Journal, LedgerEntry};
pub use limits::NumberLimit;
pub use state::{Key, Value};
