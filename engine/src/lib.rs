//! Kismat ledger & settlement engine.
//!
//! This crate contains the transactional core of the operation: the wallet
//! ledger, bet admission under layered stake-exposure limits, the draw
//! lifecycle state machine, and payout settlement.
//!
//! ## Atomicity
//! Every operation runs against a [`State`] through a [`Txn`] overlay:
//! reads see buffered writes, and the buffer is applied to the backing state
//! only when the whole operation succeeds. A failed operation leaves no
//! partial effect, business failure or storage fault alike.
//!
//! ## Determinism requirements
//! - No wall-clock reads inside operations; callers pass `now` (unix
//!   seconds) and the clock resolver anchors all market-window math to the
//!   fixed trading timezone, never the host locale.
//! - Identifiers are normalized at the boundary and compared structurally.
//!
//! ## Concurrency
//! Operations take `&mut S` and are short, bounded read-modify-write units:
//! the exclusive borrow is the single-writer serialization the limit and
//! settlement checks rely on. Display reads ([`stake_summary`],
//! [`balance`], [`wallet_view`]) borrow shared and may be served from any
//! consistent snapshot.

pub mod accounts;
pub mod admission;
pub mod clock;
pub mod ledger;
pub mod limits;
pub mod settlement;

mod state;
mod txn;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use accounts::{
    create_account, delete_user, set_restricted, update_rates, NewAccount, UpdateRates,
};
pub use admission::place_bets;
pub use clock::{is_market_open, market_window};
pub use ledger::{balance, post, top_up, wallet_view, withdraw};
pub use limits::{clear_number_limit, set_number_limit, stake_summary};
pub use settlement::{
    approve_payouts, couple_draws, declare_winner, register_draw, reset_cycle, set_visibility,
    update_winning_number,
};
pub use state::{State, Status};
pub use txn::Txn;

#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
