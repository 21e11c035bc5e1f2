use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

use super::{
    read_string, string_encode_size, write_string, AccountId, DrawId, MAX_NUMBERS_PER_GROUP,
    MAX_NUMBER_LENGTH,
};

/// Betting mode for a group of numbers.
///
/// Bulk tickets are a client-side composition convenience and arrive already
/// resolved into these modes; the engine never sees them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SubGame {
    OneDigitOpen = 0,
    OneDigitClose = 1,
    TwoDigit = 2,
    /// Two-digit permutations composed client-side; settles and counts toward
    /// exposure exactly like `TwoDigit`.
    Combo = 3,
}

impl SubGame {
    /// Exposure bucket this mode's stake accumulates in.
    pub fn bucket(&self) -> StakeBucket {
        match self {
            SubGame::OneDigitOpen => StakeBucket::OneDigitOpen,
            SubGame::OneDigitClose => StakeBucket::OneDigitClose,
            SubGame::TwoDigit | SubGame::Combo => StakeBucket::TwoDigit,
        }
    }
}

impl Write for SubGame {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for SubGame {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::OneDigitOpen),
            1 => Ok(Self::OneDigitClose),
            2 => Ok(Self::TwoDigit),
            3 => Ok(Self::Combo),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for SubGame {
    const SIZE: usize = 1;
}

/// Stake-exposure bucket for limit accounting.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum StakeBucket {
    OneDigitOpen = 0,
    OneDigitClose = 1,
    TwoDigit = 2,
}

impl StakeBucket {
    pub fn is_one_digit(&self) -> bool {
        matches!(self, StakeBucket::OneDigitOpen | StakeBucket::OneDigitClose)
    }
}

impl Write for StakeBucket {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for StakeBucket {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::OneDigitOpen),
            1 => Ok(Self::OneDigitClose),
            2 => Ok(Self::TwoDigit),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for StakeBucket {
    const SIZE: usize = 1;
}

/// One proposed group of numbers at a common stake, as submitted for
/// admission. Ordered, duplicates allowed (each occurrence stakes again).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetGroup {
    pub sub_game: SubGame,
    pub numbers: Vec<String>,
    pub amount_per_number: u64,
}

impl BetGroup {
    pub fn total(&self) -> u64 {
        (self.numbers.len() as u64).saturating_mul(self.amount_per_number)
    }
}

/// An admitted bet. Immutable once created; deleted only by the cycle reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bet {
    pub id: u64,
    pub user: AccountId,
    pub dealer: AccountId,
    pub draw: DrawId,
    pub sub_game: SubGame,
    pub numbers: Vec<String>,
    pub amount_per_number: u64,
    pub total_amount: u64,
    pub ts: u64,
}

impl Write for Bet {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.user.write(writer);
        self.dealer.write(writer);
        self.draw.write(writer);
        self.sub_game.write(writer);
        (self.numbers.len() as u32).write(writer);
        for number in &self.numbers {
            write_string(number, writer);
        }
        self.amount_per_number.write(writer);
        self.total_amount.write(writer);
        self.ts.write(writer);
    }
}

impl Read for Bet {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let id = u64::read(reader)?;
        let user = AccountId::read(reader)?;
        let dealer = AccountId::read(reader)?;
        let draw = DrawId::read(reader)?;
        let sub_game = SubGame::read(reader)?;
        let count = u32::read(reader)? as usize;
        if count > MAX_NUMBERS_PER_GROUP {
            return Err(Error::Invalid("Bet", "too many numbers"));
        }
        let mut numbers = Vec::with_capacity(count);
        for _ in 0..count {
            numbers.push(read_string(reader, MAX_NUMBER_LENGTH)?);
        }
        Ok(Self {
            id,
            user,
            dealer,
            draw,
            sub_game,
            numbers,
            amount_per_number: u64::read(reader)?,
            total_amount: u64::read(reader)?,
            ts: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Bet {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + self.user.encode_size()
            + self.dealer.encode_size()
            + self.draw.encode_size()
            + self.sub_game.encode_size()
            + 4
            + self
                .numbers
                .iter()
                .map(|n| string_encode_size(n))
                .sum::<usize>()
            + self.amount_per_number.encode_size()
            + self.total_amount.encode_size()
            + self.ts.encode_size()
    }
}
