use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};

use super::{
    read_string, string_encode_size, write_string, Account, AccountId, Bet, Draw, DrawId, Journal,
    NumberLimit, StakeBucket, MAX_BETS_PER_DRAW, MAX_DRAWS, MAX_NUMBER_LENGTH,
};

/// Persisted-state key space.
///
/// One entry per account row, one journal per account, draws by id plus a
/// directory for cycle-wide sweeps, bet rows indexed by draw, number limits
/// keyed by (bucket, number), and the monotonic bet-id counter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Account(AccountId),
    Journal(AccountId),
    AdminId,
    Draw(DrawId),
    DrawDirectory,
    Bets(DrawId),
    NumberLimit(StakeBucket, String),
    BetSequence,
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Key::Account(id) => {
                0u8.write(writer);
                id.write(writer);
            }
            Key::Journal(id) => {
                1u8.write(writer);
                id.write(writer);
            }
            Key::AdminId => 2u8.write(writer),
            Key::Draw(id) => {
                3u8.write(writer);
                id.write(writer);
            }
            Key::DrawDirectory => 4u8.write(writer),
            Key::Bets(id) => {
                5u8.write(writer);
                id.write(writer);
            }
            Key::NumberLimit(bucket, number) => {
                6u8.write(writer);
                bucket.write(writer);
                write_string(number, writer);
            }
            Key::BetSequence => 7u8.write(writer),
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Key::Account(AccountId::read(reader)?)),
            1 => Ok(Key::Journal(AccountId::read(reader)?)),
            2 => Ok(Key::AdminId),
            3 => Ok(Key::Draw(DrawId::read(reader)?)),
            4 => Ok(Key::DrawDirectory),
            5 => Ok(Key::Bets(DrawId::read(reader)?)),
            6 => Ok(Key::NumberLimit(
                StakeBucket::read(reader)?,
                read_string(reader, MAX_NUMBER_LENGTH)?,
            )),
            7 => Ok(Key::BetSequence),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        1 + match self {
            Key::Account(id) | Key::Journal(id) => id.encode_size(),
            Key::AdminId | Key::DrawDirectory | Key::BetSequence => 0,
            Key::Draw(id) | Key::Bets(id) => id.encode_size(),
            Key::NumberLimit(bucket, number) => {
                bucket.encode_size() + string_encode_size(number)
            }
        }
    }
}

/// Persisted-state values, one variant per key family.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Value {
    Account(Account),
    Journal(Journal),
    Id(AccountId),
    Draw(Draw),
    DrawDirectory(Vec<DrawId>),
    Bets(Vec<Bet>),
    NumberLimit(NumberLimit),
    Sequence(u64),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Value::Account(account) => {
                0u8.write(writer);
                account.write(writer);
            }
            Value::Journal(journal) => {
                1u8.write(writer);
                journal.write(writer);
            }
            Value::Id(id) => {
                2u8.write(writer);
                id.write(writer);
            }
            Value::Draw(draw) => {
                3u8.write(writer);
                draw.write(writer);
            }
            Value::DrawDirectory(draws) => {
                4u8.write(writer);
                draws.write(writer);
            }
            Value::Bets(bets) => {
                5u8.write(writer);
                bets.write(writer);
            }
            Value::NumberLimit(limit) => {
                6u8.write(writer);
                limit.write(writer);
            }
            Value::Sequence(seq) => {
                7u8.write(writer);
                seq.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Value::Account(Account::read(reader)?)),
            1 => Ok(Value::Journal(Journal::read(reader)?)),
            2 => Ok(Value::Id(AccountId::read(reader)?)),
            3 => Ok(Value::Draw(Draw::read(reader)?)),
            4 => Ok(Value::DrawDirectory(Vec::<DrawId>::read_range(
                reader,
                0..=MAX_DRAWS,
            )?)),
            5 => Ok(Value::Bets(Vec::<Bet>::read_range(
                reader,
                0..=MAX_BETS_PER_DRAW,
            )?)),
            6 => Ok(Value::NumberLimit(NumberLimit::read(reader)?)),
            7 => Ok(Value::Sequence(u64::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        1 + match self {
            Value::Account(account) => account.encode_size(),
            Value::Journal(journal) => journal.encode_size(),
            Value::Id(id) => id.encode_size(),
            Value::Draw(draw) => draw.encode_size(),
            Value::DrawDirectory(draws) => draws.encode_size(),
            Value::Bets(bets) => bets.encode_size(),
            Value::NumberLimit(limit) => limit.encode_size(),
            Value::Sequence(seq) => seq.encode_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{Decode, DecodeExt, Encode};

    #[test]
    fn keys_round_trip() {
        let keys = [
            Key::Account(AccountId::new("a1")),
            Key::Journal(AccountId::new("a1")),
            Key::AdminId,
            Key::Draw(DrawId::new("ak")),
            Key::DrawDirectory,
            Key::Bets(DrawId::new("gd")),
            Key::NumberLimit(StakeBucket::TwoDigit, "14".into()),
            Key::BetSequence,
        ];
        for key in keys {
            let decoded = Key::decode(key.encode()).unwrap();
            assert_eq!(decoded, key);
        }
    }

    #[test]
    fn values_round_trip() {
        let values = [
            Value::Id(AccountId::new("root")),
            Value::DrawDirectory(vec![DrawId::new("ak"), DrawId::new("akc")]),
            Value::NumberLimit(NumberLimit {
                bucket: StakeBucket::OneDigitClose,
                number: "7".into(),
                limit: 10_000,
            }),
            Value::Sequence(42),
        ];
        for value in values {
            let decoded = Value::decode(value.encode()).unwrap();
            assert_eq!(decoded, value);
        }
    }
}
