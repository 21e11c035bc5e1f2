use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};

use super::{
    read_string, string_encode_size, write_string, AccountId, AccountKind,
    MAX_DESCRIPTION_LENGTH, MAX_JOURNAL_ENTRIES,
};

/// One immutable posting in an account's journal.
///
/// `balance` snapshots the running balance after the entry, so point-in-time
/// wallet state is readable without replaying history. The invariant
/// `balance[n] = balance[n-1] - debit[n] + credit[n]` is checkable at any
/// prefix via [`Journal::replay_consistent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Position within the account's journal, starting at 1.
    pub seq: u64,
    pub account: AccountId,
    pub kind: AccountKind,
    pub ts: u64,
    pub description: String,
    pub debit: u64,
    pub credit: u64,
    /// Running balance after this entry. Signed: the Admin journal may dip
    /// below zero while it funds prizes and commissions.
    pub balance: i64,
}

impl Write for LedgerEntry {
    fn write(&self, writer: &mut impl BufMut) {
        self.seq.write(writer);
        self.account.write(writer);
        self.kind.write(writer);
        self.ts.write(writer);
        write_string(&self.description, writer);
        self.debit.write(writer);
        self.credit.write(writer);
        self.balance.write(writer);
    }
}

impl Read for LedgerEntry {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            seq: u64::read(reader)?,
            account: AccountId::read(reader)?,
            kind: AccountKind::read(reader)?,
            ts: u64::read(reader)?,
            description: read_string(reader, MAX_DESCRIPTION_LENGTH)?,
            debit: u64::read(reader)?,
            credit: u64::read(reader)?,
            balance: i64::read(reader)?,
        })
    }
}

impl EncodeSize for LedgerEntry {
    fn encode_size(&self) -> usize {
        self.seq.encode_size()
            + self.account.encode_size()
            + self.kind.encode_size()
            + self.ts.encode_size()
            + string_encode_size(&self.description)
            + self.debit.encode_size()
            + self.credit.encode_size()
            + self.balance.encode_size()
    }
}

/// Append-only per-account transaction log. Entries are ordered by posting
/// time; the last entry's balance is the account's current wallet value.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Journal {
    pub entries: Vec<LedgerEntry>,
}

impl Journal {
    /// Current balance: the latest snapshot, or 0 for an empty journal.
    pub fn balance(&self) -> i64 {
        self.entries.last().map(|entry| entry.balance).unwrap_or(0)
    }

    /// Replay every debit/credit from zero and confirm each stored snapshot.
    pub fn replay_consistent(&self) -> bool {
        let mut running: i64 = 0;
        for entry in &self.entries {
            let Some(after_debit) = running.checked_sub_unsigned(entry.debit) else {
                return false;
            };
            let Some(next) = after_debit.checked_add_unsigned(entry.credit) else {
                return false;
            };
            if next != entry.balance {
                return false;
            }
            running = next;
        }
        true
    }
}

impl Write for Journal {
    fn write(&self, writer: &mut impl BufMut) {
        self.entries.write(writer);
    }
}

impl Read for Journal {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            entries: Vec::<LedgerEntry>::read_range(reader, 0..=MAX_JOURNAL_ENTRIES)?,
        })
    }
}

impl EncodeSize for Journal {
    fn encode_size(&self) -> usize {
        self.entries.encode_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{Decode, DecodeExt, Encode};
    use proptest::prelude::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn entry(seq: u64, debit: u64, credit: u64, balance: i64) -> LedgerEntry {
        LedgerEntry {
            seq,
            account: AccountId::new("u1"),
            kind: AccountKind::User,
            ts: 1_756_500_000 + seq,
            description: format!("posting {seq}"),
            debit,
            credit,
            balance,
        }
    }

    #[test]
    fn empty_journal_balance_is_zero() {
        assert_eq!(Journal::default().balance(), 0);
        assert!(Journal::default().replay_consistent());
    }

    #[test]
    fn replay_detects_tampering() {
        let good = Journal {
            entries: vec![entry(1, 0, 1_000, 1_000), entry(2, 200, 0, 800)],
        };
        assert!(good.replay_consistent());
        assert_eq!(good.balance(), 800);

        let tampered = Journal {
            entries: vec![entry(1, 0, 1_000, 1_000), entry(2, 200, 0, 900)],
        };
        assert!(!tampered.replay_consistent());
    }

    #[test]
    fn journal_round_trips() {
        let journal = Journal {
            entries: vec![entry(1, 0, 500, 500), entry(2, 100, 25, 425)],
        };
        let decoded = Journal::decode(journal.encode()).unwrap();
        assert_eq!(decoded, journal);
    }

    #[test]
    fn seeded_journal_round_trips() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut running: i64 = 0;
        let mut entries = Vec::new();
        for seq in 1..=200u64 {
            let credit = rng.gen_range(0..10_000u64);
            let debit = rng.gen_range(0..10_000u64).min(running.max(0) as u64);
            running = running - debit as i64 + credit as i64;
            entries.push(entry(seq, debit, credit, running));
        }
        let journal = Journal { entries };
        assert!(journal.replay_consistent());
        let decoded = Journal::decode(journal.encode()).unwrap();
        assert_eq!(decoded, journal);
        assert_eq!(decoded.balance(), running);
    }

    proptest! {
        // Any sequence of postings built by the ledger rule replays to its own
        // snapshots, prefix by prefix.
        #[test]
        fn replays_reproduce_snapshots(moves in proptest::collection::vec((0u64..5_000, 0u64..5_000), 0..64)) {
            let mut running: i64 = 0;
            let mut entries = Vec::new();
            for (i, (debit, credit)) in moves.into_iter().enumerate() {
                // Clamp the debit the way the engine does for non-admin
                // accounts: never below zero.
                let debit = debit.min(running.max(0) as u64);
                running = running - debit as i64 + credit as i64;
                entries.push(entry(i as u64 + 1, debit, credit, running));
            }
            for prefix in 0..=entries.len() {
                let journal = Journal { entries: entries[..prefix].to_vec() };
                prop_assert!(journal.replay_consistent());
                prop_assert_eq!(journal.balance(), entries.get(prefix.wrapping_sub(1)).map(|e| e.balance).unwrap_or(0));
            }
        }
    }
}
