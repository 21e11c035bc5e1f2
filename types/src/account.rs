use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{read_string, string_encode_size, write_string, MAX_ID_LENGTH, MAX_NAME_LENGTH};

/// Normalized account identifier.
///
/// Identity is case-insensitive at the boundary; construction lower-cases the
/// raw string so all internal comparison is structural.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Write for AccountId {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.0, writer);
    }
}

impl Read for AccountId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        // Stored ids were normalized on construction; re-normalize anyway so a
        // hand-crafted buffer cannot smuggle in a case-sensitive key.
        Ok(Self::new(&read_string(reader, MAX_ID_LENGTH)?))
    }
}

impl EncodeSize for AccountId {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.0)
    }
}

/// Account kind tag, recorded on every ledger entry and used to dispatch the
/// insufficient-funds rule. A closed set; never an interpolated identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccountKind {
    Admin = 0,
    Dealer = 1,
    User = 2,
}

impl Write for AccountKind {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for AccountKind {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Admin),
            1 => Ok(Self::Dealer),
            2 => Ok(Self::User),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for AccountKind {
    const SIZE: usize = 1;
}

/// Prize multipliers per sub-game, applied per matching number per unit stake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrizeRates {
    pub one_digit_open: u64,
    pub one_digit_close: u64,
    pub two_digit: u64,
}

impl Write for PrizeRates {
    fn write(&self, writer: &mut impl BufMut) {
        self.one_digit_open.write(writer);
        self.one_digit_close.write(writer);
        self.two_digit.write(writer);
    }
}

impl Read for PrizeRates {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            one_digit_open: u64::read(reader)?,
            one_digit_close: u64::read(reader)?,
            two_digit: u64::read(reader)?,
        })
    }
}

impl FixedSize for PrizeRates {
    const SIZE: usize = u64::SIZE * 3;
}

/// Per-user stake ceilings. Zero means unlimited.
///
/// `one_digit` covers both the open and close buckets; `per_draw` caps the
/// user's aggregate stake across a single draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BetLimits {
    pub one_digit: u64,
    pub two_digit: u64,
    pub per_draw: u64,
}

impl BetLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }
}

impl Write for BetLimits {
    fn write(&self, writer: &mut impl BufMut) {
        self.one_digit.write(writer);
        self.two_digit.write(writer);
        self.per_draw.write(writer);
    }
}

impl Read for BetLimits {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            one_digit: u64::read(reader)?,
            two_digit: u64::read(reader)?,
            per_draw: u64::read(reader)?,
        })
    }
}

impl FixedSize for BetLimits {
    const SIZE: usize = u64::SIZE * 3;
}

/// Dealer capabilities: commission margin, prize rates, restrictable.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct DealerProfile {
    /// Commission rebate on stake routed through this dealer, in basis points.
    pub commission_bps: u32,
    pub prize_rates: PrizeRates,
    pub restricted: bool,
}

impl Write for DealerProfile {
    fn write(&self, writer: &mut impl BufMut) {
        self.commission_bps.write(writer);
        self.prize_rates.write(writer);
        self.restricted.write(writer);
    }
}

impl Read for DealerProfile {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            commission_bps: u32::read(reader)?,
            prize_rates: PrizeRates::read(reader)?,
            restricted: bool::read(reader)?,
        })
    }
}

impl EncodeSize for DealerProfile {
    fn encode_size(&self) -> usize {
        self.commission_bps.encode_size()
            + self.prize_rates.encode_size()
            + self.restricted.encode_size()
    }
}

/// User capabilities: parent dealer, commission, prize rates, bet limits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    /// The dealer this user belongs to. Exactly one per user.
    pub dealer: AccountId,
    /// Commission rebate on own stake, in basis points.
    pub commission_bps: u32,
    pub prize_rates: PrizeRates,
    pub bet_limits: BetLimits,
    pub restricted: bool,
}

impl Write for UserProfile {
    fn write(&self, writer: &mut impl BufMut) {
        self.dealer.write(writer);
        self.commission_bps.write(writer);
        self.prize_rates.write(writer);
        self.bet_limits.write(writer);
        self.restricted.write(writer);
    }
}

impl Read for UserProfile {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            dealer: AccountId::read(reader)?,
            commission_bps: u32::read(reader)?,
            prize_rates: PrizeRates::read(reader)?,
            bet_limits: BetLimits::read(reader)?,
            restricted: bool::read(reader)?,
        })
    }
}

impl EncodeSize for UserProfile {
    fn encode_size(&self) -> usize {
        self.dealer.encode_size()
            + self.commission_bps.encode_size()
            + self.prize_rates.encode_size()
            + self.bet_limits.encode_size()
            + self.restricted.encode_size()
    }
}

/// Role-specific account payload.
///
/// Exactly one Admin exists per deployment and acts as the liquidity
/// sink/source; it is exempt from the insufficient-funds check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Dealer(DealerProfile),
    User(UserProfile),
}

impl Role {
    pub fn kind(&self) -> AccountKind {
        match self {
            Role::Admin => AccountKind::Admin,
            Role::Dealer(_) => AccountKind::Dealer,
            Role::User(_) => AccountKind::User,
        }
    }
}

impl Write for Role {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Role::Admin => 0u8.write(writer),
            Role::Dealer(profile) => {
                1u8.write(writer);
                profile.write(writer);
            }
            Role::User(profile) => {
                2u8.write(writer);
                profile.write(writer);
            }
        }
    }
}

impl Read for Role {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Role::Admin),
            1 => Ok(Role::Dealer(DealerProfile::read(reader)?)),
            2 => Ok(Role::User(UserProfile::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Role {
    fn encode_size(&self) -> usize {
        1 + match self {
            Role::Admin => 0,
            Role::Dealer(profile) => profile.encode_size(),
            Role::User(profile) => profile.encode_size(),
        }
    }
}

/// A wallet-holding account.
///
/// `wallet` is a cached copy of the latest journal entry's running balance;
/// the ledger store keeps the two in lockstep within each transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Signed because the Admin account is the system's liquidity sink/source
    /// and may legitimately run below zero; every other kind stays >= 0 via
    /// the insufficient-funds rule.
    pub wallet: i64,
    pub role: Role,
}

impl Account {
    pub fn kind(&self) -> AccountKind {
        self.role.kind()
    }

    /// Whether this account is blocked from placing bets.
    pub fn restricted(&self) -> bool {
        match &self.role {
            Role::Admin => false,
            Role::Dealer(profile) => profile.restricted,
            Role::User(profile) => profile.restricted,
        }
    }
}

impl Write for Account {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        write_string(&self.name, writer);
        self.wallet.write(writer);
        self.role.write(writer);
    }
}

impl Read for Account {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: AccountId::read(reader)?,
            name: read_string(reader, MAX_NAME_LENGTH)?,
            wallet: i64::read(reader)?,
            role: Role::read(reader)?,
        })
    }
}

impl EncodeSize for Account {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + string_encode_size(&self.name)
            + self.wallet.encode_size()
            + self.role.encode_size()
    }
}
