use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{read_string, string_encode_size, write_string, MAX_ID_LENGTH, MAX_NAME_LENGTH};

/// Normalized draw identifier (case-insensitive at the boundary).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawId(String);

impl DrawId {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Write for DrawId {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.0, writer);
    }
}

impl Read for DrawId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self::new(&read_string(reader, MAX_ID_LENGTH)?))
    }
}

impl EncodeSize for DrawId {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.0)
    }
}

/// Validated daily close time (24h HH:MM) in the trading timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawTime {
    pub hour: u8,
    pub minute: u8,
}

impl DrawTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self { hour, minute })
    }

    /// Parse strict "HH:MM". Anything else is `None`, which callers treat as
    /// a permanently closed market rather than an error.
    pub fn parse(raw: &str) -> Option<Self> {
        let (h, m) = raw.split_once(':')?;
        if h.len() != 2 || m.len() != 2 {
            return None;
        }
        Self::new(h.parse().ok()?, m.parse().ok()?)
    }
}

impl fmt::Display for DrawTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Write for DrawTime {
    fn write(&self, writer: &mut impl BufMut) {
        self.hour.write(writer);
        self.minute.write(writer);
    }
}

impl Read for DrawTime {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let hour = u8::read(reader)?;
        let minute = u8::read(reader)?;
        DrawTime::new(hour, minute).ok_or(Error::Invalid("DrawTime", "out of range"))
    }
}

impl FixedSize for DrawTime {
    const SIZE: usize = 2;
}

/// What a draw's winning number is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DrawKind {
    /// Two-digit result: an open digit plus a close digit.
    TwoDigit = 0,
    /// Single-digit result that settles one-digit-close bets directly.
    OneDigitClose = 1,
}

impl Write for DrawKind {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for DrawKind {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::TwoDigit),
            1 => Ok(Self::OneDigitClose),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for DrawKind {
    const SIZE: usize = 1;
}

/// Declared result halves. Each digit is 0..=9.
///
/// A two-digit draw with `close: None` is the "open digit known, close digit
/// pending" state the original system encoded with a trailing sentinel
/// character; here the pending half is simply absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawResult {
    pub open: Option<u8>,
    pub close: Option<u8>,
}

impl DrawResult {
    /// Whether the result is complete for a draw of `kind`.
    pub fn is_final(&self, kind: DrawKind) -> bool {
        match kind {
            DrawKind::TwoDigit => self.open.is_some() && self.close.is_some(),
            DrawKind::OneDigitClose => self.close.is_some(),
        }
    }

    /// Render the full winning number for exact-match settlement and display.
    /// `None` while any required half is pending.
    pub fn full_number(&self, kind: DrawKind) -> Option<String> {
        match kind {
            DrawKind::TwoDigit => Some(format!("{}{}", self.open?, self.close?)),
            DrawKind::OneDigitClose => Some(format!("{}", self.close?)),
        }
    }
}

impl Write for DrawResult {
    fn write(&self, writer: &mut impl BufMut) {
        self.open.write(writer);
        self.close.write(writer);
    }
}

impl Read for DrawResult {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let open = Option::<u8>::read(reader)?;
        let close = Option::<u8>::read(reader)?;
        for digit in [open, close].into_iter().flatten() {
            if digit > 9 {
                return Err(Error::Invalid("DrawResult", "digit out of range"));
            }
        }
        Ok(Self { open, close })
    }
}

impl EncodeSize for DrawResult {
    fn encode_size(&self) -> usize {
        self.open.encode_size() + self.close.encode_size()
    }
}

/// Explicit two-ended coupling relation between a two-digit primary draw and
/// the one-digit draw that supplies its close digit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coupling {
    /// This draw's close digit arrives via the named one-digit draw.
    ClosesVia(DrawId),
    /// This draw's declared digit doubles as the close digit of the named
    /// two-digit draw.
    CloseDigitFor(DrawId),
}

impl Write for Coupling {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Coupling::ClosesVia(id) => {
                0u8.write(writer);
                id.write(writer);
            }
            Coupling::CloseDigitFor(id) => {
                1u8.write(writer);
                id.write(writer);
            }
        }
    }
}

impl Read for Coupling {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Coupling::ClosesVia(DrawId::read(reader)?)),
            1 => Ok(Coupling::CloseDigitFor(DrawId::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Coupling {
    fn encode_size(&self) -> usize {
        1 + match self {
            Coupling::ClosesVia(id) => id.encode_size(),
            Coupling::CloseDigitFor(id) => id.encode_size(),
        }
    }
}

/// Lifecycle position of a draw within the current cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawStatus {
    AwaitingResult,
    Declared,
    Approved,
}

/// A scheduled daily market.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Draw {
    pub id: DrawId,
    pub name: String,
    pub kind: DrawKind,
    /// `None` when the configured close time was missing or malformed; such a
    /// market never opens.
    pub close_time: Option<DrawTime>,
    pub result: Option<DrawResult>,
    pub payouts_approved: bool,
    /// Display-only flag; carries no engine semantics.
    pub visible: bool,
    pub coupling: Option<Coupling>,
}

impl Draw {
    pub fn status(&self) -> DrawStatus {
        if self.payouts_approved {
            DrawStatus::Approved
        } else if self.result.is_some() {
            DrawStatus::Declared
        } else {
            DrawStatus::AwaitingResult
        }
    }

    /// Result usable for settlement, if complete.
    pub fn final_result(&self) -> Option<DrawResult> {
        self.result.filter(|r| r.is_final(self.kind))
    }
}

impl Write for Draw {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        write_string(&self.name, writer);
        self.kind.write(writer);
        self.close_time.write(writer);
        self.result.write(writer);
        self.payouts_approved.write(writer);
        self.visible.write(writer);
        self.coupling.write(writer);
    }
}

impl Read for Draw {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: DrawId::read(reader)?,
            name: read_string(reader, MAX_NAME_LENGTH)?,
            kind: DrawKind::read(reader)?,
            close_time: Option::<DrawTime>::read(reader)?,
            result: Option::<DrawResult>::read(reader)?,
            payouts_approved: bool::read(reader)?,
            visible: bool::read(reader)?,
            coupling: Option::<Coupling>::read(reader)?,
        })
    }
}

impl EncodeSize for Draw {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + string_encode_size(&self.name)
            + self.kind.encode_size()
            + self.close_time.encode_size()
            + self.result.encode_size()
            + self.payouts_approved.encode_size()
            + self.visible.encode_size()
            + self.coupling.encode_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{Decode, DecodeExt, Encode};

    #[test]
    fn draw_time_parses_strictly() {
        assert_eq!(DrawTime::parse("21:10"), DrawTime::new(21, 10));
        assert_eq!(DrawTime::parse("00:55"), DrawTime::new(0, 55));
        assert_eq!(DrawTime::parse("24:00"), None);
        assert_eq!(DrawTime::parse("9:30"), None);
        assert_eq!(DrawTime::parse("09:3"), None);
        assert_eq!(DrawTime::parse(""), None);
        assert_eq!(DrawTime::parse("nine"), None);
    }

    #[test]
    fn result_finality_by_kind() {
        let pending = DrawResult {
            open: Some(4),
            close: None,
        };
        assert!(!pending.is_final(DrawKind::TwoDigit));
        assert_eq!(pending.full_number(DrawKind::TwoDigit), None);

        let full = DrawResult {
            open: Some(4),
            close: Some(7),
        };
        assert!(full.is_final(DrawKind::TwoDigit));
        assert_eq!(full.full_number(DrawKind::TwoDigit).as_deref(), Some("47"));

        let close_only = DrawResult {
            open: None,
            close: Some(7),
        };
        assert!(close_only.is_final(DrawKind::OneDigitClose));
        assert_eq!(
            close_only.full_number(DrawKind::OneDigitClose).as_deref(),
            Some("7")
        );
    }

    #[test]
    fn draw_round_trips() {
        let draw = Draw {
            id: DrawId::new("AK"),
            name: "AK".into(),
            kind: DrawKind::TwoDigit,
            close_time: DrawTime::parse("21:10"),
            result: Some(DrawResult {
                open: Some(1),
                close: None,
            }),
            payouts_approved: false,
            visible: true,
            coupling: Some(Coupling::ClosesVia(DrawId::new("akc"))),
        };
        let decoded = Draw::decode(draw.encode()).unwrap();
        assert_eq!(decoded, draw);
        assert_eq!(decoded.status(), DrawStatus::Declared);
        assert_eq!(decoded.final_result(), None);
    }
}
