use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};

use super::{read_string, string_encode_size, write_string, StakeBucket, MAX_NUMBER_LENGTH};

/// Global ceiling on cumulative stake for one number within one exposure
/// bucket, across all bettors for the current cycle. Unique per
/// `(bucket, number)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberLimit {
    pub bucket: StakeBucket,
    pub number: String,
    pub limit: u64,
}

impl Write for NumberLimit {
    fn write(&self, writer: &mut impl BufMut) {
        self.bucket.write(writer);
        write_string(&self.number, writer);
        self.limit.write(writer);
    }
}

impl Read for NumberLimit {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            bucket: StakeBucket::read(reader)?,
            number: read_string(reader, MAX_NUMBER_LENGTH)?,
            limit: u64::read(reader)?,
        })
    }
}

impl EncodeSize for NumberLimit {
    fn encode_size(&self) -> usize {
        self.bucket.encode_size() + string_encode_size(&self.number) + self.limit.encode_size()
    }
}
