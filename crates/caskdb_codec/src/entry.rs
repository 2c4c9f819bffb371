//! Log entry encoding.

use crate::error::{CodecError, CodecResult};
use crate::{Key, ENTRY_HEADER_SIZE};
use bytes::{Buf, BufMut};

/// A single key/value record inside a data segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// The entry key.
    pub key: Key,
    /// The raw value bytes.
    pub value: Vec<u8>,
}

impl LogEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(key: Key, value: Vec<u8>) -> Self {
        Self { key, value }
    }

    /// Returns the encoded size of this entry.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        ENTRY_HEADER_SIZE + self.value.len()
    }

    /// Appends the encoded entry to `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ValueTooLarge`] if the value length does not fit
    /// the 32-bit prefix. Nothing is written in that case.
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) -> CodecResult<()> {
        encode_entry(self.key, &self.value, buf)
    }

    /// Encodes the entry into a fresh buffer.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_size());
        self.encode_into(&mut buf)?;
        Ok(buf)
    }

    /// Decodes the entry starting at `offset` in `data`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if `data` ends before the entry does.
    pub fn decode_at(data: &[u8], offset: usize) -> CodecResult<Self> {
        let available = data.len().saturating_sub(offset);
        if available < ENTRY_HEADER_SIZE {
            return Err(CodecError::truncated(offset, ENTRY_HEADER_SIZE, available));
        }

        let mut cursor = &data[offset..];
        let value_len = cursor.get_u32() as usize;
        let key = cursor.get_i64();

        if cursor.remaining() < value_len {
            return Err(CodecError::truncated(
                offset,
                ENTRY_HEADER_SIZE + value_len,
                available,
            ));
        }

        Ok(Self {
            key,
            value: cursor[..value_len].to_vec(),
        })
    }
}

/// Encodes a key/value pair without building a [`LogEntry`] first.
///
/// # Errors
///
/// Returns [`CodecError::ValueTooLarge`] if the value length does not fit
/// the 32-bit prefix.
pub fn encode_entry<B: BufMut>(key: Key, value: &[u8], buf: &mut B) -> CodecResult<()> {
    let len = u32::try_from(value.len()).map_err(|_| CodecError::ValueTooLarge { len: value.len() })?;
    buf.put_u32(len);
    buf.put_i64(key);
    buf.put_slice(value);
    Ok(())
}

/// Iterates the entries of a segment buffer in file order.
///
/// Yields `(offset, entry)` pairs. A truncated trailing entry yields one
/// error and ends the iteration.
#[derive(Debug, Clone)]
pub struct LogEntryIter<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> LogEntryIter<'a> {
    /// Creates an iterator over `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            failed: false,
        }
    }

    /// Returns the offset of the next entry to be decoded.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for LogEntryIter<'_> {
    type Item = CodecResult<(usize, LogEntry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        let offset = self.offset;
        match LogEntry::decode_at(self.data, offset) {
            Ok(entry) => {
                self.offset += entry.encoded_size();
                Some(Ok((offset, entry)))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn layout_is_big_endian() {
        let bytes = LogEntry::new(1, b"ab".to_vec()).encode().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 1, b'a', b'b']);
    }

    #[test]
    fn negative_key() {
        let bytes = LogEntry::new(-1, Vec::new()).encode().unwrap();
        assert_eq!(&bytes[4..12], &[0xFF; 8]);

        let decoded = LogEntry::decode_at(&bytes, 0).unwrap();
        assert_eq!(decoded.key, -1);
        assert!(decoded.value.is_empty());
    }

    #[test]
    fn decode_at_offset() {
        let mut segment = Vec::new();
        LogEntry::new(1, b"first".to_vec())
            .encode_into(&mut segment)
            .unwrap();
        let second_offset = segment.len();
        LogEntry::new(2, b"second".to_vec())
            .encode_into(&mut segment)
            .unwrap();

        let entry = LogEntry::decode_at(&segment, second_offset).unwrap();
        assert_eq!(entry, LogEntry::new(2, b"second".to_vec()));
    }

    #[test]
    fn truncated_header() {
        let result = LogEntry::decode_at(&[0, 0, 0], 0);
        assert_eq!(result, Err(CodecError::truncated(0, 12, 3)));
    }

    #[test]
    fn truncated_value() {
        let mut bytes = LogEntry::new(9, b"hello".to_vec()).encode().unwrap();
        bytes.truncate(14);

        let result = LogEntry::decode_at(&bytes, 0);
        assert_eq!(result, Err(CodecError::truncated(0, 17, 14)));
    }

    #[test]
    fn offset_past_end() {
        let bytes = LogEntry::new(9, b"x".to_vec()).encode().unwrap();
        assert!(matches!(
            LogEntry::decode_at(&bytes, 100),
            Err(CodecError::Truncated { available: 0, .. })
        ));
    }

    #[test]
    fn iter_yields_offsets() {
        let mut segment = Vec::new();
        for (key, value) in [(1, "a"), (2, "bb"), (3, "ccc")] {
            LogEntry::new(key, value.as_bytes().to_vec())
                .encode_into(&mut segment)
                .unwrap();
        }

        let offsets: Vec<(usize, i64)> = LogEntryIter::new(&segment)
            .map(|r| r.map(|(off, e)| (off, e.key)).unwrap())
            .collect();
        assert_eq!(offsets, vec![(0, 1), (13, 2), (27, 3)]);
    }

    #[test]
    fn iter_stops_after_truncation() {
        let mut segment = LogEntry::new(1, b"ok".to_vec()).encode().unwrap();
        segment.extend_from_slice(&[0, 0, 0, 50, 1]);

        let mut iter = LogEntryIter::new(&segment);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }

    #[test]
    fn iter_empty() {
        assert_eq!(LogEntryIter::new(&[]).count(), 0);
    }

    proptest! {
        #[test]
        fn packed_entries_decode_in_order(
            entries in proptest::collection::vec(
                (any::<i64>(), proptest::collection::vec(any::<u8>(), 0..64)),
                0..32,
            )
        ) {
            let mut segment = Vec::new();
            for (key, value) in &entries {
                LogEntry::new(*key, value.clone()).encode_into(&mut segment).unwrap();
            }

            let decoded: Vec<(i64, Vec<u8>)> = LogEntryIter::new(&segment)
                .map(|r| r.map(|(_, e)| (e.key, e.value)).unwrap())
                .collect();
            prop_assert_eq!(decoded, entries);
        }
    }
}
