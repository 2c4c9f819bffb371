//! Hint entry encoding.

use crate::error::{CodecError, CodecResult};
use crate::{Key, HINT_ENTRY_SIZE};
use bytes::{Buf, BufMut};

/// Location of a key's entry within the data segment sharing the hint file's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintEntry {
    /// The entry key.
    pub key: Key,
    /// Byte offset of the key's log entry within its segment.
    pub offset: u32,
}

impl HintEntry {
    /// Creates a new hint entry.
    #[must_use]
    pub const fn new(key: Key, offset: u32) -> Self {
        Self { key, offset }
    }

    /// Appends the encoded hint to `buf`.
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_i64(self.key);
        buf.put_u32(self.offset);
    }
}

/// Encodes a sequence of hints into a hint file buffer.
pub fn encode_hints<'a, I>(hints: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a HintEntry>,
{
    let iter = hints.into_iter();
    let mut buf = Vec::with_capacity(iter.size_hint().0 * HINT_ENTRY_SIZE);
    for hint in iter {
        hint.encode_into(&mut buf);
    }
    buf
}

/// Decodes a whole hint file buffer.
///
/// # Errors
///
/// Returns [`CodecError::MisalignedHints`] if the buffer holds a partial
/// trailing entry; a partially written hint file is never half-trusted.
pub fn decode_hints(data: &[u8]) -> CodecResult<Vec<HintEntry>> {
    if data.len() % HINT_ENTRY_SIZE != 0 {
        return Err(CodecError::MisalignedHints { len: data.len() });
    }

    let mut cursor = data;
    let mut hints = Vec::with_capacity(data.len() / HINT_ENTRY_SIZE);
    while cursor.has_remaining() {
        let key = cursor.get_i64();
        let offset = cursor.get_u32();
        hints.push(HintEntry { key, offset });
    }
    Ok(hints)
}
