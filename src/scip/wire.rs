//! Minimal protobuf wire reader for the symbol-index artifact.
//!
//! Decodes the length-delimited, varint-tagged format without a schema
//! compiler. Every read is bounds-checked and returns `Option`: a truncated
//! or corrupted buffer yields `None` at the failing read, never a panic, so
//! a bad record is data rather than a fault.

pub const WIRE_VARINT: u32 = 0;
pub const WIRE_FIXED64: u32 = 1;
pub const WIRE_LEN: u32 = 2;
pub const WIRE_FIXED32: u32 = 5;

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn read_varint(&mut self) -> Option<u64> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = *self.buf.get(self.pos)?;
            self.pos += 1;
            if shift >= 64 {
                return None;
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Some(value);
            }
            shift += 7;
        }
    }

    /// Read a field tag: (field number, wire type).
    pub fn read_tag(&mut self) -> Option<(u32, u32)> {
        let raw = self.read_varint()?;
        let field = (raw >> 3) as u32;
        let wire = (raw & 0x7) as u32;
        if field == 0 {
            return None;
        }
        Some((field, wire))
    }

    /// Read a length-delimited payload, checking `start <= end <= len`.
    pub fn read_len_delimited(&mut self) -> Option<&'a [u8]> {
        let len = self.read_varint()? as usize;
        let start = self.pos;
        let end = start.checked_add(len)?;
        if end > self.buf.len() {
            return None;
        }
        self.pos = end;
        Some(&self.buf[start..end])
    }

    pub fn read_string(&mut self) -> Option<&'a str> {
        let bytes = self.read_len_delimited()?;
        std::str::from_utf8(bytes).ok()
    }

    /// Skip over a field value of the given wire type.
    pub fn skip(&mut self, wire: u32) -> Option<()> {
        match wire {
            WIRE_VARINT => {
                self.read_varint()?;
            }
            WIRE_FIXED64 => {
                let end = self.pos.checked_add(8)?;
                if end > self.buf.len() {
                    return None;
                }
                self.pos = end;
            }
            WIRE_LEN => {
                self.read_len_delimited()?;
            }
            WIRE_FIXED32 => {
                let end = self.pos.checked_add(4)?;
                if end > self.buf.len() {
                    return None;
                }
                self.pos = end;
            }
            _ => return None,
        }
        Some(())
    }
}

/// Decode a packed varint payload into at most `max` values.
pub fn decode_packed_varints(buf: &[u8], max: usize) -> Vec<u64> {
    let mut reader = Reader::new(buf);
    let mut out = Vec::new();
    while !reader.is_empty() && out.len() < max {
        match reader.read_varint() {
            Some(value) => out.push(value),
            None => break,
        }
    }
    out
}
