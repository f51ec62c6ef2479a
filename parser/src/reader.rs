use gimli::{Endianity, RunTimeEndian};

use crate::{Error, Result};

/// A bounds-checked reader over a section buffer.
///
/// Offsets are always relative to the start of the section, so error
/// messages and DIE offsets can be reported without further adjustment.
#[derive(Debug, Clone)]
pub struct ByteCursor<'input> {
    data: &'input [u8],
    position: usize,
    end: usize,
    endian: RunTimeEndian,
}

impl<'input> ByteCursor<'input> {
    /// A cursor over all of `data`.
    pub fn new(data: &'input [u8], endian: RunTimeEndian) -> Self {
        ByteCursor {
            data,
            position: 0,
            end: data.len(),
            endian,
        }
    }

    /// A cursor over `data[start..end]`.
    ///
    /// `end` is clamped to the buffer length, so reads past the real end
    /// of the section still fail with `TruncatedInput`.
    pub fn with_range(data: &'input [u8], start: usize, end: usize, endian: RunTimeEndian) -> Self {
        let end = end.min(data.len());
        ByteCursor {
            data,
            position: start.min(end),
            end,
            endian,
        }
    }

    #[inline]
    pub fn endian(&self) -> RunTimeEndian {
        self.endian
    }

    /// The current section offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.position
    }

    /// The section offset where this cursor stops.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.end - self.position
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.position >= self.end
    }

    /// Move to an absolute section offset.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.end {
            return Err(Error::TruncatedInput {
                offset: self.position,
                wanted: offset - self.position,
            });
        }
        self.position = offset;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'input [u8]> {
        if len > self.remaining() {
            return Err(Error::TruncatedInput {
                offset: self.position,
                wanted: len,
            });
        }
        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|bytes| bytes[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|value| value as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let endian = self.endian;
        self.read_bytes(2).map(|bytes| endian.read_u16(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let endian = self.endian;
        self.read_bytes(4).map(|bytes| endian.read_u32(bytes))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let endian = self.endian;
        self.read_bytes(8).map(|bytes| endian.read_u64(bytes))
    }

    /// Read a target address of the given size.
    pub fn read_address(&mut self, size: u8) -> Result<u64> {
        match size {
            1 => self.read_u8().map(u64::from),
            2 => self.read_u16().map(u64::from),
            4 => self.read_u32().map(u64::from),
            8 => self.read_u64(),
            _ => Err(Error::InvalidAddressSize(size)),
        }
    }

    /// Read a null-terminated string, returning the bytes without the terminator.
    pub fn read_cstring(&mut self) -> Result<&'input [u8]> {
        let rest = &self.data[self.position..self.end];
        match rest.iter().position(|&b| b == 0) {
            Some(len) => {
                self.position += len + 1;
                Ok(&rest[..len])
            }
            None => Err(Error::TruncatedInput {
                offset: self.position,
                wanted: rest.len() + 1,
            }),
        }
    }

    /// Read an unsigned LEB128 value.
    ///
    /// Bits beyond the 64th are discarded.
    pub fn read_uleb128(&mut self) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift < 64 {
                result |= u64::from(byte & 0x7f) << shift;
            }
            shift += 7;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
    }

    /// Read a signed LEB128 value.
    pub fn read_sleb128(&mut self) -> Result<i64> {
        let mut result = 0i64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift < 64 {
                result |= i64::from(byte & 0x7f) << shift;
            }
            shift += 7;
            if byte & 0x80 == 0 {
                if shift < 64 && byte & 0x40 != 0 {
                    result |= !0 << shift;
                }
                return Ok(result);
            }
        }
    }
}
