#![allow(dead_code)]

use gimli::leb128;

/// A little-endian byte buffer for hand-assembled sections.
#[derive(Debug, Default, Clone)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Bytes::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.0.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.0.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn uleb(&mut self, value: u64) -> &mut Self {
        leb128::write::unsigned(&mut self.0, value).unwrap();
        self
    }

    pub fn sleb(&mut self, value: i64) -> &mut Self {
        leb128::write::signed(&mut self.0, value).unwrap();
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.0.extend_from_slice(value.as_bytes());
        self.0.push(0);
        self
    }

    pub fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.0.extend_from_slice(value);
        self
    }

    /// Write a `DW_FORM_block1` value.
    pub fn block1(&mut self, value: &[u8]) -> &mut Self {
        self.u8(value.len() as u8).bytes(value)
    }

    /// Reserve four bytes to be filled in by `patch_u32`.
    pub fn placeholder_u32(&mut self) -> usize {
        let position = self.len();
        self.u32(0);
        position
    }

    pub fn patch_u32(&mut self, position: usize, value: u32) {
        self.0[position..position + 4].copy_from_slice(&value.to_le_bytes());
    }
}

/// One abbreviation declaration.
pub struct Abbrev<'a> {
    pub code: u64,
    pub tag: gimli::DwTag,
    pub children: bool,
    pub attributes: &'a [(gimli::DwAt, gimli::DwForm)],
}

/// Encode an abbreviation table, including its terminating zero code.
pub fn abbrev_table(abbrevs: &[Abbrev]) -> Vec<u8> {
    let mut buf = Bytes::new();
    for abbrev in abbrevs {
        buf.uleb(abbrev.code)
            .uleb(abbrev.tag.0.into())
            .u8(abbrev.children as u8);
        for (name, form) in abbrev.attributes {
            buf.uleb(name.0.into()).uleb(form.0.into());
        }
        buf.uleb(0).uleb(0);
    }
    buf.uleb(0);
    buf.0
}

/// The size of a compilation unit header.
pub const HEADER_SIZE: usize = 11;

/// A compilation unit under construction.
///
/// DIE offsets are relative to the start of the unit, so `offset()` is
/// the value to use for unit-relative references to the next DIE.
pub struct UnitBuilder {
    pub version: u16,
    pub abbrev_offset: u32,
    pub address_size: u8,
    pub body: Bytes,
}

impl UnitBuilder {
    pub fn new(abbrev_offset: u32) -> Self {
        UnitBuilder {
            version: 2,
            abbrev_offset,
            address_size: 8,
            body: Bytes::new(),
        }
    }

    /// The unit-relative offset of the next DIE.
    pub fn offset(&self) -> u32 {
        (HEADER_SIZE + self.body.len()) as u32
    }

    /// Start a DIE with an abbreviation code.
    pub fn die(&mut self, code: u64) -> &mut Bytes {
        self.body.uleb(code)
    }

    /// Close the current list of children.
    pub fn end(&mut self) {
        self.body.u8(0);
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut buf = Bytes::new();
        buf.u32((HEADER_SIZE - 4 + self.body.len()) as u32)
            .u16(self.version)
            .u32(self.abbrev_offset)
            .u8(self.address_size)
            .bytes(&self.body.0);
        buf.0
    }
}

/// Encode a version 2 line program for a single file `main.c`.
///
/// The header uses line_base -5, line_range 14 and opcode_base 13.
pub fn line_program(ops: &[u8]) -> Vec<u8> {
    let mut header = Bytes::new();
    header.u8(1).u8(1).u8((-5i8) as u8).u8(14).u8(13);
    header.bytes(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
    header.u8(0);
    header.string("main.c").uleb(0).uleb(0).uleb(0);
    header.u8(0);

    let mut buf = Bytes::new();
    buf.u32((2 + 4 + header.len() + ops.len()) as u32)
        .u16(2)
        .u32(header.len() as u32)
        .bytes(&header.0)
        .bytes(ops);
    buf.0
}

/// Line program opcodes placing line `line` at `address`, then ending the
/// sequence at `end`.
pub fn line_ops(address: u64, line: u64, end: u64) -> Vec<u8> {
    let mut ops = Bytes::new();
    ops.u8(0).uleb(9).u8(gimli::DW_LNE_set_address.0).u64(address);
    ops.u8(gimli::DW_LNS_advance_line.0).sleb(line as i64 - 1);
    ops.u8(gimli::DW_LNS_copy.0);
    ops.u8(gimli::DW_LNS_advance_pc.0).uleb(end - address);
    ops.u8(0).uleb(1).u8(gimli::DW_LNE_end_sequence.0);
    ops.0
}
