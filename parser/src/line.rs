use std::convert::TryFrom;

use gimli::RunTimeEndian;

use crate::reader::ByteCursor;
use crate::source::Source;
use crate::{Error, Result};

/// An entry in the file table of a line program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    /// Index into the include directories, where 0 is the compilation directory.
    pub directory_index: u64,
    pub modification_time: u64,
    pub length: u64,
}

/// The header of a line number program.
#[derive(Debug, Clone)]
pub struct LineProgramHeader {
    pub offset: usize,
    pub unit_length: u32,
    pub version: u16,
    pub header_length: u32,
    pub minimum_instruction_length: u8,
    pub default_is_stmt: bool,
    pub line_base: i8,
    pub line_range: u8,
    pub opcode_base: u8,
    /// The operand counts of standard opcodes `1..opcode_base`.
    pub standard_opcode_lengths: Vec<u8>,
    pub include_directories: Vec<String>,
    pub file_names: Vec<FileEntry>,
}

/// A row of the line number table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LineRow {
    pub address: u64,
    /// 1-based index into the file table.
    pub file: u64,
    pub line: u64,
    pub column: u64,
    pub is_stmt: bool,
    pub basic_block: bool,
    /// This row marks the first address past the end of a sequence.
    pub end_sequence: bool,
}

/// The decoded line number table of one compilation unit.
#[derive(Debug, Clone)]
pub struct LineTable {
    pub(crate) header: LineProgramHeader,
    // Includes entries added by `DW_LNE_define_file`.
    pub(crate) files: Vec<FileEntry>,
    pub(crate) rows: Vec<LineRow>,
}

#[derive(Debug, Clone, Copy)]
struct Registers {
    address: u64,
    file: u64,
    line: u64,
    column: u64,
    is_stmt: bool,
    basic_block: bool,
    end_sequence: bool,
}

impl Registers {
    fn new(default_is_stmt: bool) -> Self {
        Registers {
            address: 0,
            file: 1,
            line: 1,
            column: 0,
            is_stmt: default_is_stmt,
            basic_block: false,
            end_sequence: false,
        }
    }

    fn row(&self) -> LineRow {
        LineRow {
            address: self.address,
            file: self.file,
            line: self.line,
            column: self.column,
            is_stmt: self.is_stmt,
            basic_block: self.basic_block,
            end_sequence: self.end_sequence,
        }
    }

    fn advance_line(&mut self, delta: i64) {
        self.line = (self.line as i64).wrapping_add(delta) as u64;
    }
}

impl LineTable {
    /// Decode the line program at `offset` in `.debug_line`.
    pub fn parse(
        section: &[u8],
        offset: usize,
        address_size: u8,
        endian: RunTimeEndian,
    ) -> Result<LineTable> {
        if offset > section.len() {
            return Err(malformed(format!("offset 0x{:x} is beyond the section end", offset)));
        }
        let mut cursor = ByteCursor::with_range(section, offset, section.len(), endian);
        let header = Self::parse_header(&mut cursor, offset).map_err(truncated)?;
        let end = offset + 4 + header.unit_length as usize;
        if end > section.len() {
            return Err(malformed(format!(
                "program at 0x{:x} extends past the section end",
                offset
            )));
        }
        let start = offset + 10 + header.header_length as usize;
        if start > end || start < cursor.offset() {
            return Err(malformed(format!("invalid header length {}", header.header_length)));
        }
        let mut program = ByteCursor::with_range(section, start, end, endian);
        let mut table = LineTable {
            files: header.file_names.clone(),
            header,
            rows: Vec::new(),
        };
        table.run(&mut program, address_size).map_err(truncated)?;
        Ok(table)
    }

    fn parse_header(cursor: &mut ByteCursor, offset: usize) -> Result<LineProgramHeader> {
        let unit_length = cursor.read_u32()?;
        let version = cursor.read_u16()?;
        let header_length = cursor.read_u32()?;
        let minimum_instruction_length = cursor.read_u8()?;
        let default_is_stmt = cursor.read_u8()? != 0;
        let line_base = cursor.read_i8()?;
        let line_range = cursor.read_u8()?;
        let opcode_base = cursor.read_u8()?;
        if line_range == 0 {
            return Err(malformed("line_range is zero".into()));
        }
        if opcode_base == 0 {
            return Err(malformed("opcode_base is zero".into()));
        }
        let standard_opcode_lengths = cursor.read_bytes(opcode_base as usize - 1)?.to_vec();

        let mut include_directories = Vec::new();
        loop {
            let dir = cursor.read_cstring()?;
            if dir.is_empty() {
                break;
            }
            include_directories.push(String::from_utf8_lossy(dir).into_owned());
        }

        let mut file_names = Vec::new();
        loop {
            let name = cursor.read_cstring()?;
            if name.is_empty() {
                break;
            }
            file_names.push(Self::parse_file_entry(cursor, name)?);
        }

        Ok(LineProgramHeader {
            offset,
            unit_length,
            version,
            header_length,
            minimum_instruction_length,
            default_is_stmt,
            line_base,
            line_range,
            opcode_base,
            standard_opcode_lengths,
            include_directories,
            file_names,
        })
    }

    fn parse_file_entry(cursor: &mut ByteCursor, name: &[u8]) -> Result<FileEntry> {
        Ok(FileEntry {
            name: String::from_utf8_lossy(name).into_owned(),
            directory_index: cursor.read_uleb128()?,
            modification_time: cursor.read_uleb128()?,
            length: cursor.read_uleb128()?,
        })
    }

    fn run(&mut self, cursor: &mut ByteCursor, address_size: u8) -> Result<()> {
        let min_inst_len = u64::from(self.header.minimum_instruction_length);
        let line_base = i64::from(self.header.line_base);
        let line_range = u64::from(self.header.line_range);
        let opcode_base = self.header.opcode_base;

        let mut regs = Registers::new(self.header.default_is_stmt);
        let mut in_sequence = false;
        while !cursor.is_empty() {
            in_sequence = true;
            let opcode = cursor.read_u8()?;
            if opcode >= opcode_base {
                let adjusted = u64::from(opcode - opcode_base);
                regs.address = regs
                    .address
                    .wrapping_add((adjusted / line_range) * min_inst_len);
                regs.advance_line(line_base + (adjusted % line_range) as i64);
                self.rows.push(regs.row());
                regs.basic_block = false;
                continue;
            }
            match gimli::DwLns(opcode) {
                gimli::DW_LNS_copy => {
                    self.rows.push(regs.row());
                    regs.basic_block = false;
                }
                gimli::DW_LNS_advance_pc => {
                    let operand = cursor.read_uleb128()?;
                    regs.address = regs.address.wrapping_add(operand.wrapping_mul(min_inst_len));
                }
                gimli::DW_LNS_advance_line => {
                    let delta = cursor.read_sleb128()?;
                    regs.advance_line(delta);
                }
                gimli::DW_LNS_set_file => regs.file = cursor.read_uleb128()?,
                gimli::DW_LNS_set_column => regs.column = cursor.read_uleb128()?,
                gimli::DW_LNS_negate_stmt => regs.is_stmt = !regs.is_stmt,
                gimli::DW_LNS_set_basic_block => regs.basic_block = true,
                gimli::DW_LNS_const_add_pc => {
                    let adjusted = u64::from(255 - opcode_base);
                    regs.address = regs
                        .address
                        .wrapping_add((adjusted / line_range) * min_inst_len);
                }
                gimli::DW_LNS_fixed_advance_pc => {
                    let operand = cursor.read_u16()?;
                    regs.address = regs.address.wrapping_add(u64::from(operand));
                }
                _ if opcode == 0 => {
                    if self.run_extended(cursor, &mut regs, address_size)? {
                        regs = Registers::new(self.header.default_is_stmt);
                        in_sequence = false;
                    }
                }
                _ => {
                    // Skip operands of standard opcodes this reader does not know.
                    let count = self.header.standard_opcode_lengths[opcode as usize - 1];
                    debug!("skipping line opcode {} with {} operands", opcode, count);
                    for _ in 0..count {
                        cursor.read_uleb128()?;
                    }
                }
            }
        }
        if in_sequence {
            return Err(malformed(format!(
                "program at 0x{:x} ends without DW_LNE_end_sequence",
                self.header.offset
            )));
        }
        Ok(())
    }

    // Returns true at the end of a sequence.
    fn run_extended(
        &mut self,
        cursor: &mut ByteCursor,
        regs: &mut Registers,
        address_size: u8,
    ) -> Result<bool> {
        let len = cursor.read_uleb128()?;
        if len == 0 {
            return Err(malformed("empty extended opcode".into()));
        }
        let start = cursor.offset();
        let end = match usize::try_from(len).ok().and_then(|len| start.checked_add(len)) {
            Some(end) if end <= cursor.end() => end,
            _ => {
                return Err(malformed(format!(
                    "extended opcode at 0x{:x} has length {} past the program end",
                    start, len
                )));
            }
        };
        let len = end - start;
        let opcode = gimli::DwLne(cursor.read_u8()?);
        match opcode {
            gimli::DW_LNE_end_sequence => {
                regs.end_sequence = true;
                self.rows.push(regs.row());
                return Ok(true);
            }
            gimli::DW_LNE_set_address => {
                let size = match len - 1 {
                    1 | 2 | 4 | 8 => (len - 1) as u8,
                    _ => address_size,
                };
                regs.address = cursor.read_address(size)?;
            }
            gimli::DW_LNE_define_file => {
                let name = cursor.read_cstring()?;
                let entry = Self::parse_file_entry(cursor, name)?;
                self.files.push(entry);
            }
            _ => {
                debug!("skipping extended line opcode {}", opcode);
            }
        }
        // Honour the declared length even if the operands disagree.
        cursor.seek(end)?;
        Ok(false)
    }

    #[inline]
    pub fn header(&self) -> &LineProgramHeader {
        &self.header
    }

    #[inline]
    pub fn rows(&self) -> &[LineRow] {
        &self.rows
    }

    /// The file table, including files defined by the program itself.
    #[inline]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Look up a 1-based file index.
    pub fn file(&self, index: u64) -> Option<&FileEntry> {
        if index == 0 {
            return None;
        }
        self.files.get(index as usize - 1)
    }

    /// The directory of a file entry, or `None` for the compilation directory.
    pub fn directory(&self, entry: &FileEntry) -> Option<&str> {
        if entry.directory_index == 0 {
            return None;
        }
        self.header
            .include_directories
            .get(entry.directory_index as usize - 1)
            .map(String::as_str)
    }

    /// The source location of a row.
    pub fn source(&self, row: &LineRow) -> Source<'_> {
        let entry = self.file(row.file);
        Source {
            directory: entry.and_then(|entry| self.directory(entry)),
            file: entry.map(|entry| entry.name.as_str()),
            line: row.line,
            column: row.column,
        }
    }

    /// Find the row that covers an address.
    pub fn row_for_address(&self, address: u64) -> Option<&LineRow> {
        self.rows
            .windows(2)
            .find(|pair| {
                !pair[0].end_sequence && pair[0].address <= address && address < pair[1].address
            })
            .map(|pair| &pair[0])
    }
}

fn malformed(reason: String) -> Error {
    Error::MalformedLineProgram(reason)
}

fn truncated(e: Error) -> Error {
    match e {
        Error::TruncatedInput { offset, .. } => {
            malformed(format!("unexpected end of data at offset 0x{:x}", offset))
        }
        e => e,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // A header with line_base -5, line_range 14, opcode_base 13, and
    // one file "a.c" in directory "src".
    fn program(min_inst_len: u8, ops: &[u8]) -> Vec<u8> {
        let mut header = vec![min_inst_len, 1, (-5i8) as u8, 14, 13];
        header.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
        header.extend_from_slice(b"src\0\0");
        header.extend_from_slice(b"a.c\0\x01\0\0\0");

        let mut data = Vec::new();
        let unit_length = 2 + 4 + header.len() + ops.len();
        data.extend_from_slice(&(unit_length as u32).to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&(header.len() as u32).to_le_bytes());
        data.extend_from_slice(&header);
        data.extend_from_slice(ops);
        data
    }

    fn parse(data: &[u8]) -> Result<LineTable> {
        LineTable::parse(data, 0, 4, RunTimeEndian::Little)
    }

    const END_SEQUENCE: [u8; 3] = [0, 1, 1];

    #[test]
    fn header() {
        let table = parse(&program(1, &END_SEQUENCE)).unwrap();
        let header = table.header();
        assert_eq!(header.line_base, -5);
        assert_eq!(header.line_range, 14);
        assert_eq!(header.opcode_base, 13);
        assert_eq!(header.standard_opcode_lengths.len(), 12);
        assert_eq!(header.include_directories, vec!["src".to_string()]);
        assert_eq!(table.file(1).unwrap().name, "a.c");
        assert_eq!(table.directory(table.file(1).unwrap()), Some("src"));
    }

    #[test]
    fn special_opcode() {
        let mut ops = vec![0, 5, 2, 0x00, 0x10, 0x00, 0x00, 0x13];
        ops.extend_from_slice(&END_SEQUENCE);
        let table = parse(&program(1, &ops)).unwrap();
        // adjusted = 6: address += 6 / 14, line += -5 + 6 % 14
        assert_eq!(
            table.rows()[0],
            LineRow {
                address: 0x1000,
                file: 1,
                line: 2,
                column: 0,
                is_stmt: true,
                basic_block: false,
                end_sequence: false,
            }
        );
        assert!(table.rows()[1].end_sequence);
        assert_eq!(table.rows().len(), 2);
    }

    #[test]
    fn special_opcode_address_advance() {
        // opcode 0x50: adjusted = 67, address += 4 * 2, line += -5 + 11
        let mut ops = vec![0x50];
        ops.extend_from_slice(&END_SEQUENCE);
        let table = parse(&program(2, &ops)).unwrap();
        assert_eq!(table.rows()[0].address, 8);
        assert_eq!(table.rows()[0].line, 7);
    }

    #[test]
    fn standard_opcodes() {
        #[rustfmt::skip]
        let mut ops = vec![
            2, 0x10,         // advance_pc 16 (scaled by 4)
            3, 0x0a,         // advance_line 10
            5, 3,            // set_column 3
            6,               // negate_stmt
            1,               // copy
            8,               // const_add_pc: (255 - 13) / 14 = 17, scaled by 4
            9, 0x02, 0x00,   // fixed_advance_pc 2, unscaled
            4, 2,            // set_file 2
            1,               // copy
        ];
        ops.extend_from_slice(&END_SEQUENCE);
        let table = parse(&program(4, &ops)).unwrap();
        let rows = table.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            (rows[0].address, rows[0].line, rows[0].column, rows[0].is_stmt),
            (64, 11, 3, false)
        );
        assert_eq!(rows[1].address, 64 + 68 + 2);
        assert_eq!(rows[1].file, 2);
        assert!(rows[2].end_sequence);
    }

    #[test]
    fn define_file() {
        let mut ops = vec![0, 8, 3];
        ops.extend_from_slice(b"b.c\0\x00\x00\x00");
        ops.extend_from_slice(&[4, 2, 1]);
        ops.extend_from_slice(&END_SEQUENCE);
        let table = parse(&program(1, &ops)).unwrap();
        assert_eq!(table.files().len(), 2);
        let source = table.source(&table.rows()[0]);
        assert_eq!(source.file(), Some("b.c"));
        assert_eq!(source.directory(), None);
    }

    #[test]
    fn multiple_sequences() {
        let mut ops = vec![0x14];
        ops.extend_from_slice(&END_SEQUENCE);
        ops.push(0x14);
        ops.extend_from_slice(&END_SEQUENCE);
        let table = parse(&program(1, &ops)).unwrap();
        let rows = table.rows();
        assert_eq!(rows.len(), 4);
        // Registers are reset after each sequence.
        assert_eq!(rows[2].line, 3);
        assert!(!rows[2].end_sequence);
    }

    #[test]
    fn missing_end_sequence() {
        match parse(&program(1, &[0x13, 1])) {
            Err(Error::MalformedLineProgram(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn oversized_extended_opcode() {
        // An unknown extended opcode whose length is u64::MAX.
        let mut ops = vec![0];
        ops.extend_from_slice(&[0xff; 9]);
        ops.extend_from_slice(&[0x01, 0x99]);
        ops.extend_from_slice(&END_SEQUENCE);
        match parse(&program(1, &ops)) {
            Err(Error::MalformedLineProgram(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }

        // One byte longer than what is left of the program.
        let mut ops = vec![0, 5, 0x99];
        ops.extend_from_slice(&END_SEQUENCE);
        match parse(&program(1, &ops)) {
            Err(Error::MalformedLineProgram(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn truncated_program() {
        let mut data = program(1, &END_SEQUENCE);
        data.truncate(data.len() - 1);
        match parse(&data) {
            Err(Error::MalformedLineProgram(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unterminated_file_table() {
        let mut data = Vec::new();
        let header = [1, 1, (-5i8) as u8, 14, 1, b'a', b'.', b'c'];
        data.extend_from_slice(&((6 + header.len()) as u32).to_le_bytes());
        data.extend_from_slice(&2u16.to_le_bytes());
        data.extend_from_slice(&(header.len() as u32).to_le_bytes());
        data.extend_from_slice(&header);
        match parse(&data) {
            Err(Error::MalformedLineProgram(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn row_for_address() {
        let mut ops = vec![0, 5, 2, 0x00, 0x10, 0x00, 0x00, 1];
        // address += 4, line += 1
        ops.push(13 + 4 * 14 + 6);
        ops.extend_from_slice(&[2, 4]);
        ops.extend_from_slice(&END_SEQUENCE);
        let table = parse(&program(1, &ops)).unwrap();
        assert_eq!(table.row_for_address(0x1002).unwrap().line, 1);
        assert_eq!(table.row_for_address(0x1004).unwrap().line, 2);
        assert_eq!(table.row_for_address(0x1007).unwrap().line, 2);
        assert!(table.row_for_address(0x1008).is_none());
        assert!(table.row_for_address(0xfff).is_none());
    }
}
