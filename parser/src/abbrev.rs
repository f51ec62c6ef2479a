use fnv::FnvHashMap as HashMap;
use gimli::RunTimeEndian;

use crate::reader::ByteCursor;
use crate::{Error, Result};

// Codes below this are stored in a vector indexed by code.
const DENSE_LIMIT: u64 = 4096;

/// The name and form of one attribute in an abbreviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: gimli::DwAt,
    pub form: gimli::DwForm,
}

/// A template for the DIEs that use its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbreviation {
    pub code: u64,
    pub tag: gimli::DwTag,
    pub has_children: bool,
    pub attributes: Vec<AttributeSpec>,
}

/// The abbreviations of one compilation unit.
#[derive(Debug, Default)]
pub struct AbbreviationTable {
    dense: Vec<Option<Abbreviation>>,
    sparse: HashMap<u64, Abbreviation>,
}

impl AbbreviationTable {
    /// Parse the table starting at `offset` in `.debug_abbrev`.
    pub fn load(buffer: &[u8], offset: usize, endian: RunTimeEndian) -> Result<AbbreviationTable> {
        if offset > buffer.len() {
            return Err(Error::MalformedAbbrev(format!(
                "offset 0x{:x} is beyond the section end",
                offset
            )));
        }
        let mut cursor = ByteCursor::with_range(buffer, offset, buffer.len(), endian);
        let mut table = AbbreviationTable::default();
        loop {
            let code = cursor.read_uleb128().map_err(truncated)?;
            if code == 0 {
                break;
            }
            let abbrev = Self::parse_one(&mut cursor, code)?;
            table.insert(abbrev)?;
        }
        debug!("loaded {} abbreviations at 0x{:x}", table.len(), offset);
        Ok(table)
    }

    fn parse_one(cursor: &mut ByteCursor, code: u64) -> Result<Abbreviation> {
        let tag = cursor.read_uleb128().map_err(truncated)?;
        if tag == 0 || tag > u64::from(u16::MAX) {
            return Err(Error::MalformedAbbrev(format!(
                "invalid tag 0x{:x} for code {}",
                tag, code
            )));
        }
        let has_children = match cursor.read_u8().map_err(truncated)? {
            0 => false,
            1 => true,
            other => {
                return Err(Error::MalformedAbbrev(format!(
                    "invalid children flag {} for code {}",
                    other, code
                )));
            }
        };
        let mut attributes = Vec::new();
        loop {
            let name = cursor.read_uleb128().map_err(truncated)?;
            let form = cursor.read_uleb128().map_err(truncated)?;
            if name == 0 && form == 0 {
                break;
            }
            if name == 0 || name > u64::from(u16::MAX) || form == 0 || form > u64::from(u16::MAX)
            {
                return Err(Error::MalformedAbbrev(format!(
                    "invalid attribute (0x{:x}, 0x{:x}) for code {}",
                    name, form, code
                )));
            }
            attributes.push(AttributeSpec {
                name: gimli::DwAt(name as u16),
                form: gimli::DwForm(form as u16),
            });
        }
        Ok(Abbreviation {
            code,
            tag: gimli::DwTag(tag as u16),
            has_children,
            attributes,
        })
    }

    fn insert(&mut self, abbrev: Abbreviation) -> Result<()> {
        let code = abbrev.code;
        if self.get(code).is_some() {
            return Err(Error::MalformedAbbrev(format!(
                "duplicate abbreviation code {}",
                code
            )));
        }
        if code < DENSE_LIMIT {
            let index = code as usize;
            if self.dense.len() <= index {
                self.dense.resize(index + 1, None);
            }
            self.dense[index] = Some(abbrev);
        } else {
            self.sparse.insert(code, abbrev);
        }
        Ok(())
    }

    /// Find the abbreviation for a code.
    #[inline]
    pub fn get(&self, code: u64) -> Option<&Abbreviation> {
        if code < DENSE_LIMIT {
            self.dense.get(code as usize).and_then(Option::as_ref)
        } else {
            self.sparse.get(&code)
        }
    }

    /// The number of abbreviations in the table.
    pub fn len(&self) -> usize {
        self.dense.iter().filter(|x| x.is_some()).count() + self.sparse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn truncated(e: Error) -> Error {
    match e {
        Error::TruncatedInput { offset, .. } => {
            Error::MalformedAbbrev(format!("unterminated table at offset 0x{:x}", offset))
        }
        e => e,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn load() {
        #[rustfmt::skip]
        let data = [
            0xff, // padding before the table
            // code 1: compile_unit, children, name/string, language/data1
            0x01, 0x11, 0x01, 0x03, 0x08, 0x13, 0x0b, 0x00, 0x00,
            // code 2: base_type, no children
            0x02, 0x24, 0x00, 0x03, 0x08, 0x00, 0x00,
            0x00,
        ];
        let table = AbbreviationTable::load(&data, 1, RunTimeEndian::Little).unwrap();
        assert_eq!(table.len(), 2);

        let cu = table.get(1).unwrap();
        assert_eq!(cu.tag, gimli::DW_TAG_compile_unit);
        assert!(cu.has_children);
        assert_eq!(
            cu.attributes,
            vec![
                AttributeSpec {
                    name: gimli::DW_AT_name,
                    form: gimli::DW_FORM_string,
                },
                AttributeSpec {
                    name: gimli::DW_AT_language,
                    form: gimli::DW_FORM_data1,
                },
            ]
        );

        let base = table.get(2).unwrap();
        assert_eq!(base.tag, gimli::DW_TAG_base_type);
        assert!(!base.has_children);
        assert!(table.get(3).is_none());
        assert!(table.get(0).is_none());
    }

    #[test]
    fn sparse_codes() {
        // code 5000 (uleb 0x88 0x27), variable, no attributes
        let data = [0x88, 0x27, 0x34, 0x00, 0x00, 0x00, 0x00];
        let table = AbbreviationTable::load(&data, 0, RunTimeEndian::Little).unwrap();
        assert_eq!(table.get(5000).unwrap().tag, gimli::DW_TAG_variable);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unterminated_attributes() {
        // The (0, 0) pair closing the attribute list is missing.
        let data = [0x01, 0x11, 0x01, 0x03, 0x08];
        match AbbreviationTable::load(&data, 0, RunTimeEndian::Little) {
            Err(Error::MalformedAbbrev(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unterminated_table() {
        let data = [0x01, 0x11, 0x01, 0x00, 0x00];
        match AbbreviationTable::load(&data, 0, RunTimeEndian::Little) {
            Err(Error::MalformedAbbrev(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn duplicate_code() {
        let data = [0x01, 0x24, 0x00, 0x00, 0x00, 0x01, 0x34, 0x00, 0x00, 0x00, 0x00];
        assert!(AbbreviationTable::load(&data, 0, RunTimeEndian::Little).is_err());
    }

    #[test]
    fn bad_offset() {
        assert!(AbbreviationTable::load(&[0], 2, RunTimeEndian::Little).is_err());
    }
}
