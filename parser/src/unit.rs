use std::borrow::Cow;

use crate::die::{Die, DieOffset};
use crate::range::Range;
use crate::reader::ByteCursor;
use crate::{Error, Result};

/// The only DWARF version this reader decodes.
pub const SUPPORTED_VERSION: u16 = 2;

/// Identifies a compilation unit within a parse session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitHandle(pub usize);

/// The header at the start of each compilation unit in `.debug_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitHeader {
    /// The section offset of the header.
    pub offset: usize,
    /// The length of the unit, not including the length field itself.
    pub length: u32,
    pub version: u16,
    pub abbrev_offset: usize,
    pub address_size: u8,
}

impl UnitHeader {
    /// The size of an encoded header.
    pub const SIZE: usize = 11;

    /// Read a header without validating it.
    pub fn read(cursor: &mut ByteCursor) -> Result<UnitHeader> {
        let offset = cursor.offset();
        let length = cursor.read_u32()?;
        let version = cursor.read_u16()?;
        let abbrev_offset = cursor.read_u32()? as usize;
        let address_size = cursor.read_u8()?;
        Ok(UnitHeader {
            offset,
            length,
            version,
            abbrev_offset,
            address_size,
        })
    }

    /// Check that the rest of the unit can be decoded.
    pub fn validate(&self) -> Result<()> {
        if self.version != SUPPORTED_VERSION {
            return Err(Error::UnsupportedVersion(self.version));
        }
        match self.address_size {
            1 | 2 | 4 | 8 => Ok(()),
            size => Err(Error::InvalidAddressSize(size)),
        }
    }

    /// The offset of the first DIE.
    #[inline]
    pub fn first_die(&self) -> usize {
        self.offset + Self::SIZE
    }

    /// The offset just past the end of the unit.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + 4 + self.length as usize
    }
}

/// The source language of a compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    CPlusPlus,
    Fortran,
    Unknown,
}

impl Default for Language {
    fn default() -> Self {
        Language::Unknown
    }
}

impl From<gimli::DwLang> for Language {
    fn from(lang: gimli::DwLang) -> Self {
        match lang {
            gimli::DW_LANG_C89 | gimli::DW_LANG_C | gimli::DW_LANG_C99 => Language::C,
            gimli::DW_LANG_C_plus_plus => Language::CPlusPlus,
            gimli::DW_LANG_Fortran77 | gimli::DW_LANG_Fortran90 | gimli::DW_LANG_Fortran95 => {
                Language::Fortran
            }
            _ => Language::Unknown,
        }
    }
}

impl Language {
    /// The default lower bound of an array.
    pub fn array_lower_bound(self) -> i64 {
        match self {
            Language::Fortran => 1,
            Language::C | Language::CPlusPlus | Language::Unknown => 0,
        }
    }
}

/// The lazy index entry for a compilation unit.
#[derive(Debug, Clone)]
pub struct UnitIndex {
    pub(crate) handle: UnitHandle,
    pub(crate) header: UnitHeader,
    pub(crate) name: Option<String>,
    pub(crate) comp_dir: Option<String>,
    pub(crate) language: Language,
    pub(crate) range: Option<Range>,
}

impl UnitIndex {
    #[inline]
    pub fn handle(&self) -> UnitHandle {
        self.handle
    }

    #[inline]
    pub fn header(&self) -> &UnitHeader {
        &self.header
    }

    /// The name of the unit, usually the path of its primary source file.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The name to use in messages.
    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.name {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("<0x{:x}>", self.header.offset)),
        }
    }

    /// The compilation directory.
    pub fn comp_dir(&self) -> Option<&str> {
        self.comp_dir.as_deref()
    }

    #[inline]
    pub fn language(&self) -> Language {
        self.language
    }

    /// The address range covered by the unit, if known.
    #[inline]
    pub fn range(&self) -> Option<Range> {
        self.range
    }

    /// Return true if the DIE offset lies within this unit.
    pub fn contains(&self, offset: DieOffset) -> bool {
        offset.0 >= self.header.first_die() && offset.0 < self.header.end()
    }
}

/// The DIEs of one compilation unit in pre-order.
///
/// Entry 0 is the compilation unit DIE.
#[derive(Debug)]
pub struct UnitDies<'input> {
    pub(crate) handle: UnitHandle,
    pub(crate) address_size: u8,
    pub(crate) dies: Vec<Die<'input>>,
    // For each entry, the index just past its subtree.
    pub(crate) ends: Vec<usize>,
}

impl<'input> UnitDies<'input> {
    pub(crate) fn new(handle: UnitHandle, address_size: u8, dies: Vec<Die<'input>>) -> Self {
        let ends = subtree_ends(&dies);
        UnitDies {
            handle,
            address_size,
            dies,
            ends,
        }
    }

    #[inline]
    pub fn handle(&self) -> UnitHandle {
        self.handle
    }

    #[inline]
    pub fn address_size(&self) -> u8 {
        self.address_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dies.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> &Die<'input> {
        &self.dies[index]
    }

    pub fn dies(&self) -> &[Die<'input>] {
        &self.dies
    }

    /// The indices of the immediate children of an entry.
    pub fn children(&self, index: usize) -> Children<'_, 'input> {
        Children {
            unit: self,
            next: index + 1,
            end: if self.dies[index].has_children {
                self.ends[index]
            } else {
                index + 1
            },
        }
    }
}

// Depth bookkeeping over the flat sequence: an entry with children opens a
// level that the next null entry at that depth closes.
fn subtree_ends(dies: &[Die]) -> Vec<usize> {
    let mut ends = vec![0; dies.len()];
    let mut open = Vec::new();
    for (index, die) in dies.iter().enumerate() {
        if die.is_null() {
            ends[index] = index + 1;
            if let Some(parent) = open.pop() {
                ends[parent] = index + 1;
            }
        } else if die.has_children {
            open.push(index);
        } else {
            ends[index] = index + 1;
        }
    }
    // Units may omit trailing null entries.
    for parent in open {
        ends[parent] = dies.len();
    }
    ends
}

pub struct Children<'a, 'input> {
    unit: &'a UnitDies<'input>,
    next: usize,
    end: usize,
}

impl<'a, 'input> Iterator for Children<'a, 'input> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.next < self.end {
            let index = self.next;
            self.next = self.unit.ends[index].max(index + 1);
            if !self.unit.dies[index].is_null() {
                return Some(index);
            }
        }
        None
    }
}
