use std::borrow::Cow;
use std::fs;

use fnv::FnvHashMap as HashMap;
use gimli::RunTimeEndian;
use object::{Object, ObjectSection};

use crate::session::ParseSession;
use crate::{Error, Result};

pub const DEBUG_INFO: &str = ".debug_info";
pub const DEBUG_ABBREV: &str = ".debug_abbrev";
pub const DEBUG_LINE: &str = ".debug_line";
pub const DEBUG_STR: &str = ".debug_str";

/// A source of named section contents.
pub trait SectionLoader<'input> {
    /// The uncompressed contents of a section, or `None` if the section is absent.
    fn get_section(&self, name: &str) -> Option<Cow<'input, [u8]>>;

    fn endian(&self) -> RunTimeEndian;
}

impl<'input> SectionLoader<'input> for object::File<'input> {
    fn get_section(&self, name: &str) -> Option<Cow<'input, [u8]>> {
        let section = self.section_by_name(name)?;
        match section.uncompressed_data() {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("unreadable section {}: {}", name, e);
                None
            }
        }
    }

    fn endian(&self) -> RunTimeEndian {
        if self.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        }
    }
}

/// Sections held in memory, keyed by name.
#[derive(Debug, Clone)]
pub struct SectionMap<'input> {
    endian: RunTimeEndian,
    sections: HashMap<String, &'input [u8]>,
}

impl<'input> SectionMap<'input> {
    pub fn new(endian: RunTimeEndian) -> Self {
        SectionMap {
            endian,
            sections: HashMap::default(),
        }
    }

    pub fn insert(&mut self, name: &str, data: &'input [u8]) {
        self.sections.insert(name.to_string(), data);
    }
}

impl<'input> SectionLoader<'input> for SectionMap<'input> {
    fn get_section(&self, name: &str) -> Option<Cow<'input, [u8]>> {
        self.sections.get(name).map(|data| Cow::Borrowed(*data))
    }

    fn endian(&self) -> RunTimeEndian {
        self.endian
    }
}

/// The sections read by a parse session.
#[derive(Debug, Clone, Copy)]
pub struct DebugSections<'input> {
    pub endian: RunTimeEndian,
    pub debug_info: &'input [u8],
    pub debug_abbrev: &'input [u8],
    pub debug_line: &'input [u8],
    pub debug_str: &'input [u8],
}

impl<'input> DebugSections<'input> {
    pub fn new(
        endian: RunTimeEndian,
        debug_info: &'input [u8],
        debug_abbrev: &'input [u8],
        debug_line: &'input [u8],
    ) -> Self {
        DebugSections {
            endian,
            debug_info,
            debug_abbrev,
            debug_line,
            debug_str: &[],
        }
    }

    pub fn with_str(mut self, debug_str: &'input [u8]) -> Self {
        self.debug_str = debug_str;
        self
    }
}

/// Section contents fetched from a loader.
///
/// Decompressed sections are owned here, so this must outlive the
/// `DebugSections` borrowed from it.
#[derive(Debug)]
pub struct SectionData<'input> {
    endian: RunTimeEndian,
    debug_info: Cow<'input, [u8]>,
    debug_abbrev: Cow<'input, [u8]>,
    debug_line: Cow<'input, [u8]>,
    debug_str: Cow<'input, [u8]>,
}

impl<'input> SectionData<'input> {
    /// Fetch the sections from a loader.
    ///
    /// Returns `None` if there is no `.debug_info` section. Other missing
    /// sections are treated as empty.
    pub fn load(loader: &dyn SectionLoader<'input>) -> Option<Self> {
        let debug_info = loader.get_section(DEBUG_INFO)?;
        let get_section = |name| {
            loader
                .get_section(name)
                .unwrap_or(Cow::Borrowed(&[]))
        };
        Some(SectionData {
            endian: loader.endian(),
            debug_info,
            debug_abbrev: get_section(DEBUG_ABBREV),
            debug_line: get_section(DEBUG_LINE),
            debug_str: get_section(DEBUG_STR),
        })
    }

    pub fn sections(&self) -> DebugSections<'_> {
        DebugSections {
            endian: self.endian,
            debug_info: &self.debug_info,
            debug_abbrev: &self.debug_abbrev,
            debug_line: &self.debug_line,
            debug_str: &self.debug_str,
        }
    }
}

/// An object file with DWARF debugging information.
pub struct File;

impl File {
    /// Map an object file and hand a parse session over its sections to `cb`.
    ///
    /// The session has not been scanned yet.
    pub fn parse<Cb>(path: &str, cb: Cb) -> Result<()>
    where
        Cb: FnOnce(&mut ParseSession) -> Result<()>,
    {
        let handle = match fs::File::open(path) {
            Ok(handle) => handle,
            Err(e) => {
                return Err(Error::Io(format!("open {} failed: {}", path, e)));
            }
        };

        let map = match unsafe { memmap2::Mmap::map(&handle) } {
            Ok(map) => map,
            Err(e) => {
                return Err(Error::Io(format!("memmap {} failed: {}", path, e)));
            }
        };

        File::parse_object(&map, cb)
    }

    fn parse_object<Cb>(input: &[u8], cb: Cb) -> Result<()>
    where
        Cb: FnOnce(&mut ParseSession) -> Result<()>,
    {
        let object = object::File::parse(input)?;
        let data = match SectionData::load(&object) {
            Some(data) => data,
            None => return Err(Error::MissingSection(DEBUG_INFO)),
        };
        debug!(
            "loaded {} bytes of {} from {:?} object",
            data.debug_info.len(),
            DEBUG_INFO,
            object.format()
        );
        let mut session = ParseSession::new(data.sections());
        cb(&mut session)
    }
}
