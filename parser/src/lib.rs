//! A reader for DWARF version 2 debugging information.
//!
//! Parsing happens in two passes. [`ParseSession::scan`] walks every
//! compilation unit in `.debug_info` and builds a shallow index of
//! partial symbols. [`ParseSession::expand_unit`] later re-reads a single
//! unit in full, producing its type graph, scope tree and line table.

// Enable some rust 2018 idioms.
#![warn(bare_trait_objects)]
#![warn(unused_extern_crates)]
// Calm down clippy.
#![allow(clippy::single_match)]

#[macro_use]
extern crate log;

mod abbrev;
mod builder;
mod database;
mod diagnostic;
mod die;
mod file;
mod line;
mod location;
mod partial;
mod range;
mod reader;
mod reference;
mod session;
mod source;
mod symbol;
mod types;
mod unit;

pub use crate::abbrev::*;
pub use crate::database::*;
pub use crate::diagnostic::*;
pub use crate::die::*;
pub use crate::file::*;
pub use crate::line::*;
pub use crate::location::*;
pub use crate::partial::*;
pub use crate::range::*;
pub use crate::reader::*;
pub use crate::reference::*;
pub use crate::session::*;
pub use crate::source::*;
pub use crate::symbol::*;
pub use crate::types::*;
pub use crate::unit::*;

use std::error;
use std::fmt;
use std::io;
use std::result;

#[derive(Debug)]
pub enum Error {
    /// A read ran past the end of its buffer.
    TruncatedInput { offset: usize, wanted: usize },
    /// A compilation unit header named a version other than 2.
    UnsupportedVersion(u16),
    /// A DIE used an abbreviation code missing from its unit's table.
    UnknownAbbrev(u64),
    MalformedAbbrev(String),
    /// A reference named an offset where no DIE was read.
    UnresolvedReference(DieOffset),
    MalformedLineProgram(String),
    UnsupportedForm(gimli::DwForm),
    InvalidAddressSize(u8),
    /// DIEs or type references nest deeper than the builder follows.
    NestingTooDeep(DieOffset),
    /// A compilation unit has no `DW_AT_stmt_list`.
    MissingLineProgram(String),
    /// Expansion of a compilation unit failed.
    UnitUnavailable { name: String, cause: Box<Error> },
    /// An object file has no section with this name.
    MissingSection(&'static str),
    Io(String),
    Object(String),
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::UnitUnavailable { cause, .. } => Some(&**cause),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TruncatedInput { offset, wanted } => write!(
                f,
                "truncated input: wanted {} bytes at offset 0x{:x}",
                wanted, offset
            ),
            Error::UnsupportedVersion(version) => {
                write!(f, "unsupported DWARF version: {}", version)
            }
            Error::UnknownAbbrev(code) => write!(f, "unknown abbreviation code: {}", code),
            Error::MalformedAbbrev(reason) => write!(f, "malformed abbreviation table: {}", reason),
            Error::UnresolvedReference(offset) => {
                write!(f, "cannot find referent at offset 0x{:x}", offset.0)
            }
            Error::MalformedLineProgram(reason) => write!(f, "malformed line program: {}", reason),
            Error::UnsupportedForm(form) => write!(f, "unsupported attribute form: {}", form),
            Error::InvalidAddressSize(size) => write!(f, "invalid address size: {}", size),
            Error::NestingTooDeep(offset) => {
                write!(f, "DIE nesting too deep at offset 0x{:x}", offset.0)
            }
            Error::MissingLineProgram(name) => write!(
                f,
                "no line number information for compilation unit: {}",
                name
            ),
            Error::UnitUnavailable { name, cause } => write!(
                f,
                "debug information for compilation unit {} is unavailable: {}",
                name, cause
            ),
            Error::MissingSection(name) => write!(f, "missing section: {}", name),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Object(e) => write!(f, "object error: {}", e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e.to_string())
    }
}

impl From<object::Error> for Error {
    fn from(e: object::Error) -> Error {
        Error::Object(e.to_string())
    }
}

pub type Result<T> = result::Result<T, Error>;
