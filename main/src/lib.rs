// Enable some rust 2018 idioms.
#![warn(bare_trait_objects)]
#![warn(unused_extern_crates)]
// Calm down clippy.
#![allow(clippy::single_match)]

#[macro_use]
extern crate log;

pub use parser::{Error, File, ParseSession, Result};

mod filter;

mod print;
pub use self::print::file::print;
pub use self::print::{Printer, TextPrinter};

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub expand: bool,
    pub print_lines: bool,

    pub filter_unit: Option<String>,
    pub address: Option<u64>,
}

impl Options {
    pub fn unit(&mut self, unit: String) -> &mut Self {
        self.filter_unit = Some(unit);
        self
    }

    pub fn address(&mut self, address: u64) -> &mut Self {
        self.address = Some(address);
        self
    }

    /// Return true if units are expanded for printing.
    ///
    /// Printing line rows needs an expanded unit.
    fn expand(&self) -> bool {
        self.expand || self.print_lines
    }
}

/// Parse an address given as hexadecimal with a `0x` prefix, or decimal.
pub fn parse_address(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}
