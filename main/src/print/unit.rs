use parser::{
    Language, ParseSession, PartialKind, PartialSymbol, ScopeId, SymbolStore, UnitHandle,
};

use crate::print::{line, symbol, Printer};
use crate::{Options, Result};

pub(crate) fn print_unit(
    session: &mut ParseSession,
    store: &mut SymbolStore,
    handle: UnitHandle,
    printer: &mut dyn Printer,
    options: &Options,
) -> Result<()> {
    {
        let unit = session.unit(handle);
        printer.line("unit", unit.display_name().as_bytes())?;
        printer.indent(&mut |printer| {
            if let Some(comp_dir) = unit.comp_dir() {
                printer.line("directory", comp_dir.as_bytes())?;
            }
            printer.line("language", language(unit.language()).as_bytes())?;
            if let Some(range) = unit.range() {
                printer.line_args(
                    "address",
                    format_args!("0x{:x}-0x{:x}", range.begin, range.end),
                )?;
            }
            Ok(())
        })?;
    }

    let stored = store.units().iter().find(|unit| unit.handle == handle);
    if let Some(stored) = stored {
        printer.indent(&mut |printer| {
            for symbol in &stored.partial_symbols {
                print_partial_symbol(symbol, printer)?;
            }
            Ok(())
        })?;
    }

    if options.expand() {
        let expanded = session.expand_unit_into(handle, store);
        printer.indent(&mut |printer| match expanded {
            Ok(ref unit) => {
                if options.expand {
                    symbol::print_scope(unit, session.types(), ScopeId(0), printer)?;
                }
                if options.print_lines {
                    line::print_lines(unit, printer)?;
                }
                Ok(())
            }
            Err(ref e) => printer.line_args("", format_args!("{}", e)),
        })?;
    }
    printer.line_break()
}

fn print_partial_symbol(symbol: &PartialSymbol, printer: &mut dyn Printer) -> Result<()> {
    let mut buf = symbol.name().to_string();
    if let Some(range) = symbol.range() {
        buf.push_str(&format!(" 0x{:x}-0x{:x}", range.begin, range.end));
    } else if let Some(address) = symbol.address() {
        buf.push_str(&format!(" @ 0x{:x}", address));
    }
    if symbol.is_external() {
        buf.push_str(" (external)");
    }
    printer.line(kind(symbol.kind()), buf.as_bytes())
}

fn kind(kind: PartialKind) -> &'static str {
    match kind {
        PartialKind::Function => "function",
        PartialKind::Variable => "variable",
        PartialKind::Typedef => "typedef",
        PartialKind::Struct => "struct",
        PartialKind::Union => "union",
        PartialKind::Class => "class",
        PartialKind::Enumeration => "enum",
    }
}

fn language(language: Language) -> &'static str {
    match language {
        Language::C => "C",
        Language::CPlusPlus => "C++",
        Language::Fortran => "Fortran",
        Language::Unknown => "unknown",
    }
}
