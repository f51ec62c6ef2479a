use parser::{ParseSession, SymbolStore};

use crate::filter;
use crate::print::{line, unit, Printer};
use crate::{Options, Result};

/// Scan a session and print the units selected by `options`.
pub fn print(
    session: &mut ParseSession,
    printer: &mut dyn Printer,
    options: &Options,
) -> Result<()> {
    let mut store = SymbolStore::new();
    let report = session.scan(&mut store);
    for failure in &report.failures {
        printer.line_args(
            "skipped unit",
            format_args!("0x{:x}: {}", failure.offset, failure.error),
        )?;
    }

    let units = filter::filter_units(session, options);
    debug!("printing {} of {} units", units.len(), session.units().len());
    for handle in units {
        unit::print_unit(session, &mut store, handle, printer, options)?;
    }

    if let Some(address) = options.address {
        print_address(session, address, printer)?;
    }

    for diagnostic in session.diagnostics().iter() {
        printer.line_args("note", format_args!("{}", diagnostic))?;
    }
    Ok(())
}

/// Print the unit, function and source line that contain an address.
fn print_address(session: &mut ParseSession, address: u64, printer: &mut dyn Printer) -> Result<()> {
    printer.line_args("address", format_args!("0x{:x}", address))?;
    let handle = match session.find_unit_for_address(address) {
        Some(handle) => handle,
        None => {
            return printer.indent(&mut |printer| printer.line("", b"no compilation unit"));
        }
    };
    let name = session.unit(handle).display_name().into_owned();
    let expanded = session.expand_unit(handle);
    printer.indent(&mut |printer| {
        printer.line("unit", name.as_bytes())?;
        let unit = match expanded {
            Ok(ref unit) => unit,
            Err(ref e) => return printer.line_args("", format_args!("{}", e)),
        };
        match unit.function_at(address) {
            Some(function) => {
                printer.line("function", function.name().unwrap_or("<anon>").as_bytes())?
            }
            None => printer.line("function", b"<none>")?,
        }
        match unit.lines().row_for_address(address) {
            Some(row) => line::print_row(unit, row, printer),
            None => printer.line("line", b"<none>"),
        }
    })
}
