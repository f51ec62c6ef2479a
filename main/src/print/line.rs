use parser::{ExpandedUnit, LineRow};

use crate::print::Printer;
use crate::Result;

pub(crate) fn print_lines(unit: &ExpandedUnit, printer: &mut dyn Printer) -> Result<()> {
    let rows = unit.lines().rows();
    printer.line_args("lines", format_args!("{}", rows.len()))?;
    printer.indent(&mut |printer| {
        for row in rows {
            if row.end_sequence {
                printer.line_args("", format_args!("0x{:x} end", row.address))?;
            } else {
                printer.line_args(
                    "",
                    format_args!("0x{:x} {}", row.address, location(unit, row)),
                )?;
            }
        }
        Ok(())
    })
}

pub(crate) fn print_row(unit: &ExpandedUnit, row: &LineRow, printer: &mut dyn Printer) -> Result<()> {
    printer.line("line", location(unit, row).as_bytes())
}

fn location(unit: &ExpandedUnit, row: &LineRow) -> String {
    let source = unit.lines().source(row);
    let path = source
        .path(unit.comp_dir())
        .unwrap_or_else(|| "<unknown>".to_string());
    if source.column() != 0 {
        format!("{}:{}:{}", path, source.line(), source.column())
    } else {
        format!("{}:{}", path, source.line())
    }
}
