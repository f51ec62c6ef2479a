use parser::{ExpandedUnit, ScopeId, ScopeKind, StorageClass, Symbol, TypeTable};

use crate::print::types::print_type_detail;
use crate::print::Printer;
use crate::Result;

pub(crate) fn print_scope(
    unit: &ExpandedUnit,
    types: &TypeTable,
    id: ScopeId,
    printer: &mut dyn Printer,
) -> Result<()> {
    let scope = unit.scope(id);
    let range = match scope.range() {
        Some(range) => format!(" 0x{:x}-0x{:x}", range.begin, range.end),
        None => String::new(),
    };
    match scope.kind() {
        ScopeKind::File => printer.line_args("file scope", format_args!("{}", range.trim()))?,
        ScopeKind::Function => printer.line_args(
            "function scope",
            format_args!("{}{}", scope.name().unwrap_or("<anon>"), range),
        )?,
        ScopeKind::Block => printer.line_args("block scope", format_args!("{}", range.trim()))?,
    }
    printer.indent(&mut |printer| {
        for symbol in scope.symbols() {
            print_symbol(unit, types, symbol, printer)?;
        }
        for child in scope.children() {
            print_scope(unit, types, *child, printer)?;
        }
        Ok(())
    })
}

fn print_symbol(
    unit: &ExpandedUnit,
    types: &TypeTable,
    symbol: &Symbol,
    printer: &mut dyn Printer,
) -> Result<()> {
    let ty = types.name(symbol.ty(), unit.language());
    let mut buf = match symbol.class() {
        StorageClass::TypeAlias => format!("{} = {}", symbol.name(), ty),
        class => format!("{} {}{}", ty, symbol.name(), storage(class)),
    };
    if symbol.is_external() {
        buf.push_str(" (external)");
    }
    printer.line(label(symbol), buf.as_bytes())?;
    if symbol.class() == StorageClass::TypeAlias {
        printer.indent(&mut |printer| print_type_detail(types, symbol.ty(), unit, printer))?;
    }
    Ok(())
}

fn label(symbol: &Symbol) -> &'static str {
    if symbol.is_argument() {
        return "parameter";
    }
    match symbol.class() {
        StorageClass::Static { .. } => "static",
        StorageClass::Register { .. } => "register",
        StorageClass::FrameOffset { .. } => "local",
        StorageClass::Constant { .. } => "constant",
        StorageClass::Label { .. } => "label",
        StorageClass::TypeAlias => "type",
        StorageClass::Block { .. } => "function",
    }
}

/// Where the value lives, with a leading space.
fn storage(class: StorageClass) -> String {
    match class {
        StorageClass::Static { address } | StorageClass::Label { address } => {
            format!(" @ 0x{:x}", address)
        }
        StorageClass::Register { register } => format!(" in r{}", register.0),
        StorageClass::FrameOffset { offset } if offset < 0 => format!(" @ fb-{}", -offset),
        StorageClass::FrameOffset { offset } => format!(" @ fb+{}", offset),
        StorageClass::Constant { value } => format!(" = {}", value),
        StorageClass::Block { begin, end } => format!(" 0x{:x}-0x{:x}", begin, end),
        StorageClass::TypeAlias => String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use parser::Register;

    #[test]
    fn storage_text() {
        assert_eq!(storage(StorageClass::Static { address: 0x2000 }), " @ 0x2000");
        assert_eq!(
            storage(StorageClass::Register {
                register: Register(5)
            }),
            " in r5"
        );
        assert_eq!(storage(StorageClass::FrameOffset { offset: -4 }), " @ fb-4");
        assert_eq!(storage(StorageClass::FrameOffset { offset: 16 }), " @ fb+16");
        assert_eq!(storage(StorageClass::Constant { value: -1 }), " = -1");
        assert_eq!(
            storage(StorageClass::Block {
                begin: 0x1000,
                end: 0x1010
            }),
            " 0x1000-0x1010"
        );
        assert_eq!(storage(StorageClass::TypeAlias), "");
    }
}
