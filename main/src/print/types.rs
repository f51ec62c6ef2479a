use parser::{ExpandedUnit, TypeId, TypeKind, TypeTable};

use crate::print::Printer;
use crate::Result;

/// Print the size and the members of a named type.
pub(crate) fn print_type_detail(
    types: &TypeTable,
    id: TypeId,
    unit: &ExpandedUnit,
    printer: &mut dyn Printer,
) -> Result<()> {
    match *types.get(id).kind() {
        TypeKind::Struct(ref val) => {
            if val.is_declaration() {
                return printer.line("declaration", b"");
            }
            print_size(types.byte_size(id), printer)?;
            for member in val.members() {
                let mut buf = format!(
                    "{} {}",
                    types.name(member.ty(), unit.language()),
                    member.name().unwrap_or("<anon>")
                );
                if let Some(bit_size) = member.bit_size() {
                    buf.push_str(&format!(" : {}", bit_size));
                }
                if member.bit_offset() % 8 == 0 {
                    printer.line_args("member", format_args!("[{}] {}", member.byte_offset(), buf))?;
                } else {
                    printer.line_args(
                        "member",
                        format_args!("[{}.{}] {}", member.byte_offset(), member.bit_offset() % 8, buf),
                    )?;
                }
            }
            Ok(())
        }
        TypeKind::Enumeration(ref val) => {
            print_size(val.byte_size(), printer)?;
            for enumerator in val.enumerators() {
                printer.line_args(
                    "enumerator",
                    format_args!("{} = {}", enumerator.name(), enumerator.value()),
                )?;
            }
            Ok(())
        }
        TypeKind::Array(ref val) => {
            print_size(types.byte_size(id), printer)?;
            match val.upper_bound() {
                Some(upper) => {
                    printer.line_args("bounds", format_args!("{}..={}", val.lower_bound(), upper))
                }
                None => printer.line_args("bounds", format_args!("{}..", val.lower_bound())),
            }
        }
        TypeKind::Placeholder | TypeKind::Function(..) => Ok(()),
        TypeKind::Base(..) | TypeKind::Modifier(..) | TypeKind::String(..) | TypeKind::Def(..) => {
            print_size(types.byte_size(id), printer)
        }
    }
}

fn print_size(size: Option<u64>, printer: &mut dyn Printer) -> Result<()> {
    match size {
        Some(size) => printer.line_args("size", format_args!("{}", size)),
        None => Ok(()),
    }
}
