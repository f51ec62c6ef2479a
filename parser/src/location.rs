use gimli::RunTimeEndian;

use crate::diagnostic::{DiagnosticKind, Diagnostics};
use crate::reader::ByteCursor;
use crate::Result;

/// A register number.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(pub u16);

/// The classified storage of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// The value is stored in memory at an absolute address.
    Address {
        /// The address.
        address: u64,
    },
    /// The value is stored in a register.
    Register {
        /// The register number.
        register: Register,
    },
    /// The value is stored in memory at an offset from the frame base.
    FrameOffset {
        /// The offset.
        offset: i64,
    },
    /// A constant, such as a member offset.
    ///
    /// Expressions that could not be classified also evaluate to a zero constant.
    Constant {
        /// The value.
        value: u64,
    },
}

/// Classify a location expression.
///
/// Only the opcodes needed to place variables and members are understood:
/// `DW_OP_reg0`..`DW_OP_reg31`, `DW_OP_regx`, `DW_OP_fbreg`, `DW_OP_breg31`,
/// `DW_OP_addr`, `DW_OP_constu`, `DW_OP_plus` and `DW_OP_plus_uconst`. Any
/// other opcode ends evaluation with a zero constant and a diagnostic.
///
/// `DW_OP_breg31` is treated as frame relative, since some compilers use
/// register 31 as the frame pointer.
pub fn evaluate(
    expression: &[u8],
    address_size: u8,
    endian: RunTimeEndian,
    diagnostics: &mut Diagnostics,
) -> Result<Location> {
    let mut cursor = ByteCursor::new(expression, endian);
    let mut location = Location::Constant { value: 0 };
    while !cursor.is_empty() {
        let op = gimli::DwOp(cursor.read_u8()?);
        location = match op {
            op if op.0 >= gimli::DW_OP_reg0.0 && op.0 <= gimli::DW_OP_reg31.0 => {
                Location::Register {
                    register: Register(u16::from(op.0 - gimli::DW_OP_reg0.0)),
                }
            }
            gimli::DW_OP_regx => Location::Register {
                register: Register(cursor.read_uleb128()? as u16),
            },
            gimli::DW_OP_fbreg | gimli::DW_OP_breg31 => Location::FrameOffset {
                offset: cursor.read_sleb128()?,
            },
            gimli::DW_OP_addr => Location::Address {
                address: cursor.read_address(address_size)?,
            },
            gimli::DW_OP_constu => Location::Constant {
                value: cursor.read_uleb128()?,
            },
            // The base address that the constant is added to is implicit.
            gimli::DW_OP_plus => location,
            gimli::DW_OP_plus_uconst => {
                let addend = cursor.read_uleb128()?;
                match location {
                    Location::Constant { value } => Location::Constant {
                        value: value.wrapping_add(addend),
                    },
                    Location::Address { address } => Location::Address {
                        address: address.wrapping_add(addend),
                    },
                    Location::FrameOffset { offset } => Location::FrameOffset {
                        offset: offset.wrapping_add(addend as i64),
                    },
                    Location::Register { .. } => {
                        return Ok(unclassified(op, diagnostics));
                    }
                }
            }
            _ => return Ok(unclassified(op, diagnostics)),
        };
    }
    Ok(location)
}

fn unclassified(op: gimli::DwOp, diagnostics: &mut Diagnostics) -> Location {
    debug!("unclassified location opcode: {}", op);
    diagnostics.report(DiagnosticKind::UnclassifiedLocation(op));
    Location::Constant { value: 0 }
}

#[cfg(test)]
mod test {
    use super::*;

    fn eval(expression: &[u8]) -> (Location, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        let location = evaluate(expression, 4, RunTimeEndian::Little, &mut diagnostics).unwrap();
        (location, diagnostics)
    }

    #[test]
    fn registers() {
        assert_eq!(
            eval(&[0x55]).0,
            Location::Register {
                register: Register(5)
            }
        );
        assert_eq!(
            eval(&[0x90, 0x21]).0,
            Location::Register {
                register: Register(33)
            }
        );
    }

    #[test]
    fn frame_offset() {
        assert_eq!(eval(&[0x91, 0x7c]).0, Location::FrameOffset { offset: -4 });
        // DW_OP_breg31 -8
        let (location, diagnostics) = eval(&[0x8f, 0x78]);
        assert_eq!(location, Location::FrameOffset { offset: -8 });
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn address() {
        assert_eq!(
            eval(&[0x03, 0x00, 0x20, 0x00, 0x00]).0,
            Location::Address { address: 0x2000 }
        );
    }

    #[test]
    fn member_offsets() {
        assert_eq!(eval(&[0x23, 0x08]).0, Location::Constant { value: 8 });
        assert_eq!(eval(&[0x10, 0x0c, 0x22]).0, Location::Constant { value: 12 });
        assert_eq!(eval(&[]).0, Location::Constant { value: 0 });
    }

    #[test]
    fn unclassified_opcode() {
        // DW_OP_breg5 0
        let (location, diagnostics) = eval(&[0x75, 0x00]);
        assert_eq!(location, Location::Constant { value: 0 });
        assert!(diagnostics.contains(DiagnosticKind::UnclassifiedLocation(gimli::DW_OP_breg5)));
    }

    #[test]
    fn truncated_operand() {
        let mut diagnostics = Diagnostics::default();
        assert!(evaluate(&[0x03, 0x00], 4, RunTimeEndian::Little, &mut diagnostics).is_err());
    }
}
