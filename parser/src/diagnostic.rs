use std::fmt;

use fnv::FnvHashSet as HashSet;

/// Input that was accepted with a fallback instead of failing the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// An array bound used a form other than an inline constant.
    UnsupportedArrayBound(gimli::DwForm),
    /// An array type had more than one subrange.
    ExtraArrayDimension,
    /// A location expression used an opcode outside the evaluated set.
    UnclassifiedLocation(gimli::DwOp),
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DiagnosticKind::UnsupportedArrayBound(form) => {
                write!(f, "array bound with form {} is unsupported, ignoring", form)
            }
            DiagnosticKind::ExtraArrayDimension => {
                write!(f, "multi-dimensional arrays are unsupported, ignoring extra subranges")
            }
            DiagnosticKind::UnclassifiedLocation(op) => {
                write!(f, "unclassified location opcode {}, using constant 0", op)
            }
        }
    }
}

/// Reports each kind of diagnostic once per session.
#[derive(Debug, Default)]
pub struct Diagnostics {
    seen: HashSet<DiagnosticKind>,
}

impl Diagnostics {
    /// Log the diagnostic if this kind has not been reported yet.
    ///
    /// Returns true if it was logged.
    pub fn report(&mut self, kind: DiagnosticKind) -> bool {
        if self.seen.insert(kind) {
            warn!("{}", kind);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.seen.contains(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticKind> {
        self.seen.iter()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
