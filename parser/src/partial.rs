use gimli::RunTimeEndian;

use crate::diagnostic::Diagnostics;
use crate::die::{AttributeValue, Die, DieTag};
use crate::location::{self, Location};
use crate::range::Range;
use crate::unit::{Language, UnitDies, UnitHandle};
use crate::Result;

/// The coarse kind of a partial symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartialKind {
    Function,
    Variable,
    Typedef,
    Struct,
    Union,
    Class,
    Enumeration,
}

impl PartialKind {
    /// Return true if the symbol names a type.
    pub fn is_type(self) -> bool {
        match self {
            PartialKind::Function | PartialKind::Variable => false,
            PartialKind::Typedef
            | PartialKind::Struct
            | PartialKind::Union
            | PartialKind::Class
            | PartialKind::Enumeration => true,
        }
    }
}

/// A symbol found without expanding its compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSymbol {
    pub(crate) name: String,
    pub(crate) kind: PartialKind,
    pub(crate) range: Option<Range>,
    pub(crate) address: Option<u64>,
    pub(crate) is_external: bool,
    pub(crate) unit: UnitHandle,
}

impl PartialSymbol {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> PartialKind {
        self.kind
    }

    /// The code range of a function.
    #[inline]
    pub fn range(&self) -> Option<Range> {
        self.range
    }

    /// The static address of a variable.
    #[inline]
    pub fn address(&self) -> Option<u64> {
        self.address
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// The compilation unit to expand for full details.
    #[inline]
    pub fn unit(&self) -> UnitHandle {
        self.unit
    }
}

/// The attributes of a compilation unit DIE.
#[derive(Debug, Default)]
pub(crate) struct UnitSummary {
    pub name: Option<String>,
    pub comp_dir: Option<String>,
    pub language: Language,
    pub range: Option<Range>,
}

struct Scanner<'a> {
    unit: UnitHandle,
    address_size: u8,
    endian: RunTimeEndian,
    language: Language,
    diagnostics: &'a mut Diagnostics,
    symbols: Vec<PartialSymbol>,
    // The lowest and highest addresses of all subprograms.
    low: Option<u64>,
    high: Option<u64>,
}

/// Build the partial symbols of a unit read with `PassMode::Partial`.
pub(crate) fn scan_dies(
    dies: &UnitDies,
    endian: RunTimeEndian,
    diagnostics: &mut Diagnostics,
) -> Result<(UnitSummary, Vec<PartialSymbol>)> {
    let mut summary = UnitSummary::default();
    if dies.is_empty() {
        return Ok((summary, Vec::new()));
    }

    let root = dies.get(0);
    if root.tag != DieTag::CompileUnit {
        debug!("unexpected unit tag: {}", root.tag.dw_tag());
    }
    summary.name = root.name().map(String::from);
    summary.comp_dir = root
        .attr(gimli::DW_AT_comp_dir)
        .and_then(AttributeValue::string)
        .map(String::from);
    summary.language = root
        .attr(gimli::DW_AT_language)
        .and_then(AttributeValue::udata)
        .map(|lang| Language::from(gimli::DwLang(lang as u16)))
        .unwrap_or_default();

    let mut scanner = Scanner {
        unit: dies.handle(),
        address_size: dies.address_size(),
        endian,
        language: summary.language,
        diagnostics,
        symbols: Vec::new(),
        low: None,
        high: None,
    };
    scanner.scan_children(dies, 0, 1)?;

    summary.range = match (root.low_pc(), root.high_pc()) {
        (Some(low), Some(high)) => Range::new(low, high),
        _ => match (scanner.low, scanner.high) {
            (Some(low), Some(high)) => Range::new(low, high),
            _ => None,
        },
    };
    Ok((summary, scanner.symbols))
}

impl<'a> Scanner<'a> {
    /// Visit the descendants of `parent` in DIE order.
    fn scan_children(&mut self, dies: &UnitDies, parent: usize, depth: usize) -> Result<()> {
        let mut pending: Vec<(usize, usize)> = Vec::new();
        push_children(&mut pending, dies, parent, depth);
        while let Some((index, depth)) = pending.pop() {
            self.scan_die(dies.get(index), depth)?;
            push_children(&mut pending, dies, index, depth + 1);
        }
        Ok(())
    }

    fn scan_die(&mut self, die: &Die, depth: usize) -> Result<()> {
        let kind = match die.tag {
            DieTag::Subprogram => PartialKind::Function,
            DieTag::Variable => PartialKind::Variable,
            DieTag::Typedef => PartialKind::Typedef,
            DieTag::StructureType => PartialKind::Struct,
            DieTag::UnionType => PartialKind::Union,
            DieTag::ClassType => PartialKind::Class,
            DieTag::EnumerationType => PartialKind::Enumeration,
            _ => return Ok(()),
        };

        let mut range = None;
        if kind == PartialKind::Function {
            if let (Some(low), Some(high)) = (die.low_pc(), die.high_pc()) {
                range = Range::new(low, high);
                if range.is_some() {
                    self.low = Some(self.low.map_or(low, |x| x.min(low)));
                    self.high = Some(self.high.map_or(high, |x| x.max(high)));
                }
            }
        }

        let name = match die.name() {
            Some(name) => name,
            None => return Ok(()),
        };
        let is_external = die.is_external();
        if !(is_external || depth == 1) || die.is_declaration() {
            return Ok(());
        }

        let mut address = None;
        if kind == PartialKind::Variable {
            if let Some(block) = die.attr(gimli::DW_AT_location).and_then(AttributeValue::block) {
                let location =
                    location::evaluate(block, self.address_size, self.endian, self.diagnostics)?;
                if let Location::Address { address: a } = location {
                    address = Some(a);
                }
            }
        }

        self.symbols.push(PartialSymbol {
            name: name.to_string(),
            kind,
            range,
            address,
            is_external,
            unit: self.unit,
        });
        // C++ makes struct tags usable as type names.
        if self.language == Language::CPlusPlus && kind.is_type() && kind != PartialKind::Typedef {
            self.symbols.push(PartialSymbol {
                name: name.to_string(),
                kind: PartialKind::Typedef,
                range: None,
                address: None,
                is_external,
                unit: self.unit,
            });
        }
        Ok(())
    }
}

// Pushed in reverse so that the first child is popped first.
fn push_children(
    pending: &mut Vec<(usize, usize)>,
    dies: &UnitDies,
    parent: usize,
    depth: usize,
) {
    let start = pending.len();
    pending.extend(dies.children(parent).map(|index| (index, depth)));
    pending[start..].reverse();
}
