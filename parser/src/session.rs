use std::rc::Rc;

use crate::abbrev::AbbreviationTable;
use crate::builder;
use crate::database::{SymbolDatabase, UnitToken};
use crate::diagnostic::Diagnostics;
use crate::die::{read_die, Die, DieOffset, PassMode, UnitContext};
use crate::file::DebugSections;
use crate::partial::{self, PartialSymbol};
use crate::reader::ByteCursor;
use crate::reference::{DieRef, ReferenceTable};
use crate::symbol::ExpandedUnit;
use crate::types::{TypeId, TypeTable};
use crate::unit::{UnitDies, UnitHandle, UnitHeader, UnitIndex};
use crate::{Error, Result};

/// A compilation unit that could not be scanned.
#[derive(Debug)]
pub struct ScanFailure {
    /// The offset of the unit header in `.debug_info`.
    pub offset: usize,
    pub error: Error,
}

/// The outcome of `ParseSession::scan`.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub units: Vec<UnitHandle>,
    pub symbols: Vec<PartialSymbol>,
    pub failures: Vec<ScanFailure>,
}

/// The state shared by all units read from one set of sections.
///
/// A session owns the abbreviation table of the unit being read, the
/// reference table, the arenas of expanded units and the type graph.
/// Dropping it releases all of them.
pub struct ParseSession<'input> {
    pub(crate) sections: DebugSections<'input>,
    abbrevs: AbbreviationTable,
    refs: ReferenceTable,
    units: Vec<UnitIndex>,
    tokens: Vec<Option<UnitToken>>,
    arenas: Vec<Option<Rc<UnitDies<'input>>>>,
    pub(crate) types: TypeTable,
    pub(crate) diagnostics: Diagnostics,
}

impl<'input> ParseSession<'input> {
    pub fn new(sections: DebugSections<'input>) -> Self {
        ParseSession {
            sections,
            abbrevs: AbbreviationTable::default(),
            refs: ReferenceTable::default(),
            units: Vec::new(),
            tokens: Vec::new(),
            arenas: Vec::new(),
            types: TypeTable::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    #[inline]
    pub fn sections(&self) -> &DebugSections<'input> {
        &self.sections
    }

    /// The units indexed so far.
    #[inline]
    pub fn units(&self) -> &[UnitIndex] {
        &self.units
    }

    #[inline]
    pub fn unit(&self, handle: UnitHandle) -> &UnitIndex {
        &self.units[handle.0]
    }

    #[inline]
    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    #[inline]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The abbreviation table of the unit read most recently.
    #[inline]
    pub fn abbrevs(&self) -> &AbbreviationTable {
        &self.abbrevs
    }

    /// The unit whose address range contains an address.
    pub fn find_unit_for_address(&self, address: u64) -> Option<UnitHandle> {
        self.units
            .iter()
            .find(|unit| unit.range.map(|r| r.contains(address)).unwrap_or(false))
            .map(UnitIndex::handle)
    }

    /// The unit whose DIEs contain an offset.
    pub fn find_unit_for_offset(&self, offset: DieOffset) -> Option<UnitHandle> {
        self.units
            .iter()
            .find(|unit| unit.contains(offset))
            .map(UnitIndex::handle)
    }

    /// Scan every unit in `.debug_info` and register it with `db`.
    ///
    /// A unit that fails to scan is reported in the returned failures and
    /// skipped; the scan continues with the next unit as long as the
    /// failed unit's length could be read. Scanning again starts over.
    pub fn scan(&mut self, db: &mut dyn SymbolDatabase) -> ScanReport {
        self.units.clear();
        self.tokens.clear();
        self.arenas.clear();
        self.refs = ReferenceTable::default();

        let mut report = ScanReport::default();
        let mut cursor = ByteCursor::new(self.sections.debug_info, self.sections.endian);
        while !cursor.is_empty() {
            let start = cursor.offset();
            match self.scan_unit(&mut cursor) {
                Ok((index, symbols)) => {
                    let token = db.register_lazy_unit(index.handle, index.name(), index.range);
                    for symbol in &symbols {
                        db.add_partial_symbol(token, symbol);
                    }
                    self.tokens[index.handle.0] = Some(token);
                    report.units.push(index.handle);
                    report.symbols.extend(symbols);
                }
                Err(error) => {
                    warn!("skipping compilation unit at 0x{:x}: {}", start, error);
                    report.failures.push(ScanFailure {
                        offset: start,
                        error,
                    });
                }
            }
            if cursor.offset() == start {
                break;
            }
        }
        debug!(
            "scanned {} units with {} partial symbols",
            report.units.len(),
            report.symbols.len()
        );
        report
    }

    /// Index the unit at the cursor and collect its partial symbols.
    ///
    /// On return the cursor is positioned after the unit, whether or not
    /// the unit was indexed.
    pub fn scan_unit(
        &mut self,
        cursor: &mut ByteCursor<'input>,
    ) -> Result<(UnitIndex, Vec<PartialSymbol>)> {
        let header = match UnitHeader::read(cursor) {
            Ok(header) => header,
            Err(e) => {
                let end = cursor.end();
                cursor.seek(end)?;
                return Err(e);
            }
        };
        if header.end() < header.first_die() {
            // The next unit cannot be located either.
            let end = cursor.end();
            cursor.seek(end)?;
            return Err(Error::TruncatedInput {
                offset: header.offset,
                wanted: UnitHeader::SIZE,
            });
        }
        let end = header.end().min(cursor.end());
        cursor.seek(end)?;
        if header.end() > self.sections.debug_info.len() {
            return Err(Error::TruncatedInput {
                offset: header.offset,
                wanted: header.length as usize + 4,
            });
        }
        header.validate()?;

        let handle = UnitHandle(self.units.len());
        let dies = self.read_dies(&header, handle, PassMode::Partial)?;
        let (summary, symbols) =
            partial::scan_dies(&dies, self.sections.endian, &mut self.diagnostics)?;
        let index = UnitIndex {
            handle,
            header,
            name: summary.name,
            comp_dir: summary.comp_dir,
            language: summary.language,
            range: summary.range,
        };
        trace!(
            "indexed unit {} at 0x{:x}: {} DIEs",
            index.display_name(),
            header.offset,
            dies.len()
        );
        self.units.push(index.clone());
        self.tokens.push(None);
        self.arenas.push(None);
        Ok((index, symbols))
    }

    fn read_dies(
        &mut self,
        header: &UnitHeader,
        handle: UnitHandle,
        mode: PassMode,
    ) -> Result<UnitDies<'input>> {
        self.abbrevs = AbbreviationTable::load(
            self.sections.debug_abbrev,
            header.abbrev_offset,
            self.sections.endian,
        )?;
        let context = UnitContext {
            offset: header.offset,
            address_size: header.address_size,
            debug_str: self.sections.debug_str,
        };
        let mut cursor = ByteCursor::with_range(
            self.sections.debug_info,
            header.first_die(),
            header.end(),
            self.sections.endian,
        );
        let mut dies = Vec::new();
        while !cursor.is_empty() {
            dies.push(read_die(&mut cursor, &self.abbrevs, &context, mode)?);
        }
        Ok(UnitDies::new(handle, header.address_size, dies))
    }

    /// The full DIE arena of a unit, reading it if necessary.
    pub(crate) fn load_unit(&mut self, handle: UnitHandle) -> Result<Rc<UnitDies<'input>>> {
        if let Some(dies) = &self.arenas[handle.0] {
            return Ok(dies.clone());
        }
        let header = self.units[handle.0].header;
        let dies = self.read_dies(&header, handle, PassMode::Full)?;
        for (index, die) in dies.dies().iter().enumerate() {
            if !die.is_null() {
                self.refs.record(die.offset, DieRef { unit: handle, index });
            }
        }
        debug!(
            "loaded {} DIEs for unit {}",
            dies.len(),
            self.units[handle.0].display_name()
        );
        let dies = Rc::new(dies);
        self.arenas[handle.0] = Some(dies.clone());
        Ok(dies)
    }

    /// The arena of a unit that has already been loaded.
    pub(crate) fn loaded_unit(&self, handle: UnitHandle) -> Option<Rc<UnitDies<'input>>> {
        self.arenas.get(handle.0).and_then(Clone::clone)
    }

    /// Find the DIE at an offset, loading the unit that holds it if needed.
    pub(crate) fn resolve(&mut self, offset: DieOffset) -> Result<DieRef> {
        if let Some(die) = self.refs.resolve(offset) {
            return Ok(die);
        }
        match self.find_unit_for_offset(offset) {
            Some(handle) if self.arenas[handle.0].is_none() => {
                self.load_unit(handle)?;
                self.refs
                    .resolve(offset)
                    .ok_or(Error::UnresolvedReference(offset))
            }
            _ => Err(Error::UnresolvedReference(offset)),
        }
    }

    /// A DIE that has been read in full, if any.
    pub fn die(&self, offset: DieOffset) -> Option<&Die<'input>> {
        let die = self.refs.resolve(offset)?;
        let dies = self.arenas.get(die.unit.0)?.as_ref()?;
        Some(dies.get(die.index))
    }

    /// Read the full contents of a unit.
    ///
    /// If the unit cannot be read, every type created for it is discarded
    /// and the error names the unit. Other units are unaffected.
    pub fn expand_unit(&mut self, handle: UnitHandle) -> Result<ExpandedUnit> {
        let checkpoint = self.types.checkpoint();
        let was_loaded = self.arenas[handle.0].is_some();
        let result = match self.load_unit(handle) {
            Ok(dies) => builder::build_unit(self, dies),
            Err(e) => Err(e),
        };
        result.map_err(|cause| {
            self.types.rollback(checkpoint);
            if !was_loaded {
                self.arenas[handle.0] = None;
                self.refs.forget_unit(handle);
            }
            let name = self.units[handle.0].display_name().into_owned();
            warn!("expanding unit {} failed: {}", name, cause);
            Error::UnitUnavailable {
                name,
                cause: Box::new(cause),
            }
        })
    }

    /// Expand a unit and publish it to `db`.
    ///
    /// Units not registered by `scan` are registered first.
    pub fn expand_unit_into(
        &mut self,
        handle: UnitHandle,
        db: &mut dyn SymbolDatabase,
    ) -> Result<ExpandedUnit> {
        let unit = self.expand_unit(handle)?;
        let token = match self.tokens[handle.0] {
            Some(token) => token,
            None => {
                let index = &self.units[handle.0];
                let token = db.register_lazy_unit(handle, index.name(), index.range);
                self.tokens[handle.0] = Some(token);
                token
            }
        };
        unit.publish(db, token);
        Ok(unit)
    }

    /// Build the type for the DIE at an offset.
    pub fn intern_type(&mut self, offset: DieOffset) -> Result<TypeId> {
        let checkpoint = self.types.checkpoint();
        builder::build_type(self, offset).map_err(|e| {
            self.types.rollback(checkpoint);
            e
        })
    }
}
