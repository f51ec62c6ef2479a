use crate::line::LineRow;
use crate::partial::PartialSymbol;
use crate::range::Range;
use crate::symbol::{ScopeId, ScopeKind, Symbol};
use crate::unit::UnitHandle;

/// Identifies a compilation unit within a symbol database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitToken(pub usize);

/// The host that receives the symbols read by a parse session.
///
/// Scopes are opened and closed in strict nesting order.
pub trait SymbolDatabase {
    /// Record a compilation unit that can be expanded later.
    fn register_lazy_unit(
        &mut self,
        handle: UnitHandle,
        name: Option<&str>,
        range: Option<Range>,
    ) -> UnitToken;

    fn add_partial_symbol(&mut self, _unit: UnitToken, _symbol: &PartialSymbol) {}

    fn open_scope(&mut self, unit: UnitToken, kind: ScopeKind, low_address: Option<u64>)
        -> ScopeId;

    fn add_symbol(&mut self, scope: ScopeId, symbol: Symbol);

    fn close_scope(&mut self, scope: ScopeId, high_address: Option<u64>);

    fn append_line_row(&mut self, unit: UnitToken, row: LineRow);
}

/// A compilation unit in a `SymbolStore`.
#[derive(Debug, Clone)]
pub struct StoredUnit {
    pub handle: UnitHandle,
    pub name: Option<String>,
    pub range: Option<Range>,
    pub partial_symbols: Vec<PartialSymbol>,
    /// The file scope, once the unit has been expanded.
    pub file_scope: Option<ScopeId>,
    pub lines: Vec<LineRow>,
}

/// A scope in a `SymbolStore`.
#[derive(Debug, Clone)]
pub struct StoredScope {
    pub unit: UnitToken,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub low: Option<u64>,
    pub high: Option<u64>,
    pub symbols: Vec<Symbol>,
}

/// An in-memory symbol database.
#[derive(Debug, Default)]
pub struct SymbolStore {
    units: Vec<StoredUnit>,
    scopes: Vec<StoredScope>,
    open: Vec<ScopeId>,
}

impl SymbolStore {
    pub fn new() -> Self {
        SymbolStore::default()
    }

    pub fn units(&self) -> &[StoredUnit] {
        &self.units
    }

    pub fn unit(&self, token: UnitToken) -> &StoredUnit {
        &self.units[token.0]
    }

    pub fn scope(&self, id: ScopeId) -> &StoredScope {
        &self.scopes[id.0]
    }

    pub fn scopes(&self) -> &[StoredScope] {
        &self.scopes
    }

    /// Return true if the unit has been published in full.
    pub fn is_expanded(&self, token: UnitToken) -> bool {
        self.units[token.0].file_scope.is_some()
    }

    /// Find an expanded symbol by name.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .flat_map(|scope| scope.symbols.iter())
            .find(|symbol| symbol.name() == name)
    }

    /// Find a partial symbol by name.
    pub fn lookup_partial(&self, name: &str) -> Option<(UnitToken, &PartialSymbol)> {
        self.units.iter().enumerate().find_map(|(index, unit)| {
            unit.partial_symbols
                .iter()
                .find(|symbol| symbol.name() == name)
                .map(|symbol| (UnitToken(index), symbol))
        })
    }

    /// The unit whose address range contains an address.
    pub fn unit_for_address(&self, address: u64) -> Option<UnitToken> {
        self.units
            .iter()
            .position(|unit| unit.range.map(|r| r.contains(address)).unwrap_or(false))
            .map(UnitToken)
    }
}

impl SymbolDatabase for SymbolStore {
    fn register_lazy_unit(
        &mut self,
        handle: UnitHandle,
        name: Option<&str>,
        range: Option<Range>,
    ) -> UnitToken {
        self.units.push(StoredUnit {
            handle,
            name: name.map(String::from),
            range,
            partial_symbols: Vec::new(),
            file_scope: None,
            lines: Vec::new(),
        });
        UnitToken(self.units.len() - 1)
    }

    fn add_partial_symbol(&mut self, unit: UnitToken, symbol: &PartialSymbol) {
        self.units[unit.0].partial_symbols.push(symbol.clone());
    }

    fn open_scope(&mut self, unit: UnitToken, kind: ScopeKind, low_address: Option<u64>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        let parent = self.open.last().cloned();
        self.scopes.push(StoredScope {
            unit,
            kind,
            parent,
            low: low_address,
            high: None,
            symbols: Vec::new(),
        });
        if parent.is_none() {
            self.units[unit.0].file_scope = Some(id);
        }
        self.open.push(id);
        id
    }

    fn add_symbol(&mut self, scope: ScopeId, symbol: Symbol) {
        self.scopes[scope.0].symbols.push(symbol);
    }

    fn close_scope(&mut self, scope: ScopeId, high_address: Option<u64>) {
        debug_assert_eq!(self.open.last(), Some(&scope));
        self.open.pop();
        self.scopes[scope.0].high = high_address;
    }

    fn append_line_row(&mut self, unit: UnitToken, row: LineRow) {
        self.units[unit.0].lines.push(row);
    }
}
