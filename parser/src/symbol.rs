use crate::database::{SymbolDatabase, UnitToken};
use crate::die::DieOffset;
use crate::line::LineTable;
use crate::location::Register;
use crate::range::Range;
use crate::types::TypeId;
use crate::unit::{Language, UnitHandle};

/// Where the value of a symbol lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    /// The value is stored in memory at a fixed address.
    Static {
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
    /// The symbol is a named constant.
    Constant {
        /// The value.
        value: i64,
    },
    /// The symbol is a code label.
    Label {
        /// The address of the label.
        address: u64,
    },
    /// The symbol names a type.
    TypeAlias,
    /// The symbol is a function with code in `[begin, end)`.
    Block {
        /// The lowest address of the code.
        begin: u64,
        /// The address just past the code.
        end: u64,
    },
}

/// Identifies a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    File,
    Function,
    Block,
}

/// A named entity in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub(crate) name: String,
    pub(crate) offset: DieOffset,
    pub(crate) class: StorageClass,
    pub(crate) ty: TypeId,
    pub(crate) scope: ScopeId,
    pub(crate) is_external: bool,
    pub(crate) is_argument: bool,
}

impl Symbol {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The offset of the DIE that defined this symbol.
    #[inline]
    pub fn offset(&self) -> DieOffset {
        self.offset
    }

    #[inline]
    pub fn class(&self) -> StorageClass {
        self.class
    }

    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// The scope that owns this symbol.
    #[inline]
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Return true if the symbol is visible outside its compilation unit.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Return true if the symbol is a function parameter.
    #[inline]
    pub fn is_argument(&self) -> bool {
        self.is_argument
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub(crate) kind: ScopeKind,
    pub(crate) parent: Option<ScopeId>,
    pub(crate) name: Option<String>,
    pub(crate) low: Option<u64>,
    pub(crate) high: Option<u64>,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) children: Vec<ScopeId>,
}

impl Scope {
    pub(crate) fn new(kind: ScopeKind, parent: Option<ScopeId>, low: Option<u64>) -> Self {
        Scope {
            kind,
            parent,
            name: None,
            low,
            high: None,
            symbols: Vec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    #[inline]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// The name of the function for function scopes.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The addresses covered by the scope, if known.
    pub fn range(&self) -> Option<Range> {
        match (self.low, self.high) {
            (Some(low), Some(high)) => Range::new(low, high),
            _ => None,
        }
    }

    #[inline]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    #[inline]
    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }
}

/// The result of fully reading one compilation unit.
#[derive(Debug, Clone)]
pub struct ExpandedUnit {
    pub(crate) handle: UnitHandle,
    pub(crate) name: Option<String>,
    pub(crate) comp_dir: Option<String>,
    pub(crate) language: Language,
    pub(crate) range: Option<Range>,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) lines: LineTable,
}

impl ExpandedUnit {
    #[inline]
    pub fn handle(&self) -> UnitHandle {
        self.handle
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn comp_dir(&self) -> Option<&str> {
        self.comp_dir.as_deref()
    }

    #[inline]
    pub fn language(&self) -> Language {
        self.language
    }

    #[inline]
    pub fn range(&self) -> Option<Range> {
        self.range
    }

    #[inline]
    pub fn lines(&self) -> &LineTable {
        &self.lines
    }

    #[inline]
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// The outermost scope of the unit.
    #[inline]
    pub fn file_scope(&self) -> &Scope {
        &self.scopes[0]
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// All symbols, in scope order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.scopes.iter().flat_map(|scope| scope.symbols.iter())
    }

    /// Find a symbol by name, preferring outer scopes.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols().find(|symbol| symbol.name == name)
    }

    /// The innermost scope containing an address.
    pub fn scope_at(&self, address: u64) -> Option<ScopeId> {
        let mut found = None;
        let mut next = Some(ScopeId(0));
        while let Some(id) = next.take() {
            found = Some(id);
            for child in &self.scope(id).children {
                if let Some(range) = self.scope(*child).range() {
                    if range.contains(address) {
                        next = Some(*child);
                        break;
                    }
                }
            }
        }
        match found {
            Some(ScopeId(0)) => match self.range {
                Some(range) if range.contains(address) => found,
                _ => None,
            },
            found => found,
        }
    }

    /// The innermost function scope containing an address.
    pub fn function_at(&self, address: u64) -> Option<&Scope> {
        let mut id = self.scope_at(address);
        while let Some(scope) = id.map(|id| self.scope(id)) {
            if scope.kind == ScopeKind::Function {
                return Some(scope);
            }
            id = scope.parent;
        }
        None
    }

    /// Replay the unit into a symbol database.
    pub fn publish(&self, db: &mut dyn SymbolDatabase, unit: UnitToken) {
        self.publish_scope(db, unit, ScopeId(0));
        for row in &self.lines.rows {
            db.append_line_row(unit, *row);
        }
    }

    fn publish_scope(&self, db: &mut dyn SymbolDatabase, unit: UnitToken, id: ScopeId) {
        let scope = self.scope(id);
        let db_scope = db.open_scope(unit, scope.kind, scope.low);
        for symbol in &scope.symbols {
            let mut symbol = symbol.clone();
            symbol.scope = db_scope;
            db.add_symbol(db_scope, symbol);
        }
        for child in &scope.children {
            self.publish_scope(db, unit, *child);
        }
        db.close_scope(db_scope, scope.high);
    }
}
