use std::convert::TryFrom;
use std::rc::Rc;

use crate::diagnostic::DiagnosticKind;
use crate::die::{AttributeValue, Die, DieOffset, DieTag};
use crate::line::LineTable;
use crate::location::{self, Location};
use crate::session::ParseSession;
use crate::symbol::{ExpandedUnit, Scope, ScopeId, ScopeKind, StorageClass, Symbol};
use crate::types::{
    ArrayType, EnumerationType, Enumerator, FunctionType, Member, Primitive, StringType,
    StructKind, StructType, TypeDef, TypeId, TypeKind, TypeModifier, TypeModifierKind,
};
use crate::unit::{Language, UnitDies};
use crate::{Error, Result};

// Limit on chains of DW_AT_specification and DW_AT_abstract_origin.
const MAX_ORIGIN_DEPTH: usize = 8;

// Limit on nested scopes plus type references being built at once.
const MAX_NESTING_DEPTH: usize = 256;

/// A DIE together with the arena that owns it.
#[derive(Clone)]
struct Entry<'input> {
    unit: Rc<UnitDies<'input>>,
    index: usize,
}

impl<'input> Entry<'input> {
    fn die(&self) -> &Die<'input> {
        self.unit.get(self.index)
    }

    fn address_size(&self) -> u8 {
        self.unit.address_size()
    }

    fn children(&self) -> Vec<Entry<'input>> {
        self.unit
            .children(self.index)
            .map(|index| Entry {
                unit: self.unit.clone(),
                index,
            })
            .collect()
    }
}

/// Build the scopes and symbols of a unit whose DIEs have been loaded.
pub(crate) fn build_unit<'input>(
    session: &mut ParseSession<'input>,
    dies: Rc<UnitDies<'input>>,
) -> Result<ExpandedUnit> {
    let index = session.unit(dies.handle()).clone();
    if dies.is_empty() {
        return Err(Error::MissingLineProgram(index.display_name().into_owned()));
    }
    let root = Entry {
        unit: dies.clone(),
        index: 0,
    };
    let stmt_list = match root
        .die()
        .attr(gimli::DW_AT_stmt_list)
        .and_then(AttributeValue::udata)
    {
        Some(offset) => offset as usize,
        None => return Err(Error::MissingLineProgram(index.display_name().into_owned())),
    };
    let lines = LineTable::parse(
        session.sections.debug_line,
        stmt_list,
        dies.address_size(),
        session.sections.endian,
    )?;

    let mut file = Scope::new(ScopeKind::File, None, index.range.map(|r| r.begin));
    file.high = index.range.map(|r| r.end);
    file.name = index.name.clone();

    let mut builder = Builder::new(session, dies, index.language, file);
    for child in root.children() {
        builder.process_die(&child)?;
    }
    debug!(
        "expanded unit {}: {} scopes, {} line rows",
        index.display_name(),
        builder.scopes.len(),
        lines.rows().len()
    );
    Ok(ExpandedUnit {
        handle: index.handle,
        name: index.name,
        comp_dir: index.comp_dir,
        language: index.language,
        range: index.range,
        scopes: builder.scopes,
        lines,
    })
}

/// Build the type of the DIE at an offset, outside of any unit expansion.
pub(crate) fn build_type(session: &mut ParseSession, offset: DieOffset) -> Result<TypeId> {
    let die = session.resolve(offset)?;
    let unit = session
        .loaded_unit(die.unit)
        .ok_or(Error::UnresolvedReference(offset))?;
    let language = session.unit(die.unit).language();
    let file = Scope::new(ScopeKind::File, None, None);
    let mut builder = Builder::new(session, unit.clone(), language, file);
    builder.read_type(&Entry {
        unit,
        index: die.index,
    })
}

struct Builder<'a, 'input> {
    session: &'a mut ParseSession<'input>,
    unit: Rc<UnitDies<'input>>,
    language: Language,
    scopes: Vec<Scope>,
    current: ScopeId,
    depth: usize,
}

impl<'a, 'input> Builder<'a, 'input> {
    fn new(
        session: &'a mut ParseSession<'input>,
        unit: Rc<UnitDies<'input>>,
        language: Language,
        file: Scope,
    ) -> Self {
        Builder {
            session,
            unit,
            language,
            scopes: vec![file],
            current: ScopeId(0),
            depth: 0,
        }
    }

    /// Run `f` one level deeper, failing once the nesting limit is reached.
    fn nested<T>(
        &mut self,
        entry: &Entry<'input>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Error::NestingTooDeep(entry.die().offset));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn follow(&mut self, offset: DieOffset) -> Result<Entry<'input>> {
        let die = self.session.resolve(offset)?;
        let unit = if die.unit == self.unit.handle() {
            self.unit.clone()
        } else {
            self.session
                .loaded_unit(die.unit)
                .ok_or(Error::UnresolvedReference(offset))?
        };
        Ok(Entry {
            unit,
            index: die.index,
        })
    }

    /// Find an attribute on a DIE or on the declarations it completes.
    fn attr(
        &mut self,
        entry: &Entry<'input>,
        name: gimli::DwAt,
    ) -> Result<Option<AttributeValue<'input>>> {
        let mut entry = entry.clone();
        for _ in 0..MAX_ORIGIN_DEPTH {
            let die = entry.die();
            if let Some(value) = die.attr(name) {
                return Ok(Some(value.clone()));
            }
            let origin = die
                .attr(gimli::DW_AT_specification)
                .or_else(|| die.attr(gimli::DW_AT_abstract_origin))
                .and_then(AttributeValue::reference);
            match origin {
                Some(offset) => entry = self.follow(offset)?,
                None => return Ok(None),
            }
        }
        debug!(
            "too many origins while looking for {} at 0x{:x}",
            name,
            entry.die().offset.0
        );
        Ok(None)
    }

    fn name(&mut self, entry: &Entry<'input>) -> Result<Option<String>> {
        Ok(self
            .attr(entry, gimli::DW_AT_name)?
            .as_ref()
            .and_then(AttributeValue::string)
            .map(String::from))
    }

    fn flag(&mut self, entry: &Entry<'input>, name: gimli::DwAt) -> Result<bool> {
        Ok(match self.attr(entry, name)? {
            Some(AttributeValue::Flag(flag)) => flag,
            Some(value) => value.udata().map_or(false, |v| v != 0),
            None => false,
        })
    }

    fn type_attr(&mut self, entry: &Entry<'input>) -> Result<Option<TypeId>> {
        match self.attr(entry, gimli::DW_AT_type)? {
            Some(AttributeValue::Reference(offset)) => {
                let target = self.follow(offset)?;
                self.read_type(&target).map(Some)
            }
            Some(value) => {
                debug!(
                    "unsupported type attribute at 0x{:x}: {}",
                    entry.die().offset.0,
                    value
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// The type of a data object, which is `int` if unspecified.
    fn die_type(&mut self, entry: &Entry<'input>) -> Result<TypeId> {
        match self.type_attr(entry)? {
            Some(ty) => Ok(ty),
            None => Ok(self.session.types.default_type()),
        }
    }

    /// The type a pointer or function refers to, which is `void` if unspecified.
    fn target_type(&mut self, entry: &Entry<'input>) -> Result<TypeId> {
        match self.type_attr(entry)? {
            Some(ty) => Ok(ty),
            None => Ok(self.session.types.primitive(Primitive::Void, 0)),
        }
    }

    fn evaluate(&mut self, entry: &Entry<'input>, expression: &[u8]) -> Result<Location> {
        location::evaluate(
            expression,
            entry.address_size(),
            self.session.sections.endian,
            &mut self.session.diagnostics,
        )
    }

    fn open_scope(&mut self, kind: ScopeKind, low: Option<u64>, name: Option<String>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        let mut scope = Scope::new(kind, Some(self.current), low);
        scope.name = name;
        self.scopes.push(scope);
        self.scopes[self.current.0].children.push(id);
        self.current = id;
        id
    }

    fn close_scope(&mut self, id: ScopeId, high: Option<u64>) {
        let parent = self.scopes[id.0].parent.unwrap_or(ScopeId(0));
        self.scopes[id.0].high = high;
        self.current = parent;

        // Blocks without symbols are of no use to a debugger.
        let scope = &self.scopes[id.0];
        if scope.kind == ScopeKind::Block
            && scope.symbols.is_empty()
            && scope.children.is_empty()
            && id.0 + 1 == self.scopes.len()
        {
            self.scopes.pop();
            self.scopes[parent.0].children.pop();
        }
    }

    fn add_symbol(
        &mut self,
        offset: DieOffset,
        name: String,
        class: StorageClass,
        ty: TypeId,
        is_external: bool,
        is_argument: bool,
    ) {
        let scope = if is_external {
            ScopeId(0)
        } else {
            self.current
        };
        trace!("symbol {} at 0x{:x}: {:?}", name, offset.0, class);
        self.scopes[scope.0].symbols.push(Symbol {
            name,
            offset,
            class,
            ty,
            scope,
            is_external,
            is_argument,
        });
    }

    fn process_children(&mut self, entry: &Entry<'input>) -> Result<()> {
        for child in entry.children() {
            self.process_die(&child)?;
        }
        Ok(())
    }

    fn process_die(&mut self, entry: &Entry<'input>) -> Result<()> {
        self.nested(entry, |builder| builder.dispatch(entry))
    }

    fn dispatch(&mut self, entry: &Entry<'input>) -> Result<()> {
        match entry.die().tag {
            DieTag::Subprogram => self.read_function(entry),
            DieTag::LexicalBlock | DieTag::InlinedSubroutine => self.read_lexical_block(entry),
            DieTag::StructureType | DieTag::UnionType | DieTag::ClassType => {
                self.read_structure_scope(entry)
            }
            DieTag::EnumerationType => self.read_enumeration_scope(entry),
            DieTag::ArrayType
            | DieTag::PointerType
            | DieTag::ReferenceType
            | DieTag::ConstType
            | DieTag::VolatileType
            | DieTag::StringType
            | DieTag::BaseType
            | DieTag::SubroutineType => self.read_type(entry).map(|_| ()),
            DieTag::Variable | DieTag::FormalParameter | DieTag::Label | DieTag::Typedef => {
                self.read_symbol(entry)
            }
            DieTag::CommonBlock => self.read_common_block(entry),
            DieTag::Null
            | DieTag::Member
            | DieTag::Enumerator
            | DieTag::SubrangeType
            | DieTag::UnspecifiedParameters => Ok(()),
            DieTag::CompileUnit => {
                debug!("nested compile unit at 0x{:x}", entry.die().offset.0);
                Ok(())
            }
            DieTag::Other(tag) => {
                debug!("unknown DIE tag at 0x{:x}: {}", entry.die().offset.0, tag);
                Ok(())
            }
        }
    }

    fn read_function(&mut self, entry: &Entry<'input>) -> Result<()> {
        let die = entry.die();
        // Declarations and inlined-only functions have no code.
        let low = match die.low_pc() {
            Some(low) => low,
            None => return Ok(()),
        };
        let high = die.high_pc().unwrap_or(low);
        let name = self.name(entry)?;
        let is_external = self.flag(entry, gimli::DW_AT_external)?;
        let ty = self.read_type(entry)?;
        if let Some(name) = &name {
            let class = StorageClass::Block {
                begin: low,
                end: high,
            };
            self.add_symbol(die.offset, name.clone(), class, ty, is_external, false);
        }

        let scope = self.open_scope(ScopeKind::Function, Some(low), name);
        self.process_children(entry)?;
        self.close_scope(scope, Some(high));
        Ok(())
    }

    fn read_lexical_block(&mut self, entry: &Entry<'input>) -> Result<()> {
        let die = entry.die();
        match (die.low_pc(), die.high_pc()) {
            (Some(low), Some(high)) => {
                let scope = self.open_scope(ScopeKind::Block, Some(low), None);
                self.process_children(entry)?;
                self.close_scope(scope, Some(high));
                Ok(())
            }
            _ => self.process_children(entry),
        }
    }

    fn read_structure_scope(&mut self, entry: &Entry<'input>) -> Result<()> {
        let id = self.read_type(entry)?;
        // Nested declarations belong to the enclosing scope.
        for child in entry.children() {
            if child.die().tag != DieTag::Member {
                self.process_die(&child)?;
            }
        }
        let name = match &self.session.types.get(id).kind {
            TypeKind::Struct(ty) if !ty.declaration => ty.name.clone(),
            _ => None,
        };
        if let Some(name) = name {
            let offset = entry.die().offset;
            self.add_symbol(offset, name, StorageClass::TypeAlias, id, false, false);
        }
        Ok(())
    }

    fn read_enumeration_scope(&mut self, entry: &Entry<'input>) -> Result<()> {
        let id = self.read_type(entry)?;
        for child in entry.children() {
            let die = child.die();
            if die.tag != DieTag::Enumerator {
                continue;
            }
            if let Some(name) = die.name() {
                let value = enumerator_value(die);
                let class = StorageClass::Constant { value };
                self.add_symbol(die.offset, name.to_string(), class, id, false, false);
            }
        }
        if let Some(name) = entry.die().name() {
            let offset = entry.die().offset;
            self.add_symbol(offset, name.to_string(), StorageClass::TypeAlias, id, false, false);
        }
        Ok(())
    }

    fn read_symbol(&mut self, entry: &Entry<'input>) -> Result<()> {
        let name = match self.name(entry)? {
            Some(name) => name,
            None => return Ok(()),
        };
        let die = entry.die();
        let offset = die.offset;
        match die.tag {
            DieTag::Label => {
                if let Some(address) = die.low_pc() {
                    let ty = self.session.types.primitive(Primitive::Void, 0);
                    let class = StorageClass::Label { address };
                    self.add_symbol(offset, name, class, ty, false, false);
                }
            }
            DieTag::Typedef => {
                let ty = self.read_type(entry)?;
                self.add_symbol(offset, name, StorageClass::TypeAlias, ty, false, false);
            }
            DieTag::Variable => {
                let is_external = self.flag(entry, gimli::DW_AT_external)?;
                let class = match self.attr(entry, gimli::DW_AT_const_value)? {
                    Some(value) => match value.sdata() {
                        Some(value) => StorageClass::Constant { value },
                        None => {
                            debug!("unsupported constant value for {}: {}", name, value);
                            return Ok(());
                        }
                    },
                    None => match self.location(entry)? {
                        Some(class) => class,
                        None => return Ok(()),
                    },
                };
                let ty = self.die_type(entry)?;
                self.add_symbol(offset, name, class, ty, is_external, false);
            }
            DieTag::FormalParameter => {
                if let Some(class) = self.location(entry)? {
                    let ty = self.die_type(entry)?;
                    self.add_symbol(offset, name, class, ty, false, true);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// The storage of a variable or parameter, or `None` if it has no location.
    fn location(&mut self, entry: &Entry<'input>) -> Result<Option<StorageClass>> {
        let expression = match entry.die().attr(gimli::DW_AT_location) {
            Some(AttributeValue::Block(expression)) => *expression,
            Some(value) => {
                debug!(
                    "unsupported location at 0x{:x}: {}",
                    entry.die().offset.0,
                    value
                );
                return Ok(None);
            }
            None => return Ok(None),
        };
        Ok(Some(match self.evaluate(entry, expression)? {
            Location::Address { address } => StorageClass::Static { address },
            Location::Register { register } => StorageClass::Register { register },
            Location::FrameOffset { offset } => StorageClass::FrameOffset { offset },
            Location::Constant { value } => StorageClass::Static { address: value },
        }))
    }

    fn read_common_block(&mut self, entry: &Entry<'input>) -> Result<()> {
        let base = match entry.die().attr(gimli::DW_AT_location) {
            Some(AttributeValue::Block(expression)) => match self.evaluate(entry, expression)? {
                Location::Address { address } => address,
                Location::Constant { value } => value,
                location => {
                    debug!("unsupported common block location: {:?}", location);
                    0
                }
            },
            _ => 0,
        };
        for child in entry.children() {
            if child.die().tag != DieTag::Variable {
                continue;
            }
            let name = match child.die().name() {
                Some(name) => name.to_string(),
                None => continue,
            };
            let address = base.wrapping_add(self.member_location(&child)?);
            let ty = self.die_type(&child)?;
            let offset = child.die().offset;
            self.add_symbol(offset, name, StorageClass::Static { address }, ty, true, false);
        }
        Ok(())
    }

    fn read_type(&mut self, entry: &Entry<'input>) -> Result<TypeId> {
        if let Some(id) = self.session.types.lookup(entry.die().offset) {
            return Ok(id);
        }
        self.nested(entry, |builder| builder.read_new_type(entry))
    }

    fn read_new_type(&mut self, entry: &Entry<'input>) -> Result<TypeId> {
        let die = entry.die();
        match die.tag {
            DieTag::BaseType => Ok(self.read_base_type(entry)),
            DieTag::StructureType | DieTag::UnionType | DieTag::ClassType => {
                self.read_struct(entry)
            }
            DieTag::EnumerationType => Ok(self.read_enumeration(entry)),
            DieTag::ArrayType => self.read_array(entry),
            DieTag::PointerType => self.read_modifier(entry, TypeModifierKind::Pointer),
            DieTag::ReferenceType => self.read_modifier(entry, TypeModifierKind::Reference),
            DieTag::ConstType => self.read_modifier(entry, TypeModifierKind::Const),
            DieTag::VolatileType => self.read_modifier(entry, TypeModifierKind::Volatile),
            DieTag::StringType => Ok(self.read_string_type(entry)),
            DieTag::Typedef => self.read_typedef(entry),
            DieTag::SubroutineType | DieTag::Subprogram => self.read_function_type(entry),
            DieTag::Null
            | DieTag::CompileUnit
            | DieTag::LexicalBlock
            | DieTag::InlinedSubroutine
            | DieTag::Variable
            | DieTag::FormalParameter
            | DieTag::UnspecifiedParameters
            | DieTag::Label
            | DieTag::Member
            | DieTag::Enumerator
            | DieTag::SubrangeType
            | DieTag::CommonBlock
            | DieTag::Other(_) => {
                debug!(
                    "DIE at 0x{:x} is not a supported type: {}",
                    die.offset.0,
                    die.tag.dw_tag()
                );
                let id = self.session.types.default_type();
                self.session.types.alias(die.offset, id);
                Ok(id)
            }
        }
    }

    fn read_base_type(&mut self, entry: &Entry<'input>) -> TypeId {
        let die = entry.die();
        let encoding = die
            .attr(gimli::DW_AT_encoding)
            .and_then(AttributeValue::udata)
            .unwrap_or(0);
        let byte_size = die
            .attr(gimli::DW_AT_byte_size)
            .and_then(AttributeValue::udata)
            .unwrap_or(0);
        let encoding = match u8::try_from(encoding) {
            Ok(encoding) => gimli::DwAte(encoding),
            Err(_) => {
                debug!("unknown base type encoding at 0x{:x}: {}", die.offset.0, encoding);
                gimli::DwAte(0)
            }
        };
        let primitive = Primitive::from_encoding(encoding, byte_size);
        let id = self.session.types.primitive(primitive, byte_size);
        self.session.types.alias(die.offset, id);
        id
    }

    fn read_struct(&mut self, entry: &Entry<'input>) -> Result<TypeId> {
        let die = entry.die();
        let (id, new) = self.session.types.intern(die.offset);
        if !new {
            return Ok(id);
        }
        let kind = match die.tag {
            DieTag::UnionType => StructKind::Union,
            DieTag::ClassType => StructKind::Class,
            _ => StructKind::Struct,
        };
        let children = entry.children();
        let mut members = Vec::new();
        for child in &children {
            if child.die().tag == DieTag::Member {
                members.push(self.read_member(child)?);
            }
        }
        self.session.types.populate(
            id,
            TypeKind::Struct(StructType {
                kind,
                name: die.name().map(String::from),
                byte_size: die
                    .attr(gimli::DW_AT_byte_size)
                    .and_then(AttributeValue::udata),
                declaration: die.is_declaration() || children.is_empty(),
                members,
            }),
        );
        Ok(id)
    }

    fn read_member(&mut self, entry: &Entry<'input>) -> Result<Member> {
        let die = entry.die();
        let ty = self.die_type(entry)?;
        let mut bit_offset = self.member_location(entry)?.wrapping_mul(8);
        if let Some(offset) = die
            .attr(gimli::DW_AT_bit_offset)
            .and_then(AttributeValue::udata)
        {
            bit_offset = bit_offset.wrapping_add(offset);
        }
        Ok(Member {
            name: die.name().map(String::from),
            ty,
            bit_offset,
            bit_size: die
                .attr(gimli::DW_AT_bit_size)
                .and_then(AttributeValue::udata),
        })
    }

    /// The byte offset given by `DW_AT_data_member_location`.
    fn member_location(&mut self, entry: &Entry<'input>) -> Result<u64> {
        match entry.die().attr(gimli::DW_AT_data_member_location) {
            Some(AttributeValue::Block(expression)) => {
                match self.evaluate(entry, expression)? {
                    Location::Constant { value } => Ok(value),
                    Location::Address { address } => Ok(address),
                    location => {
                        debug!("unsupported member location: {:?}", location);
                        Ok(0)
                    }
                }
            }
            Some(value) => Ok(value.udata().unwrap_or(0)),
            None => Ok(0),
        }
    }

    fn read_enumeration(&mut self, entry: &Entry<'input>) -> TypeId {
        let die = entry.die();
        let (id, new) = self.session.types.intern(die.offset);
        if !new {
            return id;
        }
        let enumerators = entry
            .children()
            .iter()
            .map(Entry::die)
            .filter(|child| child.tag == DieTag::Enumerator)
            .filter_map(|child| {
                child.name().map(|name| Enumerator {
                    name: name.to_string(),
                    value: enumerator_value(child),
                })
            })
            .collect();
        self.session.types.populate(
            id,
            TypeKind::Enumeration(EnumerationType {
                name: die.name().map(String::from),
                byte_size: die
                    .attr(gimli::DW_AT_byte_size)
                    .and_then(AttributeValue::udata),
                enumerators,
            }),
        );
        id
    }

    fn read_array(&mut self, entry: &Entry<'input>) -> Result<TypeId> {
        let (id, new) = self.session.types.intern(entry.die().offset);
        if !new {
            return Ok(id);
        }
        let element = self.die_type(entry)?;
        let mut lower = self.language.array_lower_bound();
        let mut upper = None;
        let subranges: Vec<_> = entry
            .children()
            .into_iter()
            .filter(|child| child.die().tag == DieTag::SubrangeType)
            .collect();
        if let Some(subrange) = subranges.first() {
            if let Some(bound) = self.array_bound(subrange, gimli::DW_AT_lower_bound) {
                lower = bound;
            }
            upper = self.array_bound(subrange, gimli::DW_AT_upper_bound);
        }
        if subranges.len() > 1 {
            self.session
                .diagnostics
                .report(DiagnosticKind::ExtraArrayDimension);
        }
        self.session.types.populate(
            id,
            TypeKind::Array(ArrayType {
                element,
                lower,
                upper,
            }),
        );
        Ok(id)
    }

    fn array_bound(&mut self, entry: &Entry<'input>, name: gimli::DwAt) -> Option<i64> {
        let attribute = entry.die().attribute(name)?;
        match attribute.form {
            gimli::DW_FORM_sdata
            | gimli::DW_FORM_udata
            | gimli::DW_FORM_data1
            | gimli::DW_FORM_data2
            | gimli::DW_FORM_data4 => attribute.value.sdata(),
            form => {
                self.session
                    .diagnostics
                    .report(DiagnosticKind::UnsupportedArrayBound(form));
                None
            }
        }
    }

    fn read_modifier(&mut self, entry: &Entry<'input>, kind: TypeModifierKind) -> Result<TypeId> {
        let (id, new) = self.session.types.intern(entry.die().offset);
        if !new {
            return Ok(id);
        }
        let ty = self.target_type(entry)?;
        let byte_size = match kind {
            TypeModifierKind::Pointer | TypeModifierKind::Reference => Some(
                entry
                    .die()
                    .attr(gimli::DW_AT_byte_size)
                    .and_then(AttributeValue::udata)
                    .unwrap_or_else(|| u64::from(entry.address_size())),
            ),
            TypeModifierKind::Const | TypeModifierKind::Volatile => None,
        };
        self.session.types.populate(
            id,
            TypeKind::Modifier(TypeModifier {
                kind,
                ty,
                byte_size,
            }),
        );
        Ok(id)
    }

    fn read_string_type(&mut self, entry: &Entry<'input>) -> TypeId {
        let die = entry.die();
        let (id, new) = self.session.types.intern(die.offset);
        if new {
            let byte_length = die
                .attr(gimli::DW_AT_byte_size)
                .or_else(|| die.attr(gimli::DW_AT_string_length))
                .and_then(AttributeValue::udata)
                .unwrap_or(1);
            self.session
                .types
                .populate(id, TypeKind::String(StringType { byte_length }));
        }
        id
    }

    fn read_typedef(&mut self, entry: &Entry<'input>) -> Result<TypeId> {
        let (id, new) = self.session.types.intern(entry.die().offset);
        if !new {
            return Ok(id);
        }
        let name = self.name(entry)?.unwrap_or_default();
        let ty = self.target_type(entry)?;
        self.session
            .types
            .populate(id, TypeKind::Def(TypeDef { name, ty }));
        Ok(id)
    }

    fn read_function_type(&mut self, entry: &Entry<'input>) -> Result<TypeId> {
        let (id, new) = self.session.types.intern(entry.die().offset);
        if !new {
            return Ok(id);
        }
        let return_type = self.target_type(entry)?;
        self.session
            .types
            .populate(id, TypeKind::Function(FunctionType { return_type }));
        Ok(id)
    }
}

fn enumerator_value(die: &Die) -> i64 {
    die.attr(gimli::DW_AT_const_value)
        .and_then(AttributeValue::sdata)
        .unwrap_or(0)
}
