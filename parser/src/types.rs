use fnv::FnvHashMap as HashMap;

use crate::die::DieOffset;
use crate::unit::Language;

// Limit on nested types followed when naming or sizing a type.
const MAX_DEPTH: usize = 32;

/// The index of a type in a `TypeTable`.
///
/// Two DIEs that resolve to the same type node have equal ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(usize);

impl TypeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// The fixed set of primitive types that base type DIEs map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// An address-like value with no further meaning.
    Void,
    Boolean,
    Float,
    Double,
    Complex,
    DoubleComplex,
    Char,
    Short,
    Int,
    LongLong,
    UnsignedChar,
    UnsignedShort,
    UnsignedInt,
    UnsignedLongLong,
}

impl Primitive {
    /// Map a base type encoding and byte size to a primitive.
    pub fn from_encoding(encoding: gimli::DwAte, byte_size: u64) -> Primitive {
        match encoding {
            gimli::DW_ATE_address => Primitive::Void,
            gimli::DW_ATE_boolean => Primitive::Boolean,
            gimli::DW_ATE_complex_float => {
                if byte_size == 16 {
                    Primitive::DoubleComplex
                } else {
                    Primitive::Complex
                }
            }
            gimli::DW_ATE_float => {
                if byte_size == 8 {
                    Primitive::Double
                } else {
                    Primitive::Float
                }
            }
            gimli::DW_ATE_signed => match byte_size {
                1 => Primitive::Char,
                2 => Primitive::Short,
                8 => Primitive::LongLong,
                _ => Primitive::Int,
            },
            gimli::DW_ATE_signed_char => Primitive::Char,
            gimli::DW_ATE_unsigned => match byte_size {
                1 => Primitive::UnsignedChar,
                2 => Primitive::UnsignedShort,
                8 => Primitive::UnsignedLongLong,
                _ => Primitive::UnsignedInt,
            },
            gimli::DW_ATE_unsigned_char => Primitive::UnsignedChar,
            _ => Primitive::Int,
        }
    }

    /// The name of the primitive in a language.
    pub fn name(self, language: Language) -> &'static str {
        if language == Language::Fortran {
            match self {
                Primitive::Boolean => return "logical",
                Primitive::Float => return "real",
                Primitive::Double => return "double precision",
                Primitive::Complex => return "complex",
                Primitive::DoubleComplex => return "double complex",
                Primitive::Int => return "integer",
                _ => {}
            }
        }
        match self {
            Primitive::Void => "void",
            Primitive::Boolean => match language {
                Language::C => "_Bool",
                _ => "bool",
            },
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Complex => "complex",
            Primitive::DoubleComplex => "double complex",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::LongLong => "long long",
            Primitive::UnsignedChar => "unsigned char",
            Primitive::UnsignedShort => "unsigned short",
            Primitive::UnsignedInt => "unsigned int",
            Primitive::UnsignedLongLong => "unsigned long long",
        }
    }
}

/// The kind of a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// A type whose DIE is still being read.
    Placeholder,
    /// A base type.
    Base(BaseType),
    /// A type that is obtained by adding a modifier to another type.
    Modifier(TypeModifier),
    /// A type for an array of elements.
    Array(ArrayType),
    /// A fixed length string.
    String(StringType),
    /// A struct, union or class type.
    Struct(StructType),
    /// An enumeration type.
    Enumeration(EnumerationType),
    /// A function type.
    Function(FunctionType),
    /// A type alias definition.
    Def(TypeDef),
}

/// A node of the type graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub(crate) offset: Option<DieOffset>,
    pub(crate) kind: TypeKind,
}

impl Type {
    /// The offset of the DIE this type was read from.
    ///
    /// Shared primitive types have no single originating DIE.
    #[inline]
    pub fn offset(&self) -> Option<DieOffset> {
        self.offset
    }

    #[inline]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Return true if the DIE for this type has not been fully read.
    pub fn is_placeholder(&self) -> bool {
        match self.kind {
            TypeKind::Placeholder => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseType {
    pub(crate) primitive: Primitive,
    pub(crate) byte_size: u64,
}

impl BaseType {
    #[inline]
    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    #[inline]
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }
}

/// The kind of a type modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeModifierKind {
    /// The resulting type is a pointer to the type being modified.
    Pointer,
    /// The resulting type is a reference to the type being modified.
    Reference,
    /// The resulting type is a constant.
    Const,
    /// The resulting type is volatile.
    Volatile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeModifier {
    pub(crate) kind: TypeModifierKind,
    pub(crate) ty: TypeId,
    pub(crate) byte_size: Option<u64>,
}

impl TypeModifier {
    #[inline]
    pub fn kind(&self) -> TypeModifierKind {
        self.kind
    }

    /// The type being modified.
    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// The size of a pointer or reference.
    #[inline]
    pub fn byte_size(&self) -> Option<u64> {
        self.byte_size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayType {
    pub(crate) element: TypeId,
    pub(crate) lower: i64,
    pub(crate) upper: Option<i64>,
}

impl ArrayType {
    #[inline]
    pub fn element(&self) -> TypeId {
        self.element
    }

    #[inline]
    pub fn lower_bound(&self) -> i64 {
        self.lower
    }

    /// The inclusive upper bound, if known.
    #[inline]
    pub fn upper_bound(&self) -> Option<i64> {
        self.upper
    }

    /// The number of elements, if known and representable.
    pub fn count(&self) -> Option<u64> {
        let upper = self.upper?;
        if upper < self.lower {
            return Some(0);
        }
        // Exact when `upper >= lower`, even if the signed difference overflows.
        (upper.wrapping_sub(self.lower) as u64).checked_add(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringType {
    pub(crate) byte_length: u64,
}

impl StringType {
    #[inline]
    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKind {
    Struct,
    Union,
    Class,
}

impl StructKind {
    fn keyword(self) -> &'static str {
        match self {
            StructKind::Struct => "struct",
            StructKind::Union => "union",
            StructKind::Class => "class",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructType {
    pub(crate) kind: StructKind,
    pub(crate) name: Option<String>,
    pub(crate) byte_size: Option<u64>,
    pub(crate) declaration: bool,
    pub(crate) members: Vec<Member>,
}

impl StructType {
    #[inline]
    pub fn kind(&self) -> StructKind {
        self.kind
    }

    /// The name of the type.
    ///
    /// If none, then this is an anonymous type.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn byte_size(&self) -> Option<u64> {
        self.byte_size
    }

    /// Return true if this is a declaration without any members.
    #[inline]
    pub fn is_declaration(&self) -> bool {
        self.declaration
    }

    #[inline]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name() == Some(name))
    }
}

/// A member of a struct, union or class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub(crate) name: Option<String>,
    pub(crate) ty: TypeId,
    pub(crate) bit_offset: u64,
    pub(crate) bit_size: Option<u64>,
}

impl Member {
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// The offset in bits from the start of the containing type.
    #[inline]
    pub fn bit_offset(&self) -> u64 {
        self.bit_offset
    }

    /// The offset in whole bytes from the start of the containing type.
    #[inline]
    pub fn byte_offset(&self) -> u64 {
        self.bit_offset / 8
    }

    /// The size in bits of a bit field.
    #[inline]
    pub fn bit_size(&self) -> Option<u64> {
        self.bit_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationType {
    pub(crate) name: Option<String>,
    pub(crate) byte_size: Option<u64>,
    pub(crate) enumerators: Vec<Enumerator>,
}

impl EnumerationType {
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn byte_size(&self) -> Option<u64> {
        self.byte_size
    }

    #[inline]
    pub fn enumerators(&self) -> &[Enumerator] {
        &self.enumerators
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator {
    pub(crate) name: String,
    pub(crate) value: i64,
}

impl Enumerator {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }
}

/// A function type.
///
/// Parameters are not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionType {
    pub(crate) return_type: TypeId,
}

impl FunctionType {
    #[inline]
    pub fn return_type(&self) -> TypeId {
        self.return_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub(crate) name: String,
    pub(crate) ty: TypeId,
}

impl TypeDef {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The aliased type.
    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }
}

/// A position in a `TypeTable` that it can be rolled back to.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint(usize);

/// The type graph of a parse session.
///
/// Types are memoized on the offset of the DIE they were read from, so
/// every reference to a DIE yields the same `TypeId`.
#[derive(Debug, Default)]
pub struct TypeTable {
    types: Vec<Type>,
    by_offset: HashMap<DieOffset, TypeId>,
    primitives: HashMap<(Primitive, u64), TypeId>,
}

impl TypeTable {
    #[inline]
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// The type already read for a DIE.
    pub fn lookup(&self, offset: DieOffset) -> Option<TypeId> {
        self.by_offset.get(&offset).cloned()
    }

    /// Return the type for a DIE, reserving a placeholder if it is new.
    ///
    /// The second value is true if a placeholder was reserved, in which
    /// case the caller must `populate` it.
    pub fn intern(&mut self, offset: DieOffset) -> (TypeId, bool) {
        if let Some(id) = self.lookup(offset) {
            return (id, false);
        }
        let id = TypeId(self.types.len());
        self.types.push(Type {
            offset: Some(offset),
            kind: TypeKind::Placeholder,
        });
        self.by_offset.insert(offset, id);
        (id, true)
    }

    pub(crate) fn populate(&mut self, id: TypeId, kind: TypeKind) {
        self.types[id.0].kind = kind;
    }

    /// Make a DIE resolve to an existing type.
    pub(crate) fn alias(&mut self, offset: DieOffset, id: TypeId) {
        self.by_offset.insert(offset, id);
    }

    /// The shared type for a primitive.
    pub fn primitive(&mut self, primitive: Primitive, byte_size: u64) -> TypeId {
        if let Some(id) = self.primitives.get(&(primitive, byte_size)) {
            return *id;
        }
        let id = TypeId(self.types.len());
        self.types.push(Type {
            offset: None,
            kind: TypeKind::Base(BaseType {
                primitive,
                byte_size,
            }),
        });
        self.primitives.insert((primitive, byte_size), id);
        id
    }

    /// The type used when a DIE has no type attribute.
    pub fn default_type(&mut self) -> TypeId {
        self.primitive(Primitive::Int, 4)
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.types.len())
    }

    /// Discard every type created since the checkpoint.
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        let len = checkpoint.0;
        self.types.truncate(len);
        self.by_offset.retain(|_, id| id.0 < len);
        self.primitives.retain(|_, id| id.0 < len);
    }

    /// The size of a type in bytes, if known.
    pub fn byte_size(&self, id: TypeId) -> Option<u64> {
        self.byte_size_at(id, 0)
    }

    fn byte_size_at(&self, id: TypeId, depth: usize) -> Option<u64> {
        if depth > MAX_DEPTH {
            return None;
        }
        match self.get(id).kind {
            TypeKind::Placeholder => None,
            TypeKind::Base(ref val) => Some(val.byte_size),
            TypeKind::Modifier(ref val) => match val.kind {
                TypeModifierKind::Pointer | TypeModifierKind::Reference => val.byte_size,
                TypeModifierKind::Const | TypeModifierKind::Volatile => {
                    self.byte_size_at(val.ty, depth + 1)
                }
            },
            TypeKind::Array(ref val) => {
                let count = val.count()?;
                let size = self.byte_size_at(val.element, depth + 1)?;
                count.checked_mul(size)
            }
            TypeKind::String(ref val) => Some(val.byte_length),
            TypeKind::Struct(ref val) => val.byte_size,
            TypeKind::Enumeration(ref val) => val.byte_size,
            TypeKind::Function(..) => None,
            TypeKind::Def(ref val) => self.byte_size_at(val.ty, depth + 1),
        }
    }

    /// A C-like name for a type.
    pub fn name(&self, id: TypeId, language: Language) -> String {
        self.name_at(id, language, 0)
    }

    fn name_at(&self, id: TypeId, language: Language, depth: usize) -> String {
        if depth > MAX_DEPTH {
            return "...".to_string();
        }
        match self.get(id).kind {
            TypeKind::Placeholder => "<incomplete>".to_string(),
            TypeKind::Base(ref val) => val.primitive.name(language).to_string(),
            TypeKind::Modifier(ref val) => {
                let target = self.name_at(val.ty, language, depth + 1);
                match val.kind {
                    TypeModifierKind::Pointer => format!("{} *", target),
                    TypeModifierKind::Reference => format!("{} &", target),
                    TypeModifierKind::Const => format!("const {}", target),
                    TypeModifierKind::Volatile => format!("volatile {}", target),
                }
            }
            TypeKind::Array(ref val) => {
                let element = self.name_at(val.element, language, depth + 1);
                match val.count() {
                    Some(count) => format!("{} [{}]", element, count),
                    None => format!("{} []", element),
                }
            }
            TypeKind::String(ref val) => format!("char [{}]", val.byte_length),
            TypeKind::Struct(ref val) => format!(
                "{} {}",
                val.kind.keyword(),
                val.name().unwrap_or("<anon>")
            ),
            TypeKind::Enumeration(ref val) => format!("enum {}", val.name().unwrap_or("<anon>")),
            TypeKind::Function(ref val) => {
                format!("{} ()", self.name_at(val.return_type, language, depth + 1))
            }
            TypeKind::Def(ref val) => val.name.clone(),
        }
    }
}
