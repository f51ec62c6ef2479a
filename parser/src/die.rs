use std::borrow::Cow;
use std::convert::TryFrom;
use std::fmt;

use crate::abbrev::AbbreviationTable;
use crate::reader::ByteCursor;
use crate::{Error, Result};

/// The offset of a DIE within `.debug_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DieOffset(pub usize);

/// The kinds of DIE that the symbol builder distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DieTag {
    /// Closes the children of the nearest open DIE.
    Null,
    CompileUnit,
    Subprogram,
    LexicalBlock,
    InlinedSubroutine,
    Variable,
    FormalParameter,
    UnspecifiedParameters,
    Label,
    Member,
    StructureType,
    UnionType,
    ClassType,
    EnumerationType,
    Enumerator,
    ArrayType,
    SubrangeType,
    PointerType,
    ReferenceType,
    ConstType,
    VolatileType,
    StringType,
    Typedef,
    BaseType,
    SubroutineType,
    CommonBlock,
    Other(gimli::DwTag),
}

impl From<gimli::DwTag> for DieTag {
    fn from(tag: gimli::DwTag) -> Self {
        match tag {
            gimli::DW_TAG_null => DieTag::Null,
            gimli::DW_TAG_compile_unit => DieTag::CompileUnit,
            gimli::DW_TAG_subprogram => DieTag::Subprogram,
            gimli::DW_TAG_lexical_block => DieTag::LexicalBlock,
            gimli::DW_TAG_inlined_subroutine => DieTag::InlinedSubroutine,
            gimli::DW_TAG_variable => DieTag::Variable,
            gimli::DW_TAG_formal_parameter => DieTag::FormalParameter,
            gimli::DW_TAG_unspecified_parameters => DieTag::UnspecifiedParameters,
            gimli::DW_TAG_label => DieTag::Label,
            gimli::DW_TAG_member => DieTag::Member,
            gimli::DW_TAG_structure_type => DieTag::StructureType,
            gimli::DW_TAG_union_type => DieTag::UnionType,
            gimli::DW_TAG_class_type => DieTag::ClassType,
            gimli::DW_TAG_enumeration_type => DieTag::EnumerationType,
            gimli::DW_TAG_enumerator => DieTag::Enumerator,
            gimli::DW_TAG_array_type => DieTag::ArrayType,
            gimli::DW_TAG_subrange_type => DieTag::SubrangeType,
            gimli::DW_TAG_pointer_type => DieTag::PointerType,
            gimli::DW_TAG_reference_type => DieTag::ReferenceType,
            gimli::DW_TAG_const_type => DieTag::ConstType,
            gimli::DW_TAG_volatile_type => DieTag::VolatileType,
            gimli::DW_TAG_string_type => DieTag::StringType,
            gimli::DW_TAG_typedef => DieTag::Typedef,
            gimli::DW_TAG_base_type => DieTag::BaseType,
            gimli::DW_TAG_subroutine_type => DieTag::SubroutineType,
            gimli::DW_TAG_common_block => DieTag::CommonBlock,
            other => DieTag::Other(other),
        }
    }
}

impl DieTag {
    /// The tag value as encoded in the abbreviation table.
    pub fn dw_tag(self) -> gimli::DwTag {
        match self {
            DieTag::Null => gimli::DW_TAG_null,
            DieTag::CompileUnit => gimli::DW_TAG_compile_unit,
            DieTag::Subprogram => gimli::DW_TAG_subprogram,
            DieTag::LexicalBlock => gimli::DW_TAG_lexical_block,
            DieTag::InlinedSubroutine => gimli::DW_TAG_inlined_subroutine,
            DieTag::Variable => gimli::DW_TAG_variable,
            DieTag::FormalParameter => gimli::DW_TAG_formal_parameter,
            DieTag::UnspecifiedParameters => gimli::DW_TAG_unspecified_parameters,
            DieTag::Label => gimli::DW_TAG_label,
            DieTag::Member => gimli::DW_TAG_member,
            DieTag::StructureType => gimli::DW_TAG_structure_type,
            DieTag::UnionType => gimli::DW_TAG_union_type,
            DieTag::ClassType => gimli::DW_TAG_class_type,
            DieTag::EnumerationType => gimli::DW_TAG_enumeration_type,
            DieTag::Enumerator => gimli::DW_TAG_enumerator,
            DieTag::ArrayType => gimli::DW_TAG_array_type,
            DieTag::SubrangeType => gimli::DW_TAG_subrange_type,
            DieTag::PointerType => gimli::DW_TAG_pointer_type,
            DieTag::ReferenceType => gimli::DW_TAG_reference_type,
            DieTag::ConstType => gimli::DW_TAG_const_type,
            DieTag::VolatileType => gimli::DW_TAG_volatile_type,
            DieTag::StringType => gimli::DW_TAG_string_type,
            DieTag::Typedef => gimli::DW_TAG_typedef,
            DieTag::BaseType => gimli::DW_TAG_base_type,
            DieTag::SubroutineType => gimli::DW_TAG_subroutine_type,
            DieTag::CommonBlock => gimli::DW_TAG_common_block,
            DieTag::Other(tag) => tag,
        }
    }
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue<'input> {
    Address(u64),
    Unsigned(u64),
    Signed(i64),
    Flag(bool),
    String(Cow<'input, str>),
    Block(&'input [u8]),
    /// A reference to another DIE, converted to a section offset.
    Reference(DieOffset),
}

impl<'input> AttributeValue<'input> {
    /// The value as an unsigned constant.
    pub fn udata(&self) -> Option<u64> {
        match *self {
            AttributeValue::Unsigned(value) => Some(value),
            AttributeValue::Signed(value) if value >= 0 => Some(value as u64),
            _ => None,
        }
    }

    /// The value as a signed constant.
    pub fn sdata(&self) -> Option<i64> {
        match *self {
            AttributeValue::Unsigned(value) => Some(value as i64),
            AttributeValue::Signed(value) => Some(value),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<u64> {
        match *self {
            AttributeValue::Address(address) => Some(address),
            _ => None,
        }
    }

    pub fn flag(&self) -> Option<bool> {
        match *self {
            AttributeValue::Flag(flag) => Some(flag),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn block(&self) -> Option<&'input [u8]> {
        match *self {
            AttributeValue::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn reference(&self) -> Option<DieOffset> {
        match *self {
            AttributeValue::Reference(offset) => Some(offset),
            _ => None,
        }
    }
}

impl<'input> fmt::Display for AttributeValue<'input> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttributeValue::Address(address) => write!(f, "0x{:x}", address),
            AttributeValue::Unsigned(value) => write!(f, "{}", value),
            AttributeValue::Signed(value) => write!(f, "{}", value),
            AttributeValue::Flag(flag) => write!(f, "{}", flag),
            AttributeValue::String(s) => write!(f, "\"{}\"", s),
            AttributeValue::Block(block) => {
                write!(f, "[")?;
                for (i, b) in block.iter().enumerate() {
                    if i != 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "]")
            }
            AttributeValue::Reference(offset) => write!(f, "<0x{:x}>", offset.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'input> {
    pub name: gimli::DwAt,
    pub form: gimli::DwForm,
    pub value: AttributeValue<'input>,
}

/// A debugging information entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Die<'input> {
    pub offset: DieOffset,
    pub tag: DieTag,
    pub has_children: bool,
    pub attributes: Vec<Attribute<'input>>,
}

impl<'input> Die<'input> {
    /// Return true if this entry closes a list of children.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.tag == DieTag::Null
    }

    pub fn attribute(&self, name: gimli::DwAt) -> Option<&Attribute<'input>> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn attr(&self, name: gimli::DwAt) -> Option<&AttributeValue<'input>> {
        self.attribute(name).map(|attr| &attr.value)
    }

    pub fn name(&self) -> Option<&str> {
        self.attr(gimli::DW_AT_name).and_then(AttributeValue::string)
    }

    pub fn low_pc(&self) -> Option<u64> {
        self.attr(gimli::DW_AT_low_pc).and_then(AttributeValue::address)
    }

    pub fn high_pc(&self) -> Option<u64> {
        self.attr(gimli::DW_AT_high_pc).and_then(AttributeValue::address)
    }

    pub fn is_external(&self) -> bool {
        self.flag(gimli::DW_AT_external)
    }

    pub fn is_declaration(&self) -> bool {
        self.flag(gimli::DW_AT_declaration)
    }

    fn flag(&self, name: gimli::DwAt) -> bool {
        match self.attr(name) {
            Some(AttributeValue::Flag(flag)) => *flag,
            // Some producers use a constant form for flags.
            Some(value) => value.udata().map(|v| v != 0).unwrap_or(false),
            None => false,
        }
    }
}

impl<'input> fmt::Display for Die<'input> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "<0x{:x}> {}", self.offset.0, self.tag.dw_tag())?;
        for attr in &self.attributes {
            writeln!(f, "\t{} ({}): {}", attr.name, attr.form, attr.value)?;
        }
        Ok(())
    }
}

/// How much of each DIE to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    /// Keep only the attributes needed for the partial symbol index.
    Partial,
    /// Keep every attribute.
    Full,
}

impl PassMode {
    fn keeps(self, name: gimli::DwAt) -> bool {
        match self {
            PassMode::Full => true,
            PassMode::Partial => match name {
                gimli::DW_AT_name
                | gimli::DW_AT_low_pc
                | gimli::DW_AT_high_pc
                | gimli::DW_AT_external
                | gimli::DW_AT_declaration
                | gimli::DW_AT_language
                | gimli::DW_AT_comp_dir
                | gimli::DW_AT_location => true,
                _ => false,
            },
        }
    }
}

/// The per-unit state needed to decode attribute values.
#[derive(Debug, Clone, Copy)]
pub struct UnitContext<'input> {
    /// The offset of the unit header, which unit-relative references are added to.
    pub offset: usize,
    pub address_size: u8,
    /// The contents of `.debug_str`, possibly empty.
    pub debug_str: &'input [u8],
}

/// Read one DIE at the cursor.
///
/// A zero code produces the null entry without consulting `abbrevs`.
pub fn read_die<'input>(
    cursor: &mut ByteCursor<'input>,
    abbrevs: &AbbreviationTable,
    unit: &UnitContext<'input>,
    mode: PassMode,
) -> Result<Die<'input>> {
    let offset = DieOffset(cursor.offset());
    let code = cursor.read_uleb128()?;
    if code == 0 {
        return Ok(Die {
            offset,
            tag: DieTag::Null,
            has_children: false,
            attributes: Vec::new(),
        });
    }
    let abbrev = abbrevs.get(code).ok_or(Error::UnknownAbbrev(code))?;
    let mut attributes = Vec::with_capacity(match mode {
        PassMode::Full => abbrev.attributes.len(),
        PassMode::Partial => 0,
    });
    for spec in &abbrev.attributes {
        let (form, value) = read_attribute_value(cursor, spec.form, unit)?;
        if mode.keeps(spec.name) {
            attributes.push(Attribute {
                name: spec.name,
                form,
                value,
            });
        }
    }
    Ok(Die {
        offset,
        tag: abbrev.tag.into(),
        has_children: abbrev.has_children,
        attributes,
    })
}

/// Decode one attribute value.
///
/// Returns the form that was actually decoded, which differs from `form`
/// only for `DW_FORM_indirect`.
pub fn read_attribute_value<'input>(
    cursor: &mut ByteCursor<'input>,
    form: gimli::DwForm,
    unit: &UnitContext<'input>,
) -> Result<(gimli::DwForm, AttributeValue<'input>)> {
    let unit_ref = |value: u64| {
        usize::try_from(value)
            .ok()
            .and_then(|value| unit.offset.checked_add(value))
            .map(|offset| AttributeValue::Reference(DieOffset(offset)))
            .ok_or(Error::UnresolvedReference(DieOffset(usize::MAX)))
    };
    let value = match form {
        gimli::DW_FORM_addr => AttributeValue::Address(cursor.read_address(unit.address_size)?),
        gimli::DW_FORM_block1 => {
            let len = cursor.read_u8()?;
            AttributeValue::Block(cursor.read_bytes(len as usize)?)
        }
        gimli::DW_FORM_block2 => {
            let len = cursor.read_u16()?;
            AttributeValue::Block(cursor.read_bytes(len as usize)?)
        }
        gimli::DW_FORM_block4 => {
            let len = cursor.read_u32()?;
            AttributeValue::Block(cursor.read_bytes(len as usize)?)
        }
        gimli::DW_FORM_block => {
            let len = cursor.read_uleb128()?;
            AttributeValue::Block(cursor.read_bytes(len as usize)?)
        }
        gimli::DW_FORM_data1 => AttributeValue::Unsigned(cursor.read_u8()?.into()),
        gimli::DW_FORM_data2 => AttributeValue::Unsigned(cursor.read_u16()?.into()),
        gimli::DW_FORM_data4 => AttributeValue::Unsigned(cursor.read_u32()?.into()),
        gimli::DW_FORM_data8 => AttributeValue::Unsigned(cursor.read_u64()?),
        gimli::DW_FORM_sdata => AttributeValue::Signed(cursor.read_sleb128()?),
        gimli::DW_FORM_udata => AttributeValue::Unsigned(cursor.read_uleb128()?),
        gimli::DW_FORM_string => {
            AttributeValue::String(String::from_utf8_lossy(cursor.read_cstring()?))
        }
        gimli::DW_FORM_strp => {
            let offset = cursor.read_u32()? as usize;
            if offset >= unit.debug_str.len() {
                return Err(Error::TruncatedInput { offset, wanted: 1 });
            }
            let mut strings =
                ByteCursor::with_range(unit.debug_str, offset, unit.debug_str.len(), cursor.endian());
            AttributeValue::String(String::from_utf8_lossy(strings.read_cstring()?))
        }
        gimli::DW_FORM_flag => AttributeValue::Flag(cursor.read_u8()? != 0),
        gimli::DW_FORM_ref_addr => {
            let offset = cursor.read_address(unit.address_size)?;
            let offset = usize::try_from(offset)
                .map_err(|_| Error::UnresolvedReference(DieOffset(usize::MAX)))?;
            AttributeValue::Reference(DieOffset(offset))
        }
        gimli::DW_FORM_ref1 => unit_ref(cursor.read_u8()?.into())?,
        gimli::DW_FORM_ref2 => unit_ref(cursor.read_u16()?.into())?,
        gimli::DW_FORM_ref4 => unit_ref(cursor.read_u32()?.into())?,
        gimli::DW_FORM_ref8 => unit_ref(cursor.read_u64()?)?,
        gimli::DW_FORM_ref_udata => unit_ref(cursor.read_uleb128()?)?,
        gimli::DW_FORM_indirect => {
            let form = cursor.read_uleb128()?;
            if form == gimli::DW_FORM_indirect.0.into() || form > u64::from(u16::MAX) {
                return Err(Error::UnsupportedForm(gimli::DwForm(form as u16)));
            }
            return read_attribute_value(cursor, gimli::DwForm(form as u16), unit);
        }
        _ => return Err(Error::UnsupportedForm(form)),
    };
    Ok((form, value))
}

#[cfg(test)]
mod test {
    use super::*;
    use gimli::RunTimeEndian;

    fn unit() -> UnitContext<'static> {
        UnitContext {
            offset: 0x100,
            address_size: 4,
            debug_str: b"\0main\0",
        }
    }

    fn read(form: gimli::DwForm, data: &[u8]) -> Result<AttributeValue<'_>> {
        let mut cursor = ByteCursor::new(data, RunTimeEndian::Little);
        let (_, value) = read_attribute_value(&mut cursor, form, &unit())?;
        assert!(cursor.is_empty(), "form {} left unread bytes", form);
        Ok(value)
    }

    #[test]
    fn constant_forms() {
        assert_eq!(
            read(gimli::DW_FORM_data2, &[0x34, 0x12]).unwrap(),
            AttributeValue::Unsigned(0x1234)
        );
        assert_eq!(
            read(gimli::DW_FORM_sdata, &[0x7c]).unwrap(),
            AttributeValue::Signed(-4)
        );
        assert_eq!(
            read(gimli::DW_FORM_flag, &[1]).unwrap(),
            AttributeValue::Flag(true)
        );
    }

    #[test]
    fn reference_forms() {
        // Unit-relative references are rebased on the unit offset.
        assert_eq!(
            read(gimli::DW_FORM_ref4, &[0x20, 0, 0, 0]).unwrap(),
            AttributeValue::Reference(DieOffset(0x120))
        );
        assert_eq!(
            read(gimli::DW_FORM_ref_addr, &[0x20, 0, 0, 0]).unwrap(),
            AttributeValue::Reference(DieOffset(0x20))
        );
    }

    #[test]
    fn overflowing_reference() {
        match read(gimli::DW_FORM_ref8, &[0xff; 8]) {
            Err(Error::UnresolvedReference(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        let mut data = vec![0xff; 9];
        data.push(0x01);
        match read(gimli::DW_FORM_ref_udata, &data) {
            Err(Error::UnresolvedReference(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn string_forms() {
        assert_eq!(
            read(gimli::DW_FORM_strp, &[1, 0, 0, 0]).unwrap().string(),
            Some("main")
        );
        assert_eq!(
            read(gimli::DW_FORM_string, b"x.c\0").unwrap().string(),
            Some("x.c")
        );
        assert!(read(gimli::DW_FORM_strp, &[9, 0, 0, 0]).is_err());
    }

    #[test]
    fn indirect_form() {
        assert_eq!(
            read(gimli::DW_FORM_indirect, &[0x0b, 0x2a]).unwrap(),
            AttributeValue::Unsigned(42)
        );
    }

    #[test]
    fn block_forms() {
        assert_eq!(
            read(gimli::DW_FORM_block1, &[2, 0x91, 0x7c]).unwrap(),
            AttributeValue::Block(&[0x91, 0x7c])
        );
        match read(gimli::DW_FORM_block2, &[5, 0, 1]) {
            Err(Error::TruncatedInput { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unsupported_form() {
        match read(gimli::DW_FORM_sec_offset, &[0, 0, 0, 0]) {
            Err(Error::UnsupportedForm(gimli::DW_FORM_sec_offset)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn null_die() {
        let abbrevs = AbbreviationTable::default();
        let mut cursor = ByteCursor::new(&[0], RunTimeEndian::Little);
        let die = read_die(&mut cursor, &abbrevs, &unit(), PassMode::Full).unwrap();
        assert!(die.is_null());
        assert_eq!(die.offset, DieOffset(0));

        let mut cursor = ByteCursor::new(&[7], RunTimeEndian::Little);
        match read_die(&mut cursor, &abbrevs, &unit(), PassMode::Full) {
            Err(Error::UnknownAbbrev(7)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn tag_conversion() {
        assert_eq!(DieTag::from(gimli::DW_TAG_pointer_type), DieTag::PointerType);
        let other = DieTag::from(gimli::DW_TAG_namespace);
        assert_eq!(other, DieTag::Other(gimli::DW_TAG_namespace));
        assert_eq!(other.dw_tag(), gimli::DW_TAG_namespace);
    }
}
