mod common;

use dwarfsym_parser::*;
use gimli::constants::*;
use gimli::write::{Address, AttributeValue, DwarfUnit, EndianVec, Expression, Sections};
use gimli::{leb128, LittleEndian, RunTimeEndian};

#[test]
fn leb128_values() {
    let unsigned = [
        0,
        127,
        128,
        16383,
        u64::from(u32::max_value()),
        u64::max_value(),
    ];
    let mut buf = Vec::new();
    for value in &unsigned {
        leb128::write::unsigned(&mut buf, *value).unwrap();
    }
    let mut cursor = ByteCursor::new(&buf, RunTimeEndian::Little);
    for value in &unsigned {
        assert_eq!(cursor.read_uleb128().unwrap(), *value);
    }
    assert!(cursor.is_empty());

    let signed = [
        0,
        127,
        128,
        16383,
        -1,
        -128,
        i64::from(i32::min_value()),
        i64::from(i32::max_value()),
    ];
    let mut buf = Vec::new();
    for value in &signed {
        leb128::write::signed(&mut buf, *value).unwrap();
    }
    let mut cursor = ByteCursor::new(&buf, RunTimeEndian::Little);
    for value in &signed {
        assert_eq!(cursor.read_sleb128().unwrap(), *value);
    }
    assert!(cursor.is_empty());
}

// Encode a unit with gimli's writer and check that every DIE it reads back
// matches the DIE we decode at the same offset.
#[test]
fn decode_gimli_encoded_unit() {
    let encoding = gimli::Encoding {
        format: gimli::Format::Dwarf32,
        version: 2,
        address_size: 8,
    };
    let mut dwarf = DwarfUnit::new(encoding);
    let root = dwarf.unit.root();
    {
        let entry = dwarf.unit.get_mut(root);
        entry.set(DW_AT_name, AttributeValue::String(b"count.c".to_vec()));
        entry.set(DW_AT_language, AttributeValue::Language(DW_LANG_C99));
        entry.set(DW_AT_low_pc, AttributeValue::Address(Address::Constant(0x4000)));
        entry.set(DW_AT_high_pc, AttributeValue::Address(Address::Constant(0x4100)));
        entry.set(DW_AT_stmt_list, AttributeValue::Data4(0));
    }
    let uint = dwarf.unit.add(root, DW_TAG_base_type);
    {
        let entry = dwarf.unit.get_mut(uint);
        entry.set(DW_AT_name, AttributeValue::String(b"unsigned int".to_vec()));
        entry.set(DW_AT_encoding, AttributeValue::Encoding(DW_ATE_unsigned));
        entry.set(DW_AT_byte_size, AttributeValue::Data1(4));
    }
    let function = dwarf.unit.add(root, DW_TAG_subprogram);
    {
        let entry = dwarf.unit.get_mut(function);
        entry.set(DW_AT_name, AttributeValue::String(b"count".to_vec()));
        entry.set(DW_AT_external, AttributeValue::Flag(true));
        entry.set(DW_AT_low_pc, AttributeValue::Address(Address::Constant(0x4000)));
        entry.set(DW_AT_high_pc, AttributeValue::Address(Address::Constant(0x4040)));
        entry.set(DW_AT_type, AttributeValue::UnitRef(uint));
    }
    let total = dwarf.unit.add(function, DW_TAG_variable);
    {
        let entry = dwarf.unit.get_mut(total);
        entry.set(DW_AT_name, AttributeValue::String(b"total".to_vec()));
        entry.set(DW_AT_type, AttributeValue::UnitRef(uint));
        entry.set(
            DW_AT_location,
            AttributeValue::Exprloc(Expression::raw(vec![DW_OP_fbreg.0, 0x70])),
        );
    }
    let limit = dwarf.unit.add(root, DW_TAG_variable);
    {
        let mut location = vec![DW_OP_addr.0];
        location.extend_from_slice(&0x8000u64.to_le_bytes());
        let entry = dwarf.unit.get_mut(limit);
        entry.set(DW_AT_name, AttributeValue::String(b"limit".to_vec()));
        entry.set(DW_AT_external, AttributeValue::Flag(true));
        entry.set(DW_AT_type, AttributeValue::UnitRef(uint));
        entry.set(DW_AT_location, AttributeValue::Exprloc(Expression::raw(location)));
    }

    let mut sections = Sections::new(EndianVec::new(LittleEndian));
    dwarf.write(&mut sections).unwrap();
    let info = sections.debug_info.slice();
    let abbrev = sections.debug_abbrev.slice();
    let line = common::line_program(&common::line_ops(0x4000, 10, 0x4100));

    let mut session = ParseSession::new(
        DebugSections::new(RunTimeEndian::Little, info, abbrev, &line)
            .with_str(sections.debug_str.slice()),
    );
    let mut store = SymbolStore::new();
    let report = session.scan(&mut store);
    assert!(report.failures.is_empty());
    let names: Vec<_> = report.symbols.iter().map(PartialSymbol::name).collect();
    assert_eq!(names, vec!["count", "limit"]);

    let unit = session.expand_unit_into(UnitHandle(0), &mut store).unwrap();
    assert_eq!(unit.range(), Range::new(0x4000, 0x4100));
    let total = unit.lookup("total").unwrap();
    assert_eq!(total.class(), StorageClass::FrameOffset { offset: -16 });
    assert_eq!(
        session.types().name(total.ty(), unit.language()),
        "unsigned int"
    );
    assert_eq!(
        unit.lookup("limit").map(Symbol::class),
        Some(StorageClass::Static { address: 0x8000 })
    );
    assert_eq!(unit.function_at(0x4020).and_then(Scope::name), Some("count"));
    assert_eq!(unit.lines().row_for_address(0x4080).map(|r| r.line), Some(10));

    let debug_info = gimli::DebugInfo::new(info, LittleEndian);
    let debug_abbrev = gimli::DebugAbbrev::new(abbrev, LittleEndian);
    let header = debug_info.units().next().unwrap().unwrap();
    let abbrevs = header.abbreviations(&debug_abbrev).unwrap();
    let mut entries = header.entries(&abbrevs);
    let mut count = 0;
    while let Some((_, entry)) = entries.next_dfs().unwrap() {
        let offset = entry.offset().to_debug_info_offset(&header).unwrap().0;
        let die = session.die(DieOffset(offset)).unwrap();
        assert_eq!(die.tag.dw_tag(), entry.tag());

        let mut expected = Vec::new();
        let mut attrs = entry.attrs();
        while let Some(attr) = attrs.next().unwrap() {
            expected.push((attr.name(), read_value(attr.raw_value(), &header)));
        }
        let decoded: Vec<_> = die
            .attributes
            .iter()
            .map(|attr| (attr.name, attr.value.clone()))
            .collect();
        assert_eq!(decoded, expected);
        count += 1;
    }
    assert_eq!(count, 5);
}

type Reader<'a> = gimli::EndianSlice<'a, LittleEndian>;

// The value gimli reads, in the form `read_die` produces it.
fn read_value<'a>(
    value: gimli::read::AttributeValue<Reader<'a>>,
    header: &gimli::UnitHeader<Reader<'a>>,
) -> dwarfsym_parser::AttributeValue<'a> {
    use dwarfsym_parser::AttributeValue as Value;
    use gimli::read::AttributeValue as Read;

    match value {
        Read::Addr(address) => Value::Address(address),
        Read::Data1(data) => Value::Unsigned(data.into()),
        Read::Data2(data) => Value::Unsigned(data.into()),
        Read::Data4(data) => Value::Unsigned(data.into()),
        Read::Data8(data) => Value::Unsigned(data),
        Read::Udata(data) => Value::Unsigned(data),
        Read::Sdata(data) => Value::Signed(data),
        Read::Flag(flag) => Value::Flag(flag),
        Read::String(string) => Value::String(String::from_utf8_lossy(string.slice())),
        Read::Block(block) => Value::Block(block.slice()),
        Read::Exprloc(expression) => Value::Block(expression.0.slice()),
        Read::UnitRef(offset) => {
            let offset = offset.to_debug_info_offset(header).unwrap();
            Value::Reference(DieOffset(offset.0))
        }
        value => panic!("unexpected attribute value: {:?}", value),
    }
}
