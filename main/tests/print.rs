use gimli::constants::*;
use gimli::{leb128, RunTimeEndian};
use parser::{DebugSections, ParseSession};

const LOW_PC: u64 = 0x1000;
const HIGH_PC: u64 = 0x1010;

fn uleb(buf: &mut Vec<u8>, value: u64) {
    leb128::write::unsigned(buf, value).unwrap();
}

fn string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
}

fn abbrevs() -> Vec<u8> {
    let table: &[(u8, DwTag, bool, &[(DwAt, DwForm)])] = &[
        (
            1,
            DW_TAG_compile_unit,
            true,
            &[
                (DW_AT_name, DW_FORM_string),
                (DW_AT_language, DW_FORM_data1),
                (DW_AT_low_pc, DW_FORM_addr),
                (DW_AT_high_pc, DW_FORM_addr),
                (DW_AT_stmt_list, DW_FORM_data4),
            ],
        ),
        (
            2,
            DW_TAG_base_type,
            false,
            &[
                (DW_AT_name, DW_FORM_string),
                (DW_AT_encoding, DW_FORM_data1),
                (DW_AT_byte_size, DW_FORM_data1),
            ],
        ),
        (
            3,
            DW_TAG_subprogram,
            true,
            &[
                (DW_AT_name, DW_FORM_string),
                (DW_AT_external, DW_FORM_flag),
                (DW_AT_low_pc, DW_FORM_addr),
                (DW_AT_high_pc, DW_FORM_addr),
                (DW_AT_type, DW_FORM_ref4),
            ],
        ),
        (
            4,
            DW_TAG_variable,
            false,
            &[
                (DW_AT_name, DW_FORM_string),
                (DW_AT_type, DW_FORM_ref4),
                (DW_AT_location, DW_FORM_block1),
            ],
        ),
    ];
    let mut buf = Vec::new();
    for (code, tag, children, attributes) in table {
        uleb(&mut buf, u64::from(*code));
        uleb(&mut buf, u64::from(tag.0));
        buf.push(*children as u8);
        for (name, form) in attributes.iter() {
            uleb(&mut buf, u64::from(name.0));
            uleb(&mut buf, u64::from(form.0));
        }
        buf.extend_from_slice(&[0, 0]);
    }
    buf.push(0);
    buf
}

/// A unit for `count.c` with `int main()` holding a local `x` at frame offset -4.
fn debug_info() -> Vec<u8> {
    let mut body = Vec::new();
    body.push(1);
    string(&mut body, "count.c");
    body.push(DW_LANG_C89.0 as u8);
    body.extend_from_slice(&LOW_PC.to_le_bytes());
    body.extend_from_slice(&HIGH_PC.to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes());

    let int = 11 + body.len() as u32;
    body.push(2);
    string(&mut body, "int");
    body.push(DW_ATE_signed.0);
    body.push(4);

    body.push(3);
    string(&mut body, "main");
    body.push(1);
    body.extend_from_slice(&LOW_PC.to_le_bytes());
    body.extend_from_slice(&HIGH_PC.to_le_bytes());
    body.extend_from_slice(&int.to_le_bytes());

    body.push(4);
    string(&mut body, "x");
    body.extend_from_slice(&int.to_le_bytes());
    let mut location = vec![DW_OP_fbreg.0];
    leb128::write::signed(&mut location, -4).unwrap();
    body.push(location.len() as u8);
    body.extend_from_slice(&location);
    body.push(0);
    body.push(0);

    let mut buf = Vec::new();
    buf.extend_from_slice(&(7 + body.len() as u32).to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.push(8);
    buf.extend_from_slice(&body);
    buf
}

/// A line program placing line 10 of `main.c` at `LOW_PC`.
fn debug_line() -> Vec<u8> {
    let mut header = vec![1, 1, (-5i8) as u8, 14, 13];
    header.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
    header.push(0);
    string(&mut header, "main.c");
    header.extend_from_slice(&[0, 0, 0, 0]);

    let mut ops = vec![0, 9, DW_LNE_set_address.0];
    ops.extend_from_slice(&LOW_PC.to_le_bytes());
    ops.push(DW_LNS_advance_line.0);
    leb128::write::signed(&mut ops, 9).unwrap();
    ops.push(DW_LNS_copy.0);
    ops.push(DW_LNS_advance_pc.0);
    uleb(&mut ops, HIGH_PC - LOW_PC);
    ops.extend_from_slice(&[0, 1, DW_LNE_end_sequence.0]);

    let mut buf = Vec::new();
    buf.extend_from_slice(&((2 + 4 + header.len() + ops.len()) as u32).to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&(header.len() as u32).to_le_bytes());
    buf.extend_from_slice(&header);
    buf.extend_from_slice(&ops);
    buf
}

fn print(info: &[u8], options: &dwarfsym::Options) -> String {
    let abbrev = abbrevs();
    let line = debug_line();
    let mut session = ParseSession::new(DebugSections::new(
        RunTimeEndian::Little,
        info,
        &abbrev,
        &line,
    ));
    let mut output = Vec::new();
    {
        let mut printer = dwarfsym::TextPrinter::new(&mut output);
        dwarfsym::print(&mut session, &mut printer, options).unwrap();
    }
    String::from_utf8(output).unwrap()
}

#[test]
fn partial_symbols() {
    let output = print(&debug_info(), &dwarfsym::Options::default());
    assert_eq!(
        output,
        "unit: count.c\n\
         \tlanguage: C\n\
         \taddress: 0x1000-0x1010\n\
         \tfunction: main 0x1000-0x1010 (external)\n\
         \n"
    );
}

#[test]
fn expanded_unit() {
    let options = dwarfsym::Options {
        expand: true,
        print_lines: true,
        ..Default::default()
    };
    let output = print(&debug_info(), &options);
    for expected in &[
        "\tfile scope: 0x1000-0x1010\n",
        "\t\tfunction: int () main 0x1000-0x1010 (external)\n",
        "\t\tfunction scope: main 0x1000-0x1010\n",
        "\t\t\tlocal: int x @ fb-4\n",
        "\tlines: 2\n",
        "\t\t0x1000 main.c:10\n",
        "\t\t0x1010 end\n",
    ] {
        assert!(output.contains(expected), "missing {:?} in\n{}", expected, output);
    }
}

#[test]
fn address_lookup() {
    let mut options = dwarfsym::Options::default();
    options.address(0x1004);
    let output = print(&debug_info(), &options);
    assert!(output.ends_with(
        "address: 0x1004\n\
         \tunit: count.c\n\
         \tfunction: main\n\
         \tline: main.c:10\n"
    ));

    let mut options = dwarfsym::Options::default();
    options.address(0x2000);
    let output = print(&debug_info(), &options);
    assert!(output.ends_with("address: 0x2000\n\tno compilation unit\n"));
}

#[test]
fn unit_filter() {
    let mut options = dwarfsym::Options::default();
    options.unit("other.c".into());
    assert_eq!(print(&debug_info(), &options), "");
    options.unit("count.c".into());
    assert!(print(&debug_info(), &options).starts_with("unit: count.c\n"));
}

#[test]
fn unavailable_unit() {
    let mut info = debug_info();
    // Point the local's type at an offset with no DIE.
    let len = info.len();
    let at = len - 2 - 3 - 4;
    info[at..at + 4].copy_from_slice(&0x7fffu32.to_le_bytes());
    let options = dwarfsym::Options {
        expand: true,
        ..Default::default()
    };
    let output = print(&info, &options);
    assert!(output
        .contains("\tdebug information for compilation unit count.c is unavailable: "));
    assert!(output.contains("\tfunction: main 0x1000-0x1010 (external)\n"));
}
