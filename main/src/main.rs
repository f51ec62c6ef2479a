// Enable some rust 2018 idioms.
#![warn(bare_trait_objects)]
#![warn(unused_extern_crates)]

#[cfg(feature = "system_alloc")]
use std::alloc::System;

#[cfg(feature = "system_alloc")]
#[global_allocator]
static A: System = System;

#[macro_use]
extern crate log;

use std::io::{BufWriter, Write};

// Mode
const OPT_FILE: &str = "file";

// Filters
const OPT_UNIT: &str = "unit";

// Print fields
const OPT_EXPAND: &str = "expand";
const OPT_LINES: &str = "lines";
const OPT_ADDRESS: &str = "address";

fn main() {
    env_logger::init();

    let mut cmd = clap::Command::new("dwarfsym")
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .arg(
            clap::Arg::new(OPT_FILE)
                .help("Path of file to print")
                .value_name("FILE")
                .index(1)
                .required(true),
        )
        .arg(
            clap::Arg::new(OPT_UNIT)
                .short('u')
                .long(OPT_UNIT)
                .help("Print only compilation units with the given name")
                .value_name("NAME"),
        )
        .arg(
            clap::Arg::new(OPT_EXPAND)
                .short('e')
                .long(OPT_EXPAND)
                .help("Expand compilation units and print their scopes, symbols and types")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new(OPT_LINES)
                .short('l')
                .long(OPT_LINES)
                .help("Print the line number rows of expanded units")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new(OPT_ADDRESS)
                .short('a')
                .long(OPT_ADDRESS)
                .help("Print the unit, function and line that contain an address")
                .value_name("ADDR"),
        );
    let matches = cmd.get_matches_mut();

    let mut options = dwarfsym::Options::default();
    options.expand = matches.get_flag(OPT_EXPAND);
    options.print_lines = matches.get_flag(OPT_LINES);
    if let Some(unit) = matches.get_one::<String>(OPT_UNIT) {
        options.unit(unit.clone());
    }
    if let Some(value) = matches.get_one::<String>(OPT_ADDRESS) {
        match dwarfsym::parse_address(value) {
            Some(address) => {
                options.address(address);
            }
            None => cmd
                .error(
                    clap::error::ErrorKind::InvalidValue,
                    format!("invalid {} value: {}", OPT_ADDRESS, value),
                )
                .exit(),
        }
    }

    let path = match matches.get_one::<String>(OPT_FILE) {
        Some(path) => path,
        None => return,
    };
    if let Err(e) = dwarfsym::File::parse(path, |session| print_file(session, &options)) {
        error!("{}: {}", path, e);
    }
}

fn print_file(
    session: &mut dwarfsym::ParseSession,
    options: &dwarfsym::Options,
) -> dwarfsym::Result<()> {
    let stdout = std::io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    {
        let mut printer = dwarfsym::TextPrinter::new(&mut writer);
        dwarfsym::print(session, &mut printer, options)?;
    }
    writer.flush()?;
    Ok(())
}
