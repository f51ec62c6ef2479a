use parser::{ParseSession, UnitHandle, UnitIndex};

use crate::Options;

pub(crate) fn filter_units(session: &ParseSession, options: &Options) -> Vec<UnitHandle> {
    session
        .units()
        .iter()
        .filter(|unit| filter_unit(unit, options))
        .map(UnitIndex::handle)
        .collect()
}

/// Return true if this unit matches the filter options.
///
/// A filter without a directory also matches the final component of the unit name.
fn filter_unit(unit: &UnitIndex, options: &Options) -> bool {
    match options.filter_unit {
        Some(ref filter) => match unit.name() {
            Some(name) => {
                name == filter
                    || (!filter.contains('/')
                        && name.rsplit(|c| c == '/' || c == '\\').next() == Some(filter.as_str()))
            }
            None => false,
        },
        None => true,
    }
}
