use fnv::FnvHashMap as HashMap;

use crate::die::DieOffset;
use crate::unit::UnitHandle;

/// The position of a DIE within its unit's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DieRef {
    pub unit: UnitHandle,
    pub index: usize,
}

/// Maps DIE offsets to the DIEs read in the current session.
///
/// Entries are only lookup handles; the DIEs themselves stay in their
/// unit's arena.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    map: HashMap<DieOffset, DieRef>,
}

impl ReferenceTable {
    pub fn record(&mut self, offset: DieOffset, die: DieRef) {
        self.map.insert(offset, die);
    }

    pub fn resolve(&self, offset: DieOffset) -> Option<DieRef> {
        self.map.get(&offset).cloned()
    }

    /// Drop every entry that points into a unit.
    pub fn forget_unit(&mut self, unit: UnitHandle) {
        self.map.retain(|_, die| die.unit != unit);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn forget_unit() {
        let mut refs = ReferenceTable::default();
        let a = DieRef {
            unit: UnitHandle(0),
            index: 3,
        };
        let b = DieRef {
            unit: UnitHandle(1),
            index: 0,
        };
        refs.record(DieOffset(0x2e), a);
        refs.record(DieOffset(0x80), b);
        assert_eq!(refs.resolve(DieOffset(0x2e)), Some(a));
        assert_eq!(refs.resolve(DieOffset(0x2f)), None);

        refs.forget_unit(UnitHandle(0));
        assert_eq!(refs.resolve(DieOffset(0x2e)), None);
        assert_eq!(refs.resolve(DieOffset(0x80)), Some(b));
        assert_eq!(refs.len(), 1);
    }
}
