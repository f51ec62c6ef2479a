/// An address range.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Range {
    /// The beginning of the address range (inclusive).
    pub begin: u64,

    /// The end of the address range (exclusive).
    pub end: u64,
}

impl Range {
    /// Create a range from a low and high address.
    ///
    /// Returns `None` for an empty or inverted range.
    pub fn new(begin: u64, end: u64) -> Option<Range> {
        if end <= begin {
            debug!("invalid range: 0x{:x}..0x{:x}", begin, end);
            return None;
        }
        Some(Range { begin, end })
    }

    /// The size of the address range.
    #[inline]
    pub fn size(&self) -> u64 {
        self.end - self.begin
    }

    /// Return true if the range contains the value.
    #[inline]
    pub fn contains(&self, addr: u64) -> bool {
        self.begin <= addr && addr < self.end
    }

    /// The smallest range covering both ranges.
    pub fn cover(&self, other: Range) -> Range {
        Range {
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new() {
        assert_eq!(
            Range::new(0x1000, 0x1010),
            Some(Range {
                begin: 0x1000,
                end: 0x1010
            })
        );
        assert_eq!(Range::new(0x1000, 0x1000), None);
        assert_eq!(Range::new(0x1010, 0x1000), None);
    }

    #[test]
    fn cover() {
        let a = Range { begin: 0x20, end: 0x30 };
        let b = Range { begin: 0x10, end: 0x18 };
        assert_eq!(a.cover(b), Range { begin: 0x10, end: 0x30 });
        assert!(a.cover(b).contains(0x2f));
        assert!(!a.cover(b).contains(0x30));
        assert_eq!(a.size(), 0x10);
    }
}
