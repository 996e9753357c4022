//! Edge event types.

use std::fmt;

/// A code address and the byte length associated with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    /// Code address.
    pub addr: u64,
    /// Instruction or block size in bytes.
    pub size: u64,
}

impl Location {
    #[must_use]
    pub const fn new(addr: u64, size: u64) -> Self {
        Self { addr, size }
    }
}

/// One observed control-flow transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: Location,
    pub to: Location,
}

impl Edge {
    #[must_use]
    pub const fn new(from: Location, to: Location) -> Self {
        Self { from, to }
    }
}

/// Renders the data-record layout: `0x<hex>,<dec>,0x<hex>,<dec>`.
///
/// Addresses are lowercase hex without padding; sizes are always decimal.
impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#x},{},{:#x},{}",
            self.from.addr, self.from.size, self.to.addr, self.to.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let edge = Edge::new(Location::new(0x1F, 4), Location::new(0x2A0, 2));
        assert_eq!(edge.to_string(), "0x1f,4,0x2a0,2");
    }

    #[test]
    fn test_sizes_stay_decimal() {
        let edge = Edge::new(Location::new(0x10, 16), Location::new(0xff, 255));
        assert_eq!(edge.to_string(), "0x10,16,0xff,255");
    }

    #[test]
    fn test_zero_and_max_addresses() {
        let edge = Edge::new(Location::new(0, 0), Location::new(u64::MAX, 1));
        assert_eq!(edge.to_string(), "0x0,0,0xffffffffffffffff,1");
    }
}
