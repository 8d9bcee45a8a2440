use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition flags produced by a subtraction-based comparison.
///
/// All four bits are always written together by [`Flags::compare`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flags(u8);

impl Flags {
    pub const ZERO: u8 = 1 << 0;
    pub const SIGN: u8 = 1 << 1;
    pub const CARRY: u8 = 1 << 2;
    pub const OVERFLOW: u8 = 1 << 3;

    const MASK: u8 = Self::ZERO | Self::SIGN | Self::CARRY | Self::OVERFLOW;

    /// Flags for `ra - rb`, with `ra` and `rb` read as both signed and unsigned.
    pub fn compare(ra: u64, rb: u64) -> Self {
        let sa = ra as i64;
        let sb = rb as i64;
        let result = sa.wrapping_sub(sb);

        let mut bits = 0;
        if ra == rb {
            bits |= Self::ZERO;
        }
        if result < 0 {
            bits |= Self::SIGN;
        }
        if ra < rb {
            bits |= Self::CARRY;
        }
        if ((sa ^ sb) & (sa ^ result)) < 0 {
            bits |= Self::OVERFLOW;
        }
        Self(bits)
    }

    /// Bits outside the four flag positions are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn zero(&self) -> bool {
        self.0 & Self::ZERO != 0
    }

    pub const fn sign(&self) -> bool {
        self.0 & Self::SIGN != 0
    }

    pub const fn carry(&self) -> bool {
        self.0 & Self::CARRY != 0
    }

    pub const fn overflow(&self) -> bool {
        self.0 & Self::OVERFLOW != 0
    }

    // --- Jump conditions ---

    pub const fn equal(&self) -> bool {
        self.zero()
    }

    pub const fn not_equal(&self) -> bool {
        !self.zero()
    }

    /// Signed less-than.
    pub const fn less(&self) -> bool {
        self.sign() != self.overflow()
    }

    /// Signed greater-than.
    pub const fn greater(&self) -> bool {
        !self.zero() && self.sign() == self.overflow()
    }

    /// Unsigned greater-than.
    pub const fn above(&self) -> bool {
        !self.carry() && !self.zero()
    }

    /// Unsigned less-than.
    pub const fn below(&self) -> bool {
        self.carry()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            bit(self.overflow(), 'O'),
            bit(self.carry(), 'C'),
            bit(self.sign(), 'S'),
            bit(self.zero(), 'Z'),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u64 = i64::MIN as u64;
    const MAX: u64 = i64::MAX as u64;

    // (ra, rb, zero, sign, carry, overflow)
    const TABLE: &[(u64, u64, bool, bool, bool, bool)] = &[
        (0, 0, true, false, false, false),
        (10, 3, false, false, false, false),
        (3, 10, false, true, true, false),
        (5, 5, true, false, false, false),
        (0, 1, false, true, true, false),
        (u64::MAX, 0, false, true, false, false),
        (0, u64::MAX, false, false, true, false),
        (u64::MAX, u64::MAX, true, false, false, false),
        (MIN, 1, false, false, false, true),
        (MAX, u64::MAX, false, true, true, true),
        (MIN, MAX, false, false, false, true),
        (MAX, MIN, false, true, true, true),
        (MIN, MIN, true, false, false, false),
        (MAX, 0, false, false, false, false),
        (MIN, 0, false, true, false, false),
    ];

    #[test]
    fn truth_table_boundaries() {
        for &(ra, rb, zero, sign, carry, overflow) in TABLE {
            let flags = Flags::compare(ra, rb);
            assert_eq!(flags.zero(), zero, "zero for {ra:#x} - {rb:#x}");
            assert_eq!(flags.sign(), sign, "sign for {ra:#x} - {rb:#x}");
            assert_eq!(flags.carry(), carry, "carry for {ra:#x} - {rb:#x}");
            assert_eq!(flags.overflow(), overflow, "overflow for {ra:#x} - {rb:#x}");
        }
    }

    #[test]
    fn bit_layout() {
        assert_eq!(Flags::compare(1, 1).bits(), Flags::ZERO);
        assert_eq!(Flags::compare(3, 10).bits(), Flags::SIGN | Flags::CARRY);
        assert_eq!(Flags::compare(MIN, 1).bits(), Flags::OVERFLOW);
        assert_eq!(Flags::from_bits(0xff).bits(), 0x0f);
    }

    #[test]
    fn conditions_for_orderings() {
        let lt = Flags::compare(3, 10);
        assert!(lt.less() && lt.below() && lt.not_equal());
        assert!(!lt.greater() && !lt.above() && !lt.equal());

        let eq = Flags::compare(7, 7);
        assert!(eq.equal());
        assert!(!eq.less() && !eq.greater() && !eq.above() && !eq.below());

        let gt = Flags::compare(10, 3);
        assert!(gt.greater() && gt.above() && gt.not_equal());
        assert!(!gt.less() && !gt.below());
    }

    #[test]
    fn signed_and_unsigned_disagree() {
        // -1 vs 1: signed less, unsigned above.
        let flags = Flags::compare(u64::MAX, 1);
        assert!(flags.less());
        assert!(flags.above());
    }

    #[test]
    fn display() {
        assert_eq!(Flags::default().to_string(), "----");
        assert_eq!(Flags::compare(3, 10).to_string(), "-CS-");
    }
}
