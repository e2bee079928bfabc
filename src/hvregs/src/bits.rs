//! The module containing the bit-field codec.
//!
//! Every register accessor in this crate is a thin wrapper of the functions and
//! the [`Field`] descriptor defined here. Nothing in this module touches
//! hardware.

use bit_field::BitField;

/// Returns `value & mask`, without shifting the result.
#[must_use]
pub const fn get_bits(value: u64, mask: u64) -> u64 {
    value & mask
}

/// Tests whether the bit `pos` of `value` is 1.
#[must_use]
pub fn is_bit_set(value: u64, pos: u32) -> bool {
    value.get_bit(pos as usize)
}

/// Tests whether the bit `pos` of `value` is 0.
#[must_use]
pub fn is_bit_cleared(value: u64, pos: u32) -> bool {
    !is_bit_set(value, pos)
}

/// Returns `value` with the bit `pos` set.
#[must_use]
pub fn set_bit(value: u64, pos: u32) -> u64 {
    let mut value = value;
    let _ = value.set_bit(pos as usize, true);
    value
}

/// Returns `value` with the bit `pos` cleared.
#[must_use]
pub fn clear_bit(value: u64, pos: u32) -> u64 {
    let mut value = value;
    let _ = value.set_bit(pos as usize, false);
    value
}

/// Whether a [`Field`] is a single-bit flag or a multi-bit number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// A single bit. Decoded as a boolean.
    Flag,
    /// A contiguous run of bits. Decoded as a number.
    Range,
}

/// A named run of bits within a 64-bit register.
///
/// `mask` is the unshifted mask of the field and `from` is the position of its
/// lowest bit. Both are fixed when the descriptor is defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    name: &'static str,
    mask: u64,
    from: u32,
    kind: FieldKind,
}

impl Field {
    /// Defines a single-bit field at `bit`.
    #[must_use]
    pub const fn flag(name: &'static str, bit: u32) -> Self {
        Self {
            name,
            mask: 1 << bit,
            from: bit,
            kind: FieldKind::Flag,
        }
    }

    /// Defines a multi-bit field covered by `mask`, whose lowest bit is `from`.
    #[must_use]
    pub const fn range(name: &'static str, mask: u64, from: u32) -> Self {
        Self {
            name,
            mask,
            from,
            kind: FieldKind::Range,
        }
    }

    /// The diagnostic name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The unshifted mask.
    #[must_use]
    pub const fn mask(&self) -> u64 {
        self.mask
    }

    /// The position of the lowest bit.
    #[must_use]
    pub const fn from(&self) -> u32 {
        self.from
    }

    /// The kind of the field.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The largest value the field can hold once shifted down.
    #[must_use]
    pub const fn max(&self) -> u64 {
        self.mask >> self.from
    }

    /// The number of bits the field covers.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.max().count_ones()
    }

    /// Tests that the mask is one gap-free run of bits starting at `from`.
    #[must_use]
    pub const fn is_contiguous(&self) -> bool {
        if self.from >= u64::BITS {
            return false;
        }
        let max = self.max();
        let below_from = self.mask & ((1u64 << self.from) - 1);
        max != 0 && below_from == 0 && (max & max.wrapping_add(1)) == 0
    }

    /// Decodes the field from the register value `raw`.
    #[must_use]
    pub const fn get(&self, raw: u64) -> u64 {
        get_bits(raw, self.mask) >> self.from
    }

    /// Returns `raw` with the field replaced by `value`. Bits of `value` that do
    /// not fit in the field are dropped, and the rest of `raw` is preserved.
    #[must_use]
    pub const fn set(&self, raw: u64, value: u64) -> u64 {
        (raw & !self.mask) | ((value << self.from) & self.mask)
    }

    /// Tests whether the flag is 1 in `raw`.
    #[must_use]
    pub fn is_enabled(&self, raw: u64) -> bool {
        debug_assert_eq!(self.kind, FieldKind::Flag, "{} is not a flag", self.name);
        is_bit_set(raw, self.from)
    }

    /// Tests whether the flag is 0 in `raw`.
    #[must_use]
    pub fn is_disabled(&self, raw: u64) -> bool {
        !self.is_enabled(raw)
    }

    /// Returns `raw` with the flag set.
    #[must_use]
    pub fn enable(&self, raw: u64) -> u64 {
        debug_assert_eq!(self.kind, FieldKind::Flag, "{} is not a flag", self.name);
        set_bit(raw, self.from)
    }

    /// Returns `raw` with the flag cleared.
    #[must_use]
    pub fn disable(&self, raw: u64) -> u64 {
        debug_assert_eq!(self.kind, FieldKind::Flag, "{} is not a flag", self.name);
        clear_bit(raw, self.from)
    }

    /// Tests whether the control at this bit may be 0, according to the
    /// capability MSR value `cap`: the bit in the low 32 bits is 0.
    ///
    /// See: A.3.1 Pin-Based VM-Execution Controls
    #[must_use]
    pub fn is_allowed0(&self, cap: u64) -> bool {
        debug_assert!(self.from < 32, "{} is not a 32-bit control", self.name);
        is_bit_cleared(cap, self.from)
    }

    /// Tests whether the control at this bit may be 1, according to the
    /// capability MSR value `cap`: the bit in the high 32 bits is 1.
    #[must_use]
    pub fn is_allowed1(&self, cap: u64) -> bool {
        debug_assert!(self.from < 32, "{} is not a 32-bit control", self.name);
        is_bit_set(cap, self.from + 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUES: [u64; 6] = [
        0,
        u64::MAX,
        0x5555_5555_5555_5555,
        0xaaaa_aaaa_aaaa_aaaa,
        0x8000_0000_0000_0001,
        0x0123_4567_89ab_cdef,
    ];

    #[test]
    fn set_and_clear_touch_only_one_bit() {
        for value in VALUES {
            for pos in 0..64 {
                let set = set_bit(value, pos);
                assert!(is_bit_set(set, pos));
                assert_eq!(set & !(1 << pos), value & !(1 << pos));

                let cleared = clear_bit(value, pos);
                assert!(is_bit_cleared(cleared, pos));
                assert_eq!(cleared & !(1 << pos), value & !(1 << pos));
            }
        }
    }

    #[test]
    fn clear_undoes_set_on_cleared_bits() {
        for value in VALUES {
            for pos in 0..64 {
                let value = clear_bit(value, pos);
                assert_eq!(clear_bit(set_bit(value, pos), pos), value);
            }
        }
    }

    #[test]
    fn get_bits_is_unshifted() {
        assert_eq!(get_bits(0xffff, 0xf0), 0xf0);
        assert_eq!(get_bits(0x1234_5678, 0xff00_0000), 0x1200_0000);
    }

    #[test]
    fn field_round_trip_masks_to_width() {
        let field = Field::range("senter_local_function_enables", 0x7f00, 8);
        assert!(field.is_contiguous());
        assert_eq!(field.width(), 7);
        assert_eq!(field.max(), 0x7f);

        for raw in VALUES {
            for value in [0, 1, 0x7f, 0x80, u64::MAX] {
                let new = field.set(raw, value);
                assert_eq!(field.get(new), value & field.max());
                assert_eq!(new & !field.mask(), raw & !field.mask());
            }
        }
    }

    #[test]
    fn full_width_field() {
        let field = Field::range("everything", u64::MAX, 0);
        assert!(field.is_contiguous());
        assert_eq!(field.width(), 64);
        assert_eq!(field.set(0, u64::MAX), u64::MAX);
    }

    #[test]
    fn contiguity() {
        assert!(Field::flag("bit63", 63).is_contiguous());
        assert!(!Field::range("gap", 0b1011_0000, 4).is_contiguous());
        assert!(!Field::range("misplaced_from", 0xf0, 2).is_contiguous());
        assert!(!Field::range("empty", 0, 0).is_contiguous());
    }

    #[test]
    fn flag_operations() {
        let lock_bit = Field::flag("lock_bit", 0);
        assert!(lock_bit.is_enabled(0x1));
        assert!(lock_bit.is_disabled(0x0));
        assert_eq!(lock_bit.enable(0x0), 0x1);
        assert_eq!(lock_bit.disable(0x1), 0x0);
    }

    #[test]
    fn allowed_settings() {
        let control = Field::flag("bit5", 5);
        let cases = [
            // (low bit, high bit) => (allowed0, allowed1)
            (0u64, 0u64, true, false),
            (0, 1, true, true),
            (1, 0, false, false),
            (1, 1, false, true),
        ];
        for (low, high, allowed0, allowed1) in cases {
            let cap = (low << 5) | (high << (32 + 5));
            assert_eq!(control.is_allowed0(cap), allowed0, "{cap:#x}");
            assert_eq!(control.is_allowed1(cap), allowed1, "{cap:#x}");
        }
    }
}
