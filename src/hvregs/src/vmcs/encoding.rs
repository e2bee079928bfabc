//! The VMCS component encoding.

bitfield::bitfield! {
    /// The 32-bit value VMREAD and VMWRITE take to select a VMCS field.
    ///
    /// See: 25.11.2 VMREAD, VMWRITE, and Encodings of VMCS Fields
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct VmcsEncoding(u32);
    impl Debug;
    /// 1 to access the high 32 bits of a 64-bit field.
    pub high, _: 0;
    /// Distinguishes fields of the same width and type.
    pub index, _: 9, 1;
    /// The raw field type. See [`VmcsEncoding::field_type`].
    pub raw_type, _: 11, 10;
    /// The raw width. See [`VmcsEncoding::width`].
    pub raw_width, _: 14, 13;
}

/// The width of a VMCS field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum FieldWidth {
    /// 16-bit
    #[display("16-bit")]
    Word,
    /// 64-bit
    #[display("64-bit")]
    Qword,
    /// 32-bit
    #[display("32-bit")]
    Dword,
    /// Natural-width, 64-bit on processors that support Intel 64.
    #[display("natural-width")]
    Natural,
}

impl FieldWidth {
    /// The number of bits on a processor supporting Intel 64.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Word => 16,
            Self::Dword => 32,
            Self::Qword | Self::Natural => 64,
        }
    }
}

/// The type of a VMCS field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum FieldType {
    /// VM-execution, VM-exit and VM-entry control fields.
    #[display("control")]
    Control,
    /// VM-exit information fields.
    #[display("read-only data")]
    ReadOnly,
    /// Guest-state fields.
    #[display("guest-state")]
    Guest,
    /// Host-state fields.
    #[display("host-state")]
    Host,
}

impl From<u32> for VmcsEncoding {
    fn from(encoding: u32) -> Self {
        Self(encoding)
    }
}

impl VmcsEncoding {
    /// The width of the field.
    #[must_use]
    pub fn width(&self) -> FieldWidth {
        match self.raw_width() {
            0 => FieldWidth::Word,
            1 => FieldWidth::Qword,
            2 => FieldWidth::Dword,
            _ => FieldWidth::Natural,
        }
    }

    /// The type of the field.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self.raw_type() {
            0 => FieldType::Control,
            1 => FieldType::ReadOnly,
            2 => FieldType::Guest,
            _ => FieldType::Host,
        }
    }

    /// Tests that the reserved bits 12 and 31:15 are 0.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.0 & 0xffff_9000 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode() {
        // Guest IA32_EFER (full)
        let efer = VmcsEncoding(0x2806);
        assert!(efer.is_valid());
        assert!(!efer.high());
        assert_eq!(efer.index(), 3);
        assert_eq!(efer.width(), FieldWidth::Qword);
        assert_eq!(efer.field_type(), FieldType::Guest);

        // Guest IA32_EFER (high)
        assert!(VmcsEncoding(0x2807).high());

        let exit_reason = VmcsEncoding(0x4402);
        assert_eq!(exit_reason.width(), FieldWidth::Dword);
        assert_eq!(exit_reason.field_type(), FieldType::ReadOnly);

        let host_rip = VmcsEncoding(0x6c16);
        assert_eq!(host_rip.width(), FieldWidth::Natural);
        assert_eq!(host_rip.field_type(), FieldType::Host);
        assert_eq!(host_rip.width().bits(), 64);

        let vpid = VmcsEncoding(0x0000);
        assert_eq!(vpid.width(), FieldWidth::Word);
        assert_eq!(vpid.field_type(), FieldType::Control);

        assert!(!VmcsEncoding(0x1_2806).is_valid());
    }
}
