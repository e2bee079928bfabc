//! The module containing the MSR catalog.
//!
//! Each MSR is a module holding its address, one constant per field, the list
//! of its fields and the [`Msr`] descriptor. The accessors are generic over
//! those descriptors and issue RDMSR and WRMSR through [`MsrAccess`].
//!
//! Field accessors that take `cpu` read or write the hardware. Their pure
//! counterparts are on [`MsrField::field`] and operate on a snapshot, so that
//! several fields can be updated with one WRMSR:
//!
//! ```
//! use hvregs::msr::arch::ia32_feature_control as fc;
//!
//! let value = fc::ENABLE_VMX_OUTSIDE_SMX.field().enable(0);
//! let value = fc::LOCK_BIT.field().enable(value);
//! assert_eq!(value, 0b101);
//! ```

pub mod arch;
pub mod vmx;

use core::marker::PhantomData;

use crate::{
    access::{Access, ReadOnly, ReadWrite},
    backend::MsrAccess,
    bits::Field,
    capability::Exists,
    dump::{self, DumpSink},
};

/// A model-specific register.
#[derive(Clone, Copy, Debug)]
pub struct Msr<A: Access = ReadWrite> {
    addr: u32,
    name: &'static str,
    fields: &'static [Field],
    exists: Exists,
    access: PhantomData<A>,
}

impl<A: Access> Msr<A> {
    /// Defines an MSR that exists on every processor this crate supports.
    #[must_use]
    pub const fn new(addr: u32, name: &'static str, fields: &'static [Field]) -> Self {
        Self {
            addr,
            name,
            fields,
            exists: Exists::Always,
            access: PhantomData,
        }
    }

    /// The MSR is implemented only when `exists` evaluates to true.
    #[must_use]
    pub const fn gated_by(mut self, exists: Exists) -> Self {
        self.exists = exists;
        self
    }

    /// Drops write access, so MSRs of different access can be listed together.
    #[must_use]
    pub const fn as_read_only(self) -> Msr<ReadOnly> {
        Msr {
            addr: self.addr,
            name: self.name,
            fields: self.fields,
            exists: self.exists,
            access: PhantomData,
        }
    }

    /// The address.
    #[must_use]
    pub const fn address(&self) -> u32 {
        self.addr
    }

    /// The diagnostic name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The fields, in bit order.
    #[must_use]
    pub const fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// The condition under which the MSR is implemented.
    #[must_use]
    pub const fn condition(&self) -> Exists {
        self.exists
    }

    /// Tests whether the MSR is implemented on this processor.
    pub fn exists<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        self.exists.evaluate(cpu)
    }

    /// Reads the MSR.
    pub fn get<B: MsrAccess + ?Sized>(&self, cpu: &B) -> u64 {
        cpu.rdmsr(self.addr)
    }

    /// Reads the MSR if it is implemented. Otherwise, returns `None` without
    /// issuing RDMSR.
    pub fn get_if_exists<B: MsrAccess + ?Sized>(&self, cpu: &B, verbose: bool) -> Option<u64> {
        if self.exists(cpu) {
            Some(self.get(cpu))
        } else {
            report_absent(self.name, self.addr, verbose);
            None
        }
    }

    /// Dumps the MSR and its fields.
    pub fn dump<B, S>(&self, cpu: &B, level: usize, sink: &mut S)
    where
        B: MsrAccess + ?Sized,
        S: DumpSink + ?Sized,
    {
        dump::register(sink, level, self.name, self.get(cpu), self.fields);
    }

    /// Dumps the MSR and its fields if it is implemented.
    pub fn dump_if_exists<B, S>(&self, cpu: &B, level: usize, verbose: bool, sink: &mut S)
    where
        B: MsrAccess + ?Sized,
        S: DumpSink + ?Sized,
    {
        match self.get_if_exists(cpu, verbose) {
            Some(value) => dump::register(sink, level, self.name, value, self.fields),
            None => dump::absent(sink, level, self.name, verbose),
        }
    }
}

impl Msr<ReadWrite> {
    /// Overwrites the MSR.
    pub fn set<B: MsrAccess + ?Sized>(&self, cpu: &B, value: u64) {
        cpu.wrmsr(self.addr, value);
    }

    /// Overwrites the MSR if it is implemented. Returns whether WRMSR was
    /// issued.
    pub fn set_if_exists<B: MsrAccess + ?Sized>(&self, cpu: &B, value: u64, verbose: bool) -> bool {
        if self.exists(cpu) {
            self.set(cpu, value);
            true
        } else {
            report_absent(self.name, self.addr, verbose);
            false
        }
    }
}

/// A field of a model-specific register.
#[derive(Clone, Copy, Debug)]
pub struct MsrField<A: Access = ReadWrite> {
    addr: u32,
    field: Field,
    access: PhantomData<A>,
}

impl<A: Access> MsrField<A> {
    /// Defines a single-bit field at `bit` of the MSR at `addr`.
    #[must_use]
    pub const fn flag(addr: u32, name: &'static str, bit: u32) -> Self {
        Self {
            addr,
            field: Field::flag(name, bit),
            access: PhantomData,
        }
    }

    /// Defines a multi-bit field of the MSR at `addr`.
    #[must_use]
    pub const fn range(addr: u32, name: &'static str, mask: u64, from: u32) -> Self {
        Self {
            addr,
            field: Field::range(name, mask, from),
            access: PhantomData,
        }
    }

    /// The address of the MSR containing this field.
    #[must_use]
    pub const fn address(&self) -> u32 {
        self.addr
    }

    /// The bit layout, for operating on a snapshot of the MSR.
    #[must_use]
    pub const fn field(&self) -> Field {
        self.field
    }

    /// Reads the MSR and decodes the field.
    pub fn get<B: MsrAccess + ?Sized>(&self, cpu: &B) -> u64 {
        self.field.get(cpu.rdmsr(self.addr))
    }

    /// Reads the MSR and tests whether the flag is 1.
    pub fn is_enabled<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        self.field.is_enabled(cpu.rdmsr(self.addr))
    }

    /// Reads the MSR and tests whether the flag is 0.
    pub fn is_disabled<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        !self.is_enabled(cpu)
    }

    /// Dumps the decoded field.
    pub fn dump<B, S>(&self, cpu: &B, level: usize, sink: &mut S)
    where
        B: MsrAccess + ?Sized,
        S: DumpSink + ?Sized,
    {
        dump::subfield(sink, level, &self.field, cpu.rdmsr(self.addr));
    }
}

impl MsrField<ReadWrite> {
    /// Replaces the field, preserving the other bits of the MSR.
    pub fn set<B: MsrAccess + ?Sized>(&self, cpu: &B, value: u64) {
        let raw = cpu.rdmsr(self.addr);
        cpu.wrmsr(self.addr, self.field.set(raw, value));
    }

    /// Sets the flag, preserving the other bits of the MSR.
    pub fn enable<B: MsrAccess + ?Sized>(&self, cpu: &B) {
        let raw = cpu.rdmsr(self.addr);
        cpu.wrmsr(self.addr, self.field.enable(raw));
    }

    /// Clears the flag, preserving the other bits of the MSR.
    pub fn disable<B: MsrAccess + ?Sized>(&self, cpu: &B) {
        let raw = cpu.rdmsr(self.addr);
        cpu.wrmsr(self.addr, self.field.disable(raw));
    }
}

fn report_absent(name: &str, addr: u32, verbose: bool) {
    if verbose {
        log::warn!("{name} ({addr:#x}) is not implemented on this processor");
    } else {
        log::trace!("{name} ({addr:#x}) is not implemented on this processor");
    }
}

/// Defines one module per MSR. When the first line names a constant, also
/// defines the list of all of them under that name.
///
/// ```text
/// msr! {
///     const CATALOG;
///
///     /// Doc of the MSR.
///     pub mod ia32_example: ReadWrite = 0x1234 [exists: Exists::Always] {
///         ENABLE: enable = flag(0),
///         COUNT: count = range(0xff00, 8),
///     }
/// }
/// ```
macro_rules! msr {
    (
        const $catalog:ident;
        $(
            $(#[$meta:meta])*
            pub mod $name:ident: $access:ident = $addr:literal $([exists: $exists:expr])? {
                $($body:tt)*
            }
        )*
    ) => {
        $crate::msr::msr! {
            $(
                $(#[$meta])*
                pub mod $name: $access = $addr $([exists: $exists])? {
                    $($body)*
                }
            )*
        }

        /// Every MSR defined in this module.
        pub const $catalog: &[$crate::msr::Msr<$crate::access::ReadOnly>] =
            &[$($name::MSR.as_read_only()),*];
    };

    (
        $(
            $(#[$meta:meta])*
            pub mod $name:ident: $access:ident = $addr:literal $([exists: $exists:expr])? {
                $(
                    $(#[$fmeta:meta])*
                    $field:ident: $fname:ident = $kind:ident($($arg:expr),+ $(,)?)
                ),* $(,)?
            }
        )*
    ) => {
        $(
            $(#[$meta])*
            pub mod $name {
                #[allow(unused_imports)]
                use $crate::{
                    access::$access,
                    bits::Field,
                    capability::Exists,
                    msr::{Msr, MsrField},
                };

                /// The address.
                pub const ADDR: u32 = $addr;

                $(
                    #[doc = concat!("`", stringify!($fname), "`")]
                    $(#[$fmeta])*
                    pub const $field: MsrField<$access> =
                        MsrField::$kind(ADDR, stringify!($fname), $($arg),+);
                )*

                /// Every field, in bit order.
                pub const FIELDS: &[Field] = &[$($field.field()),*];

                /// The register.
                pub const MSR: Msr<$access> =
                    Msr::new(ADDR, stringify!($name), FIELDS)$(.gated_by($exists))?;
            }
        )*
    };
}
pub(crate) use msr;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MockCpu, init_logger};

    #[test]
    fn every_field_is_contiguous_and_distinct() {
        for msr in arch::CATALOG.iter().chain(vmx::CATALOG) {
            let mut seen = 0u64;
            for field in msr.fields() {
                assert!(field.is_contiguous(), "{}.{}", msr.name(), field.name());
                assert_eq!(
                    field.mask() & seen,
                    0,
                    "{}.{} overlaps",
                    msr.name(),
                    field.name()
                );
                seen |= field.mask();
            }
        }
    }

    #[test]
    fn catalog_addresses_are_unique() {
        let catalog: alloc::vec::Vec<_> = arch::CATALOG.iter().chain(vmx::CATALOG).collect();
        for (i, a) in catalog.iter().enumerate() {
            for b in &catalog[i + 1..] {
                assert_ne!(a.address(), b.address(), "{} and {}", a.name(), b.name());
            }
        }
    }

    #[test]
    fn field_set_preserves_other_bits() {
        init_logger();
        let efer = &arch::ia32_efer::NXE;
        let cpu = MockCpu::new().with_msr(0xc000_0080, 0x501);
        efer.enable(&cpu);
        assert_eq!(cpu.msr(0xc000_0080), Some(0xd01));
        efer.disable(&cpu);
        assert_eq!(cpu.msr(0xc000_0080), Some(0x501));

        let cpu = MockCpu::new().with_msr(0x3a, 0xffff_0005);
        arch::ia32_feature_control::SENTER_LOCAL_FUNCTION_ENABLES.set(&cpu, 0x1ff);
        assert_eq!(cpu.msr(0x3a), Some(0xffff_7f05));
        assert_eq!(
            arch::ia32_feature_control::SENTER_LOCAL_FUNCTION_ENABLES.get(&cpu),
            0x7f
        );
    }

    #[test]
    fn every_field_set_then_get_masks_to_width() {
        for msr in arch::CATALOG.iter().chain(vmx::CATALOG) {
            let register = Msr::<ReadWrite>::new(msr.address(), msr.name(), msr.fields());
            for field in msr.fields() {
                let accessor = MsrField::<ReadWrite>::range(
                    msr.address(),
                    field.name(),
                    field.mask(),
                    field.from(),
                );
                for raw in [0, u64::MAX] {
                    for value in [0, 1, field.max(), u64::MAX] {
                        let cpu = MockCpu::new();
                        register.set(&cpu, raw);
                        accessor.set(&cpu, value);

                        let new = register.get(&cpu);
                        assert_eq!(
                            accessor.get(&cpu),
                            value & field.max(),
                            "{}.{}",
                            msr.name(),
                            field.name()
                        );
                        assert_eq!(
                            new & !field.mask(),
                            raw & !field.mask(),
                            "{}.{}",
                            msr.name(),
                            field.name()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn pure_forms_compose_into_one_write() {
        init_logger();
        let cpu = MockCpu::new().with_msr(0x3a, 0);
        let fc = &arch::ia32_feature_control::MSR;

        let value = fc.get(&cpu);
        let value = arch::ia32_feature_control::ENABLE_VMX_OUTSIDE_SMX
            .field()
            .enable(value);
        let value = arch::ia32_feature_control::LOCK_BIT.field().enable(value);
        fc.set(&cpu, value);

        assert_eq!(cpu.calls(), [Call::Rdmsr(0x3a), Call::Wrmsr(0x3a, 0b101)]);
    }

    #[test]
    fn lock_bit() {
        let lock_bit = arch::ia32_feature_control::LOCK_BIT;
        let cpu = MockCpu::new().with_msr(0x3a, 0x1);
        assert!(lock_bit.is_enabled(&cpu));
        assert!(!lock_bit.is_disabled(&cpu));
        assert_eq!(lock_bit.field().enable(0x0), 0x1);
        assert_eq!(lock_bit.field().disable(0x1), 0x0);
    }

    #[test]
    fn gated_msr_is_not_read_when_absent() {
        init_logger();
        // No secondary controls, so IA32_VMX_PROCBASED_CTLS2 is not implemented
        // and reading it would #GP in MockCpu.
        let cpu = MockCpu::new()
            .with_msr(0x480, 0)
            .with_msr(0x482, 0x7fff_ffff_0000_0000);
        let ctls2 = &vmx::ia32_vmx_procbased_ctls2::MSR;
        assert!(!ctls2.exists(&cpu));
        assert_eq!(ctls2.get_if_exists(&cpu, true), None);
        assert!(!cpu.calls().contains(&Call::Rdmsr(0x48b)));
    }

    #[test]
    fn write_if_exists() {
        init_logger();
        let cpu = MockCpu::new().with_msr(0x3a, 0);
        assert!(arch::ia32_feature_control::MSR.set_if_exists(&cpu, 0x5, false));
        assert_eq!(cpu.msr(0x3a), Some(0x5));
    }
}
