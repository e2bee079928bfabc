//! The module containing the VMCS catalog.
//!
//! Each VMCS field is a module holding its encoding, the condition under which
//! it exists, one constant per subfield and the [`VmcsField`] descriptor.
//!
//! Two families of accessors are provided. The plain ones (`get`, `set`,
//! `enable`, `disable`) issue VMREAD and VMWRITE right away, and the caller is
//! responsible for the field existing. The `_if_exists` ones evaluate the
//! existence condition first and never issue the instruction for a field the
//! processor does not have. An absent field is reported through `log`, at
//! `warn` when `verbose` is set and at `trace` otherwise. Only the dump
//! accessors also pass it to the [`DumpSink`], as [`DumpValue::Absent`].
//!
//! See: APPENDIX B FIELD ENCODING IN VMCS

pub mod control;
pub mod encoding;
pub mod guest;
pub mod host;
pub mod ro;

use core::marker::PhantomData;

use crate::{
    access::{Access, ReadOnly, ReadWrite},
    backend::{MsrAccess, RegisterBackend, VmcsAccess},
    bits::Field,
    capability::{Control, Exists},
    dump::{self, DumpSink, DumpValue},
    error::Error,
};

use self::encoding::{FieldWidth, VmcsEncoding};

/// A VMCS field.
#[derive(Clone, Copy, Debug)]
pub struct VmcsField<A: Access = ReadWrite> {
    encoding: u32,
    name: &'static str,
    fields: &'static [Field],
    exists: Exists,
    access: PhantomData<A>,
}

impl<A: Access> VmcsField<A> {
    /// Defines a field that exists on every processor supporting VMX.
    #[must_use]
    pub const fn new(encoding: u32, name: &'static str, fields: &'static [Field]) -> Self {
        Self {
            encoding,
            name,
            fields,
            exists: Exists::Always,
            access: PhantomData,
        }
    }

    /// The field exists only when `exists` evaluates to true.
    #[must_use]
    pub const fn gated_by(mut self, exists: Exists) -> Self {
        self.exists = exists;
        self
    }

    /// Drops write access, so fields of different access can be listed
    /// together.
    #[must_use]
    pub const fn as_read_only(self) -> VmcsField<ReadOnly> {
        VmcsField {
            encoding: self.encoding,
            name: self.name,
            fields: self.fields,
            exists: self.exists,
            access: PhantomData,
        }
    }

    /// The encoding.
    #[must_use]
    pub const fn encoding(&self) -> u32 {
        self.encoding
    }

    /// The diagnostic name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The subfields, in bit order.
    #[must_use]
    pub const fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// The condition under which the field exists.
    #[must_use]
    pub const fn condition(&self) -> Exists {
        self.exists
    }

    /// The width, as encoded in the encoding.
    #[must_use]
    pub fn width(&self) -> FieldWidth {
        VmcsEncoding::from(self.encoding).width()
    }

    /// Tests whether the field exists on this processor.
    pub fn exists<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        self.exists.evaluate(cpu)
    }

    /// Returns [`Error::InvalidFieldAccess`] if the field does not exist on
    /// this processor.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn ensure_exists<B: MsrAccess + ?Sized>(&self, cpu: &B) -> Result<(), Error> {
        ensure_exists(cpu, &self.exists, self.name, self.encoding)
    }

    /// Reads the field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn get<B: VmcsAccess + ?Sized>(&self, cpu: &B) -> Result<u64, Error> {
        vmread(cpu, self.encoding, self.name)
    }

    /// Reads the field if it exists. Otherwise, returns `None` without issuing
    /// VMREAD.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn get_if_exists<B: RegisterBackend + ?Sized>(
        &self,
        cpu: &B,
        verbose: bool,
    ) -> Result<Option<u64>, Error> {
        if self.checked(cpu, verbose) {
            self.get(cpu).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Dumps the field and its subfields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn dump<B, S>(&self, cpu: &B, level: usize, sink: &mut S) -> Result<(), Error>
    where
        B: VmcsAccess + ?Sized,
        S: DumpSink + ?Sized,
    {
        dump::register(sink, level, self.name, self.get(cpu)?, self.fields);
        Ok(())
    }

    /// Dumps the field and its subfields if the field exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn dump_if_exists<B, S>(
        &self,
        cpu: &B,
        level: usize,
        verbose: bool,
        sink: &mut S,
    ) -> Result<(), Error>
    where
        B: RegisterBackend + ?Sized,
        S: DumpSink + ?Sized,
    {
        match self.get_if_exists(cpu, verbose)? {
            Some(value) => dump::register(sink, level, self.name, value, self.fields),
            None => dump::absent(sink, level, self.name, verbose),
        }
        Ok(())
    }

    fn checked<B: MsrAccess + ?Sized>(&self, cpu: &B, verbose: bool) -> bool {
        checked(cpu, &self.exists, self.name, self.encoding, verbose)
    }
}

impl VmcsField<ReadWrite> {
    /// Writes the field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMWRITE fails.
    pub fn set<B: VmcsAccess + ?Sized>(&self, cpu: &B, value: u64) -> Result<(), Error> {
        vmwrite(cpu, self.encoding, self.name, value)
    }

    /// Writes the field if it exists. Returns whether VMWRITE was issued.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMWRITE fails.
    pub fn set_if_exists<B: RegisterBackend + ?Sized>(
        &self,
        cpu: &B,
        value: u64,
        verbose: bool,
    ) -> Result<bool, Error> {
        if !self.checked(cpu, verbose) {
            return Ok(false);
        }
        self.set(cpu, value)?;
        Ok(true)
    }
}

/// A subfield of a VMCS field.
///
/// A subfield of a control field is tied to the [`Control`] reporting its
/// allowed settings.
#[derive(Clone, Copy, Debug)]
pub struct VmcsSubfield<A: Access = ReadWrite> {
    encoding: u32,
    parent: &'static str,
    exists: Exists,
    field: Field,
    control: Option<Control>,
    access: PhantomData<A>,
}

impl<A: Access> VmcsSubfield<A> {
    /// Defines a single-bit subfield at `bit`.
    #[must_use]
    pub const fn flag(
        encoding: u32,
        parent: &'static str,
        exists: Exists,
        name: &'static str,
        bit: u32,
    ) -> Self {
        Self {
            encoding,
            parent,
            exists,
            field: Field::flag(name, bit),
            control: None,
            access: PhantomData,
        }
    }

    /// Defines a multi-bit subfield.
    #[must_use]
    pub const fn range(
        encoding: u32,
        parent: &'static str,
        exists: Exists,
        name: &'static str,
        mask: u64,
        from: u32,
    ) -> Self {
        Self {
            encoding,
            parent,
            exists,
            field: Field::range(name, mask, from),
            control: None,
            access: PhantomData,
        }
    }

    /// Defines a control bit, at the bit position of `control`.
    #[must_use]
    pub const fn control(
        encoding: u32,
        parent: &'static str,
        exists: Exists,
        name: &'static str,
        control: Control,
    ) -> Self {
        Self {
            encoding,
            parent,
            exists,
            field: Field::flag(name, control.field().from()),
            control: Some(control),
            access: PhantomData,
        }
    }

    /// The bit layout, for operating on a snapshot of the field.
    #[must_use]
    pub const fn field(&self) -> Field {
        self.field
    }

    /// The control this subfield is, if any.
    #[must_use]
    pub const fn as_control(&self) -> Option<Control> {
        self.control
    }

    /// The encoding of the containing field.
    #[must_use]
    pub const fn encoding(&self) -> u32 {
        self.encoding
    }

    /// Tests whether the containing field exists on this processor.
    pub fn exists<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        self.exists.evaluate(cpu)
    }

    /// Tests whether the subfield may be 0. Always true unless it is a
    /// control.
    pub fn is_allowed0<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        self.control.is_none_or(|control| control.is_allowed0(cpu))
    }

    /// Tests whether the subfield may be 1. Always true unless it is a
    /// control.
    pub fn is_allowed1<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        self.control.is_none_or(|control| control.is_allowed1(cpu))
    }

    /// Reads the field and decodes the subfield.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn get<B: VmcsAccess + ?Sized>(&self, cpu: &B) -> Result<u64, Error> {
        Ok(self.field.get(self.raw(cpu)?))
    }

    /// Reads the field and tests whether the flag is 1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn is_enabled<B: VmcsAccess + ?Sized>(&self, cpu: &B) -> Result<bool, Error> {
        Ok(self.field.is_enabled(self.raw(cpu)?))
    }

    /// Reads the field and tests whether the flag is 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn is_disabled<B: VmcsAccess + ?Sized>(&self, cpu: &B) -> Result<bool, Error> {
        Ok(!self.is_enabled(cpu)?)
    }

    /// Decodes the subfield if the field exists. Otherwise, returns `None`
    /// without issuing VMREAD.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn get_if_exists<B: RegisterBackend + ?Sized>(
        &self,
        cpu: &B,
        verbose: bool,
    ) -> Result<Option<u64>, Error> {
        if self.checked(cpu, verbose) {
            self.get(cpu).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Tests whether the flag is 1 if the field exists. Otherwise, returns
    /// `None` without issuing VMREAD.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn is_enabled_if_exists<B: RegisterBackend + ?Sized>(
        &self,
        cpu: &B,
        verbose: bool,
    ) -> Result<Option<bool>, Error> {
        if self.checked(cpu, verbose) {
            self.is_enabled(cpu).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Tests whether the flag is 0 if the field exists. Otherwise, returns
    /// `None` without issuing VMREAD.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn is_disabled_if_exists<B: RegisterBackend + ?Sized>(
        &self,
        cpu: &B,
        verbose: bool,
    ) -> Result<Option<bool>, Error> {
        Ok(self.is_enabled_if_exists(cpu, verbose)?.map(|enabled| !enabled))
    }

    /// Dumps the decoded subfield.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn dump<B, S>(&self, cpu: &B, level: usize, sink: &mut S) -> Result<(), Error>
    where
        B: VmcsAccess + ?Sized,
        S: DumpSink + ?Sized,
    {
        dump::subfield(sink, level, &self.field, self.raw(cpu)?);
        Ok(())
    }

    /// Dumps the decoded subfield if the field exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD fails.
    pub fn dump_if_exists<B, S>(
        &self,
        cpu: &B,
        level: usize,
        verbose: bool,
        sink: &mut S,
    ) -> Result<(), Error>
    where
        B: RegisterBackend + ?Sized,
        S: DumpSink + ?Sized,
    {
        if self.checked(cpu, verbose) {
            self.dump(cpu, level, sink)
        } else {
            dump::absent(sink, level, self.field.name(), verbose);
            Ok(())
        }
    }

    fn raw<B: VmcsAccess + ?Sized>(&self, cpu: &B) -> Result<u64, Error> {
        vmread(cpu, self.encoding, self.parent)
    }

    fn checked<B: MsrAccess + ?Sized>(&self, cpu: &B, verbose: bool) -> bool {
        checked(cpu, &self.exists, self.parent, self.encoding, verbose)
    }
}

impl VmcsSubfield<ReadWrite> {
    /// Replaces the subfield, preserving the other bits of the field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD or VMWRITE fails.
    pub fn set<B: VmcsAccess + ?Sized>(&self, cpu: &B, value: u64) -> Result<(), Error> {
        let raw = self.raw(cpu)?;
        vmwrite(cpu, self.encoding, self.parent, self.field.set(raw, value))
    }

    /// Sets the flag, preserving the other bits of the field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD or VMWRITE fails.
    pub fn enable<B: VmcsAccess + ?Sized>(&self, cpu: &B) -> Result<(), Error> {
        let raw = self.raw(cpu)?;
        vmwrite(cpu, self.encoding, self.parent, self.field.enable(raw))
    }

    /// Clears the flag, preserving the other bits of the field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD or VMWRITE fails.
    pub fn disable<B: VmcsAccess + ?Sized>(&self, cpu: &B) -> Result<(), Error> {
        let raw = self.raw(cpu)?;
        vmwrite(cpu, self.encoding, self.parent, self.field.disable(raw))
    }

    /// Replaces the subfield if the field exists. Returns whether the field
    /// was written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD or VMWRITE fails.
    pub fn set_if_exists<B: RegisterBackend + ?Sized>(
        &self,
        cpu: &B,
        value: u64,
        verbose: bool,
    ) -> Result<bool, Error> {
        if !self.checked(cpu, verbose) {
            return Ok(false);
        }
        self.set(cpu, value)?;
        Ok(true)
    }

    /// Sets the flag if the field exists. Returns whether the field was
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD or VMWRITE fails.
    pub fn enable_if_exists<B: RegisterBackend + ?Sized>(
        &self,
        cpu: &B,
        verbose: bool,
    ) -> Result<bool, Error> {
        if !self.checked(cpu, verbose) {
            return Ok(false);
        }
        self.enable(cpu)?;
        Ok(true)
    }

    /// Clears the flag if the field exists. Returns whether the field was
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD or VMWRITE fails.
    pub fn disable_if_exists<B: RegisterBackend + ?Sized>(
        &self,
        cpu: &B,
        verbose: bool,
    ) -> Result<bool, Error> {
        if !self.checked(cpu, verbose) {
            return Ok(false);
        }
        self.disable(cpu)?;
        Ok(true)
    }

    /// Sets the flag if the field exists and the processor allows it to be 1.
    /// Returns whether the field was written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD or VMWRITE fails.
    pub fn enable_if_allowed<B: RegisterBackend + ?Sized>(
        &self,
        cpu: &B,
        verbose: bool,
    ) -> Result<bool, Error> {
        if !self.checked(cpu, verbose) {
            return Ok(false);
        }
        if !self.is_allowed1(cpu) {
            report_not_allowed(self.parent, self.field.name(), 1, verbose);
            return Ok(false);
        }
        self.enable(cpu)?;
        Ok(true)
    }

    /// Clears the flag if the field exists and the processor allows it to be
    /// 0. Returns whether the field was written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HardwareFault`] if VMREAD or VMWRITE fails.
    pub fn disable_if_allowed<B: RegisterBackend + ?Sized>(
        &self,
        cpu: &B,
        verbose: bool,
    ) -> Result<bool, Error> {
        if !self.checked(cpu, verbose) {
            return Ok(false);
        }
        if !self.is_allowed0(cpu) {
            report_not_allowed(self.parent, self.field.name(), 0, verbose);
            return Ok(false);
        }
        self.disable(cpu)?;
        Ok(true)
    }
}

fn vmread<B: VmcsAccess + ?Sized>(
    cpu: &B,
    encoding: u32,
    name: &'static str,
) -> Result<u64, Error> {
    cpu.vmread(encoding).map_err(|fail| Error::HardwareFault {
        name,
        encoding,
        fail,
    })
}

fn vmwrite<B: VmcsAccess + ?Sized>(
    cpu: &B,
    encoding: u32,
    name: &'static str,
    value: u64,
) -> Result<(), Error> {
    cpu.vmwrite(encoding, value).map_err(|fail| Error::HardwareFault {
        name,
        encoding,
        fail,
    })
}

fn ensure_exists<B: MsrAccess + ?Sized>(
    cpu: &B,
    exists: &Exists,
    name: &'static str,
    encoding: u32,
) -> Result<(), Error> {
    if exists.evaluate(cpu) {
        Ok(())
    } else {
        Err(Error::InvalidFieldAccess { name, encoding })
    }
}

fn checked<B: MsrAccess + ?Sized>(
    cpu: &B,
    exists: &Exists,
    name: &'static str,
    encoding: u32,
    verbose: bool,
) -> bool {
    match ensure_exists(cpu, exists, name, encoding) {
        Ok(()) => true,
        Err(error) => {
            if verbose {
                log::warn!("{error}");
            } else {
                log::trace!("{error}");
            }
            false
        }
    }
}

fn report_not_allowed(name: &str, control: &str, setting: u8, verbose: bool) {
    if verbose {
        log::warn!("{name}.{control} cannot be {setting} on this processor");
    } else {
        log::trace!("{name}.{control} cannot be {setting} on this processor");
    }
}

/// Dumps every field that exists on this processor, grouped by type.
///
/// The current VMCS must be loaded.
///
/// # Errors
///
/// Returns [`Error::HardwareFault`] if VMREAD fails.
pub fn dump_all_if_exists<B, S>(cpu: &B, verbose: bool, sink: &mut S) -> Result<(), Error>
where
    B: RegisterBackend + ?Sized,
    S: DumpSink + ?Sized,
{
    let sections: [(&str, &[VmcsField<ReadOnly>]); 4] = [
        ("control", control::ALL),
        ("guest", guest::ALL),
        ("host", host::ALL),
        ("read-only data", ro::ALL),
    ];
    for (section, fields) in sections {
        sink.emit(0, section, DumpValue::Section);
        for field in fields {
            field.dump_if_exists(cpu, 1, verbose, sink)?;
        }
    }
    ro::dump_decoded(cpu, 1, sink)
}

/// Defines one module per VMCS field, and the list of all of them.
///
/// ```text
/// vmcs_fields! {
///     const ALL: "guest_";
///
///     /// Doc of the field.
///     pub mod ia32_efer: ReadWrite = 0x2806 [exists: Exists::Always] {
///         SCE: sce = flag(0),
///         LME: lme = flag(8),
///     }
/// }
/// ```
macro_rules! vmcs_fields {
    (@exists) => {
        Exists::Always
    };
    (@exists $exists:expr) => {
        $exists
    };
    (
        const $catalog:ident: $prefix:literal;
        $(
            $(#[$meta:meta])*
            pub mod $name:ident: $access:ident = $encoding:literal $([exists: $exists:expr])? {
                $(
                    $(#[$fmeta:meta])*
                    $sub:ident: $sname:ident = $kind:ident($($arg:expr),+ $(,)?)
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
                    vmcs::{VmcsField, VmcsSubfield},
                };

                /// The encoding.
                pub const ENCODING: u32 = $encoding;

                /// The diagnostic name.
                pub const NAME: &str = concat!($prefix, stringify!($name));

                /// The condition under which the field exists.
                pub const EXISTS: Exists = $crate::vmcs::vmcs_fields!(@exists $($exists)?);

                $(
                    #[doc = concat!("`", stringify!($sname), "`")]
                    $(#[$fmeta])*
                    pub const $sub: VmcsSubfield<$access> =
                        VmcsSubfield::$kind(ENCODING, NAME, EXISTS, stringify!($sname), $($arg),+);
                )*

                /// Every subfield, in bit order.
                pub const FIELDS: &[Field] = &[$($sub.field()),*];

                /// The field.
                pub const FIELD: VmcsField<$access> =
                    VmcsField::new(ENCODING, NAME, FIELDS).gated_by(EXISTS);
            }
        )*

        /// Every field defined in this module, in encoding order.
        pub const $catalog: &[$crate::vmcs::VmcsField<$crate::access::ReadOnly>] =
            &[$($name::FIELD.as_read_only()),*];
    };
}
pub(crate) use vmcs_fields;
