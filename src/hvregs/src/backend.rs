//! The module containing the hardware access traits.
//!
//! Every accessor in this crate reaches hardware only through these traits, so
//! a hypervisor wires them to the real instructions with [`CurrentCpu`] and
//! tests substitute a recording mock.

/// How a VMX instruction failed.
///
/// See: 31.2 CONVENTIONS
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VmFail {
    /// No VMCS is current, or the VMCS pointer is invalid.
    VmFailInvalid,
    /// The instruction failed for another reason, such as an unsupported
    /// encoding. The VM-instruction error field holds the number.
    VmFailValid,
}

#[cfg(all(feature = "hardware", target_arch = "x86_64"))]
impl From<x86::vmx::VmFail> for VmFail {
    fn from(fail: x86::vmx::VmFail) -> Self {
        match fail {
            x86::vmx::VmFail::VmFailInvalid => Self::VmFailInvalid,
            x86::vmx::VmFail::VmFailValid => Self::VmFailValid,
        }
    }
}

/// RDMSR and WRMSR on the current logical processor.
pub trait MsrAccess {
    /// Reads an MSR.
    fn rdmsr(&self, msr: u32) -> u64;

    /// Writes a value to an MSR.
    fn wrmsr(&self, msr: u32, value: u64);
}

/// VMREAD and VMWRITE against the current VMCS of the current logical
/// processor.
///
/// Implementations must report failure instead of returning a made-up value
/// when the encoding is invalid or no VMCS is current.
pub trait VmcsAccess {
    /// Reads a VMCS field.
    ///
    /// # Errors
    ///
    /// Returns VMfailInvalid or VMfailValid as reported by the processor.
    fn vmread(&self, encoding: u32) -> Result<u64, VmFail>;

    /// Writes a value to a VMCS field.
    ///
    /// # Errors
    ///
    /// Returns VMfailInvalid or VMfailValid as reported by the processor.
    fn vmwrite(&self, encoding: u32, value: u64) -> Result<(), VmFail>;
}

/// Both halves of the register space. VMCS accessors need MSRs too, because
/// the existence of a field is determined from the VMX capability MSRs.
pub trait RegisterBackend: MsrAccess + VmcsAccess {}

impl<T: MsrAccess + VmcsAccess + ?Sized> RegisterBackend for T {}

/// The current logical processor.
///
/// Executing any method requires CPL0. VMREAD and VMWRITE additionally require
/// VMX root operation with a current VMCS loaded by VMPTRLD.
#[cfg(all(feature = "hardware", target_arch = "x86_64"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentCpu;

#[cfg(all(feature = "hardware", target_arch = "x86_64"))]
impl MsrAccess for CurrentCpu {
    fn rdmsr(&self, msr: u32) -> u64 {
        // Safety: the user of this type runs at CPL0.
        unsafe { x86::msr::rdmsr(msr) }
    }

    fn wrmsr(&self, msr: u32, value: u64) {
        // Safety: the user of this type runs at CPL0.
        unsafe { x86::msr::wrmsr(msr, value) };
    }
}

#[cfg(all(feature = "hardware", target_arch = "x86_64"))]
impl VmcsAccess for CurrentCpu {
    fn vmread(&self, encoding: u32) -> Result<u64, VmFail> {
        // Safety: the user of this type runs at CPL0 in VMX root operation.
        unsafe { x86::bits64::vmx::vmread(encoding) }.map_err(VmFail::from)
    }

    fn vmwrite(&self, encoding: u32, value: u64) -> Result<(), VmFail> {
        // Safety: the user of this type runs at CPL0 in VMX root operation.
        unsafe { x86::bits64::vmx::vmwrite(encoding, value) }.map_err(VmFail::from)
    }
}

impl<T: MsrAccess + ?Sized> MsrAccess for &T {
    fn rdmsr(&self, msr: u32) -> u64 {
        (**self).rdmsr(msr)
    }

    fn wrmsr(&self, msr: u32, value: u64) {
        (**self).wrmsr(msr, value);
    }
}

impl<T: VmcsAccess + ?Sized> VmcsAccess for &T {
    fn vmread(&self, encoding: u32) -> Result<u64, VmFail> {
        (**self).vmread(encoding)
    }

    fn vmwrite(&self, encoding: u32, value: u64) -> Result<(), VmFail> {
        (**self).vmwrite(encoding, value)
    }
}
