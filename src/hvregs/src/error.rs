//! The error type of the VMCS accessors.

use crate::backend::VmFail;

/// Errors returned by the VMCS accessors.
///
/// MSR accessors do not return errors: a faulting RDMSR or WRMSR is a processor
/// exception, not a value this layer can observe.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The field does not exist on the current processor, so accessing it
    /// would make VMREAD or VMWRITE fail.
    #[error("`{name}` ({encoding:#06x}) does not exist on this processor")]
    InvalidFieldAccess {
        /// The diagnostic name of the field.
        name: &'static str,
        /// The VMCS field encoding.
        encoding: u32,
    },

    /// VMREAD or VMWRITE failed.
    ///
    /// See: 31.2 CONVENTIONS
    #[error("VMX instruction on `{name}` ({encoding:#06x}) failed with {fail:?}")]
    HardwareFault {
        /// The diagnostic name of the field.
        name: &'static str,
        /// The VMCS field encoding.
        encoding: u32,
        /// VMfailValid or VMfailInvalid.
        fail: VmFail,
    },
}
