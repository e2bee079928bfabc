//! Named, capability-aware accessors for the model-specific registers and the
//! VMCS fields of Intel VT-x.
//!
//! Every register and field is described once, in [`msr`] and [`vmcs`], with
//! its address or encoding, its bit layout and the condition under which it
//! exists on a given processor. The condition is evaluated against the VMX
//! capability MSRs (see [`capability`]), so that software can skip, instead of
//! fault on, what the processor does not implement.
//!
//! All accesses go through a [`backend::RegisterBackend`]. On hardware that is
//! [`backend::CurrentCpu`]; elsewhere, any implementation of the traits.
#![no_std]

extern crate alloc;

pub mod access;
pub mod backend;
pub mod bits;
pub mod capability;
pub mod dump;
pub mod error;
pub mod msr;
pub mod vmcs;

#[cfg(test)]
mod testing;

pub use access::{ReadOnly, ReadWrite};
pub use backend::{MsrAccess, RegisterBackend, VmFail, VmcsAccess};
#[cfg(all(feature = "hardware", target_arch = "x86_64"))]
pub use backend::CurrentCpu;
pub use bits::Field;
pub use capability::{Control, ControlMsrs, Exists};
pub use dump::{DumpSink, DumpValue, LogSink, TextConfig, TextSink};
pub use error::Error;
pub use msr::{Msr, MsrField};
pub use vmcs::{VmcsField, VmcsSubfield};
