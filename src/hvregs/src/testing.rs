//! A recording backend used by unit tests.

use alloc::{collections::BTreeMap, vec::Vec};
use core::cell::RefCell;

use crate::backend::{MsrAccess, VmFail, VmcsAccess};

/// One call made into the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Rdmsr(u32),
    Wrmsr(u32, u64),
    Vmread(u32),
    Vmwrite(u32, u64),
}

/// A backend holding MSRs and VMCS fields in maps.
///
/// Reading an MSR that was not seeded panics, just as RDMSR raises #GP on an
/// unimplemented MSR. Reading a VMCS field that was not seeded fails with
/// VMfailValid, as VMREAD does for an unsupported encoding.
#[derive(Debug, Default)]
pub(crate) struct MockCpu {
    msrs: RefCell<BTreeMap<u32, u64>>,
    vmcs: RefCell<BTreeMap<u32, u64>>,
    calls: RefCell<Vec<Call>>,
}

impl MockCpu {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_msr(self, msr: u32, value: u64) -> Self {
        let _ = self.msrs.borrow_mut().insert(msr, value);
        self
    }

    pub(crate) fn with_vmcs(self, encoding: u32, value: u64) -> Self {
        let _ = self.vmcs.borrow_mut().insert(encoding, value);
        self
    }

    pub(crate) fn msr(&self, msr: u32) -> Option<u64> {
        self.msrs.borrow().get(&msr).copied()
    }

    pub(crate) fn vmcs(&self, encoding: u32) -> Option<u64> {
        self.vmcs.borrow().get(&encoding).copied()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Returns whether any VMREAD or VMWRITE was issued.
    pub(crate) fn touched_vmcs(&self) -> bool {
        self.calls
            .borrow()
            .iter()
            .any(|call| matches!(call, Call::Vmread(_) | Call::Vmwrite(..)))
    }
}

impl MsrAccess for MockCpu {
    fn rdmsr(&self, msr: u32) -> u64 {
        self.calls.borrow_mut().push(Call::Rdmsr(msr));
        match self.msr(msr) {
            Some(value) => value,
            None => panic!("#GP: RDMSR {msr:#x} is not implemented"),
        }
    }

    fn wrmsr(&self, msr: u32, value: u64) {
        self.calls.borrow_mut().push(Call::Wrmsr(msr, value));
        let _ = self.msrs.borrow_mut().insert(msr, value);
    }
}

impl VmcsAccess for MockCpu {
    fn vmread(&self, encoding: u32) -> Result<u64, VmFail> {
        self.calls.borrow_mut().push(Call::Vmread(encoding));
        self.vmcs(encoding).ok_or(VmFail::VmFailValid)
    }

    fn vmwrite(&self, encoding: u32, value: u64) -> Result<(), VmFail> {
        self.calls.borrow_mut().push(Call::Vmwrite(encoding, value));
        let _ = self.vmcs.borrow_mut().insert(encoding, value);
        Ok(())
    }
}

/// Initializes `env_logger` so `log` output shows up with `--nocapture`.
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
