//! The module containing the capability predicates.
//!
//! The VMX capability MSRs report which settings of the VM-execution, VM-exit
//! and VM-entry controls the processor supports. Everything that decides
//! whether a VMCS field exists, or whether a control bit may be 0 or 1, is
//! derived from them here. Nothing is cached: each predicate reads the MSRs
//! again.
//!
//! See: APPENDIX A VMX CAPABILITY REPORTING FACILITY

use crate::{
    access::ReadOnly,
    backend::MsrAccess,
    bits::{Field, is_bit_set},
    msr::{MsrField, vmx::ia32_vmx_basic},
};

/// How a capability MSR encodes its allowed settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilityLayout {
    /// Bits 31:0 are the allowed 0-settings and bits 63:32 are the allowed
    /// 1-settings of the same 32 control bits.
    Split,
    /// All 64 bits are the allowed 1-settings. Every control may be 0.
    /// Used by IA32_VMX_PROCBASED_CTLS3 and IA32_VMX_VMFUNC.
    Allowed1Only,
}

/// The capability MSRs reporting the allowed settings of one group of
/// controls, such as the pin-based VM-execution controls.
#[derive(Clone, Copy, Debug)]
pub struct ControlMsrs {
    msr: u32,
    true_msr: Option<u32>,
    layout: CapabilityLayout,
    gate: Exists,
}

impl ControlMsrs {
    /// A split-layout capability MSR at `msr` that always exists and has no
    /// TRUE counterpart.
    #[must_use]
    pub const fn new(msr: u32) -> Self {
        Self {
            msr,
            true_msr: None,
            layout: CapabilityLayout::Split,
            gate: Exists::Always,
        }
    }

    /// Registers the TRUE capability MSR, consulted instead of `msr` when
    /// IA32_VMX_BASIC\[55\] is 1.
    #[must_use]
    pub const fn with_true(mut self, true_msr: u32) -> Self {
        self.true_msr = Some(true_msr);
        self
    }

    /// Switches to [`CapabilityLayout::Allowed1Only`].
    #[must_use]
    pub const fn allowed1_only(mut self) -> Self {
        self.layout = CapabilityLayout::Allowed1Only;
        self
    }

    /// The MSR is implemented only when `gate` evaluates to true.
    #[must_use]
    pub const fn gated_by(mut self, gate: Exists) -> Self {
        self.gate = gate;
        self
    }

    /// The address of the non-TRUE capability MSR.
    #[must_use]
    pub const fn msr(&self) -> u32 {
        self.msr
    }

    /// The address of the TRUE capability MSR, if this group has one.
    #[must_use]
    pub const fn true_msr(&self) -> Option<u32> {
        self.true_msr
    }

    /// The layout of the capability MSR.
    #[must_use]
    pub const fn layout(&self) -> CapabilityLayout {
        self.layout
    }

    /// The condition under which the capability MSR is implemented.
    #[must_use]
    pub const fn gate(&self) -> Exists {
        self.gate
    }

    /// Tests whether the capability MSR is implemented on this processor.
    pub fn is_available<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        self.gate.evaluate(cpu)
    }

    /// Picks the capability MSR to consult.
    ///
    /// "It is necessary for software to consult only one of the capability
    ///  MSRs to determine the allowed settings of the pin based VM-execution
    ///  controls"
    /// See: A.3.1 Pin-Based VM-Execution Controls
    pub fn select<B: MsrAccess + ?Sized>(&self, cpu: &B) -> u32 {
        match self.true_msr {
            Some(true_msr) if TRUE_CONTROLS.evaluate(cpu) => true_msr,
            _ => self.msr,
        }
    }

    /// Reads the selected capability MSR, or returns `None` without issuing
    /// RDMSR if it is not implemented.
    pub fn read<B: MsrAccess + ?Sized>(&self, cpu: &B) -> Option<u64> {
        if !self.is_available(cpu) {
            log::trace!("Capability MSR {:#x} is not implemented", self.msr);
            return None;
        }
        let msr = self.select(cpu);
        log::trace!("Consulting capability MSR {msr:#x}");
        Some(cpu.rdmsr(msr))
    }

    /// Returns `requested` with every bit that must be 1 set and every bit that
    /// must be 0 cleared. This is the value to write to the control field.
    ///
    /// Returns 0 when the capability MSR is not implemented, since no control
    /// of the group can be 1 then.
    pub fn adjust<B: MsrAccess + ?Sized>(&self, cpu: &B, requested: u64) -> u64 {
        // Each bit of the following VMCS values might have to be set or cleared
        // according to the value indicated by the VMX capability MSRs.
        //
        //        Lower bits (allowed 0) Higher bits (allowed 1) Meaning
        // Bit X  1                      1                       The bit X is fixed to 1
        // Bit X  1                      0                       Invalid
        // Bit X  0                      1                       The bit X is flexible
        // Bit X  0                      0                       The bit X is fixed to 0
        //
        // See: A.3.1 Pin-Based VM-Execution Controls
        let Some(capabilities) = self.read(cpu) else {
            return 0;
        };
        match self.layout {
            CapabilityLayout::Split => {
                let allowed0 = capabilities as u32;
                let allowed1 = (capabilities >> 32) as u32;
                let mut effective_value = requested as u32;
                effective_value |= allowed0;
                effective_value &= allowed1;
                u64::from(effective_value)
            }
            CapabilityLayout::Allowed1Only => requested & capabilities,
        }
    }

    /// Returns the bits of `requested` that [`ControlMsrs::adjust`] could not
    /// keep set.
    pub fn unsupported<B: MsrAccess + ?Sized>(&self, cpu: &B, requested: u64) -> u64 {
        requested & !self.adjust(cpu, requested)
    }
}

/// One control bit, tied to the capability MSRs reporting its allowed
/// settings.
#[derive(Clone, Copy, Debug)]
pub struct Control {
    caps: &'static ControlMsrs,
    field: Field,
}

impl Control {
    /// Defines the control at `bit`.
    #[must_use]
    pub const fn flag(caps: &'static ControlMsrs, name: &'static str, bit: u32) -> Self {
        Self {
            caps,
            field: Field::flag(name, bit),
        }
    }

    /// The bit, as a field of the control value.
    #[must_use]
    pub const fn field(&self) -> Field {
        self.field
    }

    /// The capability MSRs of the group this control belongs to.
    #[must_use]
    pub const fn caps(&self) -> &'static ControlMsrs {
        self.caps
    }

    /// Tests whether the control may be 0. If not, it is a required control.
    ///
    /// A control of a group whose capability MSR is not implemented is always
    /// 0 and thus may be 0.
    pub fn is_allowed0<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        match (self.caps.read(cpu), self.caps.layout) {
            (None, _) | (Some(_), CapabilityLayout::Allowed1Only) => true,
            (Some(capabilities), CapabilityLayout::Split) => self.field.is_allowed0(capabilities),
        }
    }

    /// Tests whether the control may be 1. If not, it is a forbidden control.
    pub fn is_allowed1<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        match (self.caps.read(cpu), self.caps.layout) {
            (None, _) => false,
            (Some(capabilities), CapabilityLayout::Split) => self.field.is_allowed1(capabilities),
            (Some(capabilities), CapabilityLayout::Allowed1Only) => {
                is_bit_set(capabilities, self.field.from())
            }
        }
    }

    /// Reads the bit of the non-TRUE capability MSR as is.
    ///
    /// Like the other raw accessors, this issues RDMSR without evaluating the
    /// availability gate of the group. Check [`ControlMsrs::is_available`]
    /// first, or use [`Self::is_allowed1`], when the MSR may not exist.
    pub fn get<B: MsrAccess + ?Sized>(&self, cpu: &B) -> u64 {
        self.field.get(cpu.rdmsr(self.caps.msr))
    }

    /// Tests whether the bit of the non-TRUE capability MSR is 1. Does not
    /// evaluate the availability gate; see [`Self::get`].
    pub fn is_enabled<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        self.field.is_enabled(cpu.rdmsr(self.caps.msr))
    }

    /// Tests whether the bit of the non-TRUE capability MSR is 0.
    pub fn is_disabled<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        !self.is_enabled(cpu)
    }
}

/// A condition over capability MSRs. Used to decide whether a VMCS field or a
/// capability MSR exists.
///
/// The composition is written out per field, following when the SDM says the
/// field is consulted, and is never inferred.
#[derive(Clone, Copy, Debug)]
pub enum Exists {
    /// Unconditionally true.
    Always,
    /// True if the control may be 1.
    Allowed1(Control),
    /// True if the flag of a read-only capability MSR is 1.
    Enabled(MsrField<ReadOnly>),
    /// True if any of the conditions is true.
    Any(&'static [Exists]),
    /// True if all of the conditions are true.
    All(&'static [Exists]),
}

impl Exists {
    /// Evaluates the condition against the capability MSRs of `cpu`.
    pub fn evaluate<B: MsrAccess + ?Sized>(&self, cpu: &B) -> bool {
        match self {
            Self::Always => true,
            Self::Allowed1(control) => control.is_allowed1(cpu),
            Self::Enabled(field) => field.is_enabled(cpu),
            Self::Any(conditions) => conditions.iter().any(|condition| condition.evaluate(cpu)),
            Self::All(conditions) => conditions.iter().all(|condition| condition.evaluate(cpu)),
        }
    }
}

/// Whether the TRUE capability MSRs are implemented.
pub const TRUE_CONTROLS: Exists = Exists::Enabled(ia32_vmx_basic::TRUE_BASED_CONTROLS);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        msr::vmx::{
            ia32_vmx_entry_ctls, ia32_vmx_exit_ctls, ia32_vmx_pinbased_ctls,
            ia32_vmx_procbased_ctls, ia32_vmx_procbased_ctls2, ia32_vmx_procbased_ctls3,
            ia32_vmx_vmfunc,
        },
        testing::{Call, MockCpu, init_logger},
    };

    const TRUE_BASED_CONTROLS: u64 = 1 << 55;

    fn cap(allowed0: u32, allowed1: u32) -> u64 {
        u64::from(allowed0) | (u64::from(allowed1) << 32)
    }

    #[test]
    fn all_allowed_combinations() {
        init_logger();
        let nmi_exiting = ia32_vmx_pinbased_ctls::NMI_EXITING;
        let cases = [
            (0, 0, true, false),
            (0, 1, true, true),
            (1, 0, false, false),
            (1, 1, false, true),
        ];
        for (low, high, allowed0, allowed1) in cases {
            let cpu = MockCpu::new()
                .with_msr(0x480, 0)
                .with_msr(0x481, cap(low << 3, high << 3));
            assert_eq!(nmi_exiting.is_allowed0(&cpu), allowed0);
            assert_eq!(nmi_exiting.is_allowed1(&cpu), allowed1);
        }
    }

    #[test]
    fn true_msr_is_preferred_when_reported() {
        init_logger();
        let load_debug_controls = ia32_vmx_entry_ctls::LOAD_DEBUG_CONTROLS;

        // The default1 bit 2 cannot be cleared according to the non-TRUE MSR,
        // but can according to the TRUE MSR.
        let cpu = MockCpu::new()
            .with_msr(0x480, TRUE_BASED_CONTROLS)
            .with_msr(0x484, cap(0x11ff, 0xffff_ffff))
            .with_msr(0x490, cap(0x11fb, 0xffff_ffff));
        assert!(load_debug_controls.is_allowed0(&cpu));
        assert!(cpu.calls().contains(&Call::Rdmsr(0x490)));
        assert!(!cpu.calls().contains(&Call::Rdmsr(0x484)));

        let cpu = MockCpu::new()
            .with_msr(0x480, 0)
            .with_msr(0x484, cap(0x11ff, 0xffff_ffff));
        assert!(!load_debug_controls.is_allowed0(&cpu));
        assert!(!cpu.calls().contains(&Call::Rdmsr(0x490)));
    }

    #[test]
    fn secondary_controls_msr_is_not_read_without_activation() {
        init_logger();
        // MockCpu panics on 0x48b, so any read of it fails the test.
        let cpu = MockCpu::new()
            .with_msr(0x480, 0)
            .with_msr(0x482, cap(0, 0x7fff_ffff));
        let enable_ept = ia32_vmx_procbased_ctls2::ENABLE_EPT;
        assert!(!enable_ept.is_allowed1(&cpu));
        assert!(enable_ept.is_allowed0(&cpu));
        assert_eq!(ia32_vmx_procbased_ctls2::CAPS.adjust(&cpu, 0b10), 0);
    }

    #[test]
    fn raw_reads_are_gated_by_the_caller() {
        init_logger();
        let cpu = MockCpu::new()
            .with_msr(0x480, 0)
            .with_msr(0x482, cap(0, 0x7fff_ffff));
        let enable_ept = ia32_vmx_procbased_ctls2::ENABLE_EPT;
        assert!(!enable_ept.caps().is_available(&cpu));
        assert!(!cpu.calls().contains(&Call::Rdmsr(0x48b)));

        let cpu = cpu.with_msr(0x482, cap(0, 0x8000_0000)).with_msr(0x48b, cap(0, 0b10));
        assert!(enable_ept.caps().is_available(&cpu));
        assert!(enable_ept.is_disabled(&cpu));
        assert_eq!(enable_ept.get(&cpu), 0);
    }

    #[test]
    #[should_panic(expected = "#GP")]
    fn raw_read_of_an_unavailable_msr_faults() {
        let cpu = MockCpu::new()
            .with_msr(0x480, 0)
            .with_msr(0x482, cap(0, 0x7fff_ffff));
        let _ = ia32_vmx_procbased_ctls2::ENABLE_EPT.is_enabled(&cpu);
    }

    #[test]
    fn secondary_controls_msr_is_read_with_activation() {
        init_logger();
        let cpu = MockCpu::new()
            .with_msr(0x480, 0)
            .with_msr(0x482, cap(0, 0x8000_0000))
            .with_msr(0x48b, cap(0, 0b10));
        assert!(ia32_vmx_procbased_ctls2::ENABLE_EPT.is_allowed1(&cpu));
        assert!(!ia32_vmx_procbased_ctls2::ENABLE_VPID.is_allowed1(&cpu));
    }

    #[test]
    fn allowed1_only_layout() {
        init_logger();
        let cpu = MockCpu::new()
            .with_msr(0x480, 0)
            .with_msr(0x482, cap(0, 0x8002_0000))
            .with_msr(0x48b, cap(0, 1 << 13))
            .with_msr(0x491, 0b1)
            .with_msr(0x492, 0b0);
        let eptp_switching = ia32_vmx_vmfunc::EPTP_SWITCHING;
        assert!(eptp_switching.is_allowed0(&cpu));
        assert!(eptp_switching.is_allowed1(&cpu));

        let loadiwkey_exiting = ia32_vmx_procbased_ctls3::LOADIWKEY_EXITING;
        assert!(loadiwkey_exiting.is_allowed0(&cpu));
        assert!(!loadiwkey_exiting.is_allowed1(&cpu));
        assert_eq!(ia32_vmx_procbased_ctls3::CAPS.adjust(&cpu, 0b1), 0);
    }

    #[test]
    fn adjust_sets_required_and_clears_forbidden() {
        init_logger();
        let cpu = MockCpu::new()
            .with_msr(0x480, TRUE_BASED_CONTROLS)
            .with_msr(0x48f, cap(0x0003_6dfb, 0x0023_efff));

        // Load IA32_PERF_GLOBAL_CTRL (bit 12) is not allowed1 here.
        let requested = (1 << 9) | (1 << 12);
        let effective = ia32_vmx_exit_ctls::CAPS.adjust(&cpu, requested);
        assert_eq!(effective & 0x0003_6dfb, 0x0003_6dfb & 0x0023_efff);
        assert_ne!(effective & (1 << 9), 0);
        assert_eq!(effective & (1 << 12), 0);
        assert_eq!(ia32_vmx_exit_ctls::CAPS.unsupported(&cpu, requested), 1 << 12);
    }

    #[test]
    fn composition() {
        init_logger();
        const ACTIVATE: Exists =
            Exists::Allowed1(ia32_vmx_procbased_ctls::ACTIVATE_SECONDARY_CONTROLS);
        const EPT: Exists = Exists::Allowed1(ia32_vmx_procbased_ctls2::ENABLE_EPT);
        const EITHER: Exists = Exists::Any(&[ACTIVATE, EPT]);
        const BOTH: Exists = Exists::All(&[ACTIVATE, EPT]);

        let cpu = MockCpu::new()
            .with_msr(0x480, 0)
            .with_msr(0x482, cap(0, 0x8000_0000))
            .with_msr(0x48b, cap(0, 0));
        assert!(ACTIVATE.evaluate(&cpu));
        assert!(!EPT.evaluate(&cpu));
        assert!(EITHER.evaluate(&cpu));
        assert!(!BOTH.evaluate(&cpu));
        assert!(Exists::Always.evaluate(&cpu));
    }
}
