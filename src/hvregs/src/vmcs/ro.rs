//! The VM-exit information fields.
//!
//! See: 25.9 VM-EXIT INFORMATION FIELDS

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::vmcs_fields;
use crate::{
    backend::VmcsAccess,
    dump::{DumpSink, DumpValue},
    error::Error,
    msr::vmx::ia32_vmx_procbased_ctls2 as proc2,
};

vmcs_fields! {
    const ALL: "";

    // 64-bit

    /// Guest-physical address
    pub mod guest_physical_address: ReadOnly = 0x2400
        [exists: Exists::Allowed1(super::proc2::ENABLE_EPT)] {}

    // 32-bit

    /// VM-instruction error. See [`VmInstructionError`](crate::vmcs::ro::VmInstructionError).
    pub mod vm_instruction_error: ReadOnly = 0x4400 {}

    /// Exit reason
    ///
    /// See: 25.9.1 Basic VM-Exit Information
    pub mod exit_reason: ReadOnly = 0x4402 {
        BASIC_EXIT_REASON: basic_exit_reason = range(0xffff, 0),
        BUS_LOCK_DETECTED: bus_lock_detected = flag(26),
        ENCLAVE_MODE: enclave_mode = flag(27),
        PENDING_MTF: pending_mtf = flag(28),
        EXIT_FROM_VMX_ROOT: exit_from_vmx_root = flag(29),
        VM_ENTRY_FAILURE: vm_entry_failure = flag(31),
    }

    /// VM-exit interruption information
    ///
    /// See: 25.9.2 Information for VM Exits Due to Vectored Events
    pub mod vm_exit_interruption_information: ReadOnly = 0x4404 {
        VECTOR: vector = range(0xff, 0),
        INTERRUPTION_TYPE: interruption_type = range(0x700, 8),
        ERROR_CODE_VALID: error_code_valid = flag(11),
        NMI_UNBLOCKING_DUE_TO_IRET: nmi_unblocking_due_to_iret = flag(12),
        VALID: valid = flag(31),
    }

    /// VM-exit interruption error code
    pub mod vm_exit_interruption_error_code: ReadOnly = 0x4406 {}

    /// IDT-vectoring information field
    ///
    /// See: 25.9.3 Information for VM Exits That Occur During Event Delivery
    pub mod idt_vectoring_information: ReadOnly = 0x4408 {
        VECTOR: vector = range(0xff, 0),
        INTERRUPTION_TYPE: interruption_type = range(0x700, 8),
        ERROR_CODE_VALID: error_code_valid = flag(11),
        VALID: valid = flag(31),
    }

    /// IDT-vectoring error code
    pub mod idt_vectoring_error_code: ReadOnly = 0x440a {}

    /// VM-exit instruction length
    pub mod vm_exit_instruction_length: ReadOnly = 0x440c {}

    /// VM-exit instruction information
    pub mod vm_exit_instruction_information: ReadOnly = 0x440e {}

    // Natural-width

    /// Exit qualification
    pub mod exit_qualification: ReadOnly = 0x6400 {}

    /// I/O RCX
    pub mod io_rcx: ReadOnly = 0x6402 {}

    /// I/O RSI
    pub mod io_rsi: ReadOnly = 0x6404 {}

    /// I/O RDI
    pub mod io_rdi: ReadOnly = 0x6406 {}

    /// I/O RIP
    pub mod io_rip: ReadOnly = 0x6408 {}

    /// Guest-linear address
    pub mod guest_linear_address: ReadOnly = 0x640a {}
}

/// The basic exit reason, bits 15:0 of the exit-reason field.
///
/// See: APPENDIX C VMX BASIC EXIT REASONS
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[allow(missing_docs)]
pub enum BasicExitReason {
    ExceptionOrNmi = 0,
    ExternalInterrupt = 1,
    TripleFault = 2,
    InitSignal = 3,
    StartupIpi = 4,
    IoSmi = 5,
    OtherSmi = 6,
    InterruptWindow = 7,
    NmiWindow = 8,
    TaskSwitch = 9,
    Cpuid = 10,
    Getsec = 11,
    Hlt = 12,
    Invd = 13,
    Invlpg = 14,
    Rdpmc = 15,
    Rdtsc = 16,
    Rsm = 17,
    Vmcall = 18,
    Vmclear = 19,
    Vmlaunch = 20,
    Vmptrld = 21,
    Vmptrst = 22,
    Vmread = 23,
    Vmresume = 24,
    Vmwrite = 25,
    Vmxoff = 26,
    Vmxon = 27,
    ControlRegisterAccesses = 28,
    MovDr = 29,
    IoInstruction = 30,
    Rdmsr = 31,
    Wrmsr = 32,
    InvalidGuestState = 33,
    MsrLoading = 34,
    Mwait = 36,
    MonitorTrapFlag = 37,
    Monitor = 39,
    Pause = 40,
    MachineCheckEvent = 41,
    TprBelowThreshold = 43,
    ApicAccess = 44,
    VirtualizedEoi = 45,
    GdtrIdtrAccess = 46,
    LdtrTrAccess = 47,
    EptViolation = 48,
    EptMisconfiguration = 49,
    Invept = 50,
    Rdtscp = 51,
    PreemptionTimerExpired = 52,
    Invvpid = 53,
    Wbinvd = 54,
    Xsetbv = 55,
    ApicWrite = 56,
    Rdrand = 57,
    Invpcid = 58,
    Vmfunc = 59,
    Encls = 60,
    Rdseed = 61,
    PageModificationLogFull = 62,
    Xsaves = 63,
    Xrstors = 64,
    Pconfig = 65,
    SppRelatedEvent = 66,
    Umwait = 67,
    Tpause = 68,
    Loadiwkey = 69,
    Enclv = 70,
    EnqcmdPasidTranslationFailure = 72,
    EnqcmdsPasidTranslationFailure = 73,
    BusLock = 74,
    InstructionTimeout = 75,
    Seamcall = 76,
    Tdcall = 77,
}

impl BasicExitReason {
    /// Decodes the basic exit reason.
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        <Self as FromPrimitive>::from_u64(raw)
    }

    /// The description of the exit reason.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::ExceptionOrNmi => "exception or non-maskable interrupt (NMI)",
            Self::ExternalInterrupt => "external interrupt",
            Self::TripleFault => "triple fault",
            Self::InitSignal => "INIT signal",
            Self::StartupIpi => "start-up IPI (SIPI)",
            Self::IoSmi => "I/O system-management interrupt (SMI)",
            Self::OtherSmi => "other SMI",
            Self::InterruptWindow => "interrupt window",
            Self::NmiWindow => "NMI window",
            Self::TaskSwitch => "task switch",
            Self::Cpuid => "CPUID",
            Self::Getsec => "GETSEC",
            Self::Hlt => "HLT",
            Self::Invd => "INVD",
            Self::Invlpg => "INVLPG",
            Self::Rdpmc => "RDPMC",
            Self::Rdtsc => "RDTSC",
            Self::Rsm => "RSM",
            Self::Vmcall => "VMCALL",
            Self::Vmclear => "VMCLEAR",
            Self::Vmlaunch => "VMLAUNCH",
            Self::Vmptrld => "VMPTRLD",
            Self::Vmptrst => "VMPTRST",
            Self::Vmread => "VMREAD",
            Self::Vmresume => "VMRESUME",
            Self::Vmwrite => "VMWRITE",
            Self::Vmxoff => "VMXOFF",
            Self::Vmxon => "VMXON",
            Self::ControlRegisterAccesses => "control-register accesses",
            Self::MovDr => "MOV DR",
            Self::IoInstruction => "I/O instruction",
            Self::Rdmsr => "RDMSR",
            Self::Wrmsr => "WRMSR",
            Self::InvalidGuestState => "VM-entry failure due to invalid guest state",
            Self::MsrLoading => "VM-entry failure due to MSR loading",
            Self::Mwait => "MWAIT",
            Self::MonitorTrapFlag => "monitor trap flag",
            Self::Monitor => "MONITOR",
            Self::Pause => "PAUSE",
            Self::MachineCheckEvent => "VM-entry failure due to machine-check event",
            Self::TprBelowThreshold => "TPR below threshold",
            Self::ApicAccess => "APIC access",
            Self::VirtualizedEoi => "virtualized EOI",
            Self::GdtrIdtrAccess => "access to GDTR or IDTR",
            Self::LdtrTrAccess => "access to LDTR or TR",
            Self::EptViolation => "EPT violation",
            Self::EptMisconfiguration => "EPT misconfiguration",
            Self::Invept => "INVEPT",
            Self::Rdtscp => "RDTSCP",
            Self::PreemptionTimerExpired => "VMX-preemption timer expired",
            Self::Invvpid => "INVVPID",
            Self::Wbinvd => "WBINVD or WBNOINVD",
            Self::Xsetbv => "XSETBV",
            Self::ApicWrite => "APIC write",
            Self::Rdrand => "RDRAND",
            Self::Invpcid => "INVPCID",
            Self::Vmfunc => "VMFUNC",
            Self::Encls => "ENCLS",
            Self::Rdseed => "RDSEED",
            Self::PageModificationLogFull => "page-modification log full",
            Self::Xsaves => "XSAVES",
            Self::Xrstors => "XRSTORS",
            Self::Pconfig => "PCONFIG",
            Self::SppRelatedEvent => "SPP-related event",
            Self::Umwait => "UMWAIT",
            Self::Tpause => "TPAUSE",
            Self::Loadiwkey => "LOADIWKEY",
            Self::Enclv => "ENCLV",
            Self::EnqcmdPasidTranslationFailure => "ENQCMD PASID translation failure",
            Self::EnqcmdsPasidTranslationFailure => "ENQCMDS PASID translation failure",
            Self::BusLock => "bus lock",
            Self::InstructionTimeout => "instruction timeout",
            Self::Seamcall => "SEAMCALL",
            Self::Tdcall => "TDCALL",
        }
    }
}

/// The VM-instruction error number.
///
/// See: 31.4 VM INSTRUCTION ERROR NUMBERS
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[allow(missing_docs)]
pub enum VmInstructionError {
    VmcallInVmxRoot = 1,
    VmclearInvalidAddress = 2,
    VmclearVmxonPointer = 3,
    VmlaunchNonClearVmcs = 4,
    VmresumeNonLaunchedVmcs = 5,
    VmresumeAfterVmxoff = 6,
    InvalidControlFields = 7,
    InvalidHostStateFields = 8,
    VmptrldInvalidAddress = 9,
    VmptrldVmxonPointer = 10,
    VmptrldIncorrectRevision = 11,
    UnsupportedComponent = 12,
    VmwriteReadOnlyComponent = 13,
    VmxonInVmxRoot = 15,
    InvalidExecutiveVmcsPointer = 16,
    NonLaunchedExecutiveVmcs = 17,
    ExecutiveVmcsPointerNotVmxonPointer = 18,
    VmcallNonClearVmcs = 19,
    VmcallInvalidExitControls = 20,
    VmcallIncorrectMsegRevision = 22,
    VmxoffUnderDualMonitor = 23,
    VmcallInvalidSmmMonitorFeatures = 24,
    InvalidExecutiveControlFields = 25,
    EventsBlockedByMovSs = 26,
    InvalidInveptInvvpidOperand = 28,
}

impl VmInstructionError {
    /// Decodes the error number.
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        <Self as FromPrimitive>::from_u64(raw)
    }

    /// The description of the error.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::VmcallInVmxRoot => "VMCALL executed in VMX root operation",
            Self::VmclearInvalidAddress => "VMCLEAR with invalid physical address",
            Self::VmclearVmxonPointer => "VMCLEAR with VMXON pointer",
            Self::VmlaunchNonClearVmcs => "VMLAUNCH with non-clear VMCS",
            Self::VmresumeNonLaunchedVmcs => "VMRESUME with non-launched VMCS",
            Self::VmresumeAfterVmxoff => "VMRESUME after VMXOFF",
            Self::InvalidControlFields => "VM entry with invalid control field(s)",
            Self::InvalidHostStateFields => "VM entry with invalid host-state field(s)",
            Self::VmptrldInvalidAddress => "VMPTRLD with invalid physical address",
            Self::VmptrldVmxonPointer => "VMPTRLD with VMXON pointer",
            Self::VmptrldIncorrectRevision => "VMPTRLD with incorrect VMCS revision identifier",
            Self::UnsupportedComponent => "VMREAD/VMWRITE from/to unsupported VMCS component",
            Self::VmwriteReadOnlyComponent => "VMWRITE to read-only VMCS component",
            Self::VmxonInVmxRoot => "VMXON executed in VMX root operation",
            Self::InvalidExecutiveVmcsPointer => "VM entry with invalid executive-VMCS pointer",
            Self::NonLaunchedExecutiveVmcs => "VM entry with non-launched executive VMCS",
            Self::ExecutiveVmcsPointerNotVmxonPointer => {
                "VM entry with executive-VMCS pointer not VMXON pointer"
            }
            Self::VmcallNonClearVmcs => "VMCALL with non-clear VMCS",
            Self::VmcallInvalidExitControls => "VMCALL with invalid VM-exit control fields",
            Self::VmcallIncorrectMsegRevision => "VMCALL with incorrect MSEG revision identifier",
            Self::VmxoffUnderDualMonitor => "VMXOFF under dual-monitor treatment of SMIs and SMM",
            Self::VmcallInvalidSmmMonitorFeatures => "VMCALL with invalid SMM-monitor features",
            Self::InvalidExecutiveControlFields => {
                "VM entry with invalid VM-execution control fields in executive VMCS"
            }
            Self::EventsBlockedByMovSs => "VM entry with events blocked by MOV SS",
            Self::InvalidInveptInvvpidOperand => "invalid operand to INVEPT/INVVPID",
        }
    }
}

/// Dumps the basic exit reason and the VM-instruction error in words.
///
/// # Errors
///
/// Returns [`Error::HardwareFault`] if VMREAD fails.
pub fn dump_decoded<B, S>(cpu: &B, level: usize, sink: &mut S) -> Result<(), Error>
where
    B: VmcsAccess + ?Sized,
    S: DumpSink + ?Sized,
{
    let reason = exit_reason::BASIC_EXIT_REASON.get(cpu)?;
    let value = match BasicExitReason::from_raw(reason) {
        Some(reason) => DumpValue::Text(reason.description()),
        None => DumpValue::Number(reason),
    };
    sink.emit(level, "basic exit reason", value);

    let error = vm_instruction_error::FIELD.get(cpu)?;
    let value = match VmInstructionError::from_raw(error) {
        Some(error) => DumpValue::Text(error.description()),
        None if error == 0 => DumpValue::Text("none"),
        None => DumpValue::Number(error),
    };
    sink.emit(level, "VM-instruction error", value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dump::{TextConfig, TextSink},
        testing::MockCpu,
    };

    #[test]
    fn exit_reason_fields() {
        let raw = 0x8000_0021;
        assert!(exit_reason::VM_ENTRY_FAILURE.field().is_enabled(raw));
        assert_eq!(exit_reason::BASIC_EXIT_REASON.field().get(raw), 33);
        assert_eq!(
            BasicExitReason::from_raw(33),
            Some(BasicExitReason::InvalidGuestState)
        );
        assert_eq!(BasicExitReason::from_raw(35), None);
        assert_eq!(BasicExitReason::from_raw(77), Some(BasicExitReason::Tdcall));
        assert_eq!(BasicExitReason::Cpuid.description(), "CPUID");
    }

    #[test]
    fn exit_reason_flag_positions() {
        let flags = [
            (exit_reason::BUS_LOCK_DETECTED, 26),
            (exit_reason::ENCLAVE_MODE, 27),
            (exit_reason::PENDING_MTF, 28),
            (exit_reason::EXIT_FROM_VMX_ROOT, 29),
            (exit_reason::VM_ENTRY_FAILURE, 31),
        ];
        for (flag, bit) in flags {
            let field = flag.field();
            assert_eq!(field.mask(), 1 << bit, "{}", field.name());
            assert!(field.is_enabled(1 << bit), "{}", field.name());
            assert!(field.is_disabled(!(1u64 << bit)), "{}", field.name());
        }

        // A pending MTF VM exit after a bus lock.
        let raw = (1 << 28) | (1 << 26) | 74;
        assert!(exit_reason::PENDING_MTF.field().is_enabled(raw));
        assert!(exit_reason::BUS_LOCK_DETECTED.field().is_enabled(raw));
        assert!(exit_reason::ENCLAVE_MODE.field().is_disabled(raw));
        assert_eq!(exit_reason::BASIC_EXIT_REASON.field().get(raw), 74);
    }

    #[test]
    fn instruction_errors() {
        assert_eq!(VmInstructionError::from_raw(0), None);
        assert_eq!(
            VmInstructionError::from_raw(7),
            Some(VmInstructionError::InvalidControlFields)
        );
        assert_eq!(
            VmInstructionError::from_raw(12).map(VmInstructionError::description),
            Some("VMREAD/VMWRITE from/to unsupported VMCS component")
        );
        assert_eq!(VmInstructionError::from_raw(14), None);
        assert_eq!(
            VmInstructionError::from_raw(25).map(VmInstructionError::description),
            Some("VM entry with invalid VM-execution control fields in executive VMCS")
        );
    }

    #[test]
    fn decoded_dump() {
        let cpu = MockCpu::new()
            .with_vmcs(0x4402, 0x8000_0021)
            .with_vmcs(0x4400, 8);
        let mut sink = TextSink::new(TextConfig {
            indent: 2,
            label_width: 0,
        });
        assert_eq!(dump_decoded(&cpu, 0, &mut sink), Ok(()));
        assert_eq!(
            sink.text(),
            "basic exit reason VM-entry failure due to invalid guest state\n\
             VM-instruction error VM entry with invalid host-state field(s)\n"
        );

        let cpu = MockCpu::new().with_vmcs(0x4402, 0x35).with_vmcs(0x4400, 0);
        let mut sink = TextSink::new(TextConfig {
            indent: 2,
            label_width: 0,
        });
        assert_eq!(dump_decoded(&cpu, 0, &mut sink), Ok(()));
        assert_eq!(
            sink.text(),
            "basic exit reason INVVPID\nVM-instruction error none\n"
        );
    }
}
