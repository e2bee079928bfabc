//! The VMX capability MSRs.
//!
//! See: APPENDIX A VMX CAPABILITY REPORTING FACILITY

use super::{Msr, arch::MemoryType, msr};
use crate::{
    access::ReadOnly,
    backend::MsrAccess,
    capability::Exists,
    dump::{DumpSink, DumpValue},
};

/// Defines one module per group of controls, holding the capability MSRs of
/// the group and one [`Control`](crate::capability::Control) per control bit.
macro_rules! control_msr {
    ($(
        $(#[$meta:meta])*
        pub mod $name:ident [$caps:expr] {
            $(
                $(#[$fmeta:meta])*
                $field:ident: $fname:ident = $bit:literal
            ),* $(,)?
        }
    )*) => {
        $(
            $(#[$meta])*
            pub mod $name {
                #[allow(unused_imports)]
                use crate::{
                    access::ReadOnly,
                    bits::Field,
                    capability::{Control, ControlMsrs, Exists},
                    msr::Msr,
                };

                /// The capability MSRs reporting the allowed settings.
                pub const CAPS: ControlMsrs = $caps;

                /// The address of the non-TRUE capability MSR.
                pub const ADDR: u32 = CAPS.msr();

                $(
                    #[doc = concat!("`", stringify!($fname), "`")]
                    $(#[$fmeta])*
                    pub const $field: Control = Control::flag(&CAPS, stringify!($fname), $bit);
                )*

                /// Every control, in bit order.
                pub const FIELDS: &[Field] = &[$($field.field()),*];

                /// The non-TRUE capability MSR.
                pub const MSR: Msr<ReadOnly> =
                    Msr::new(ADDR, stringify!($name), FIELDS).gated_by(CAPS.gate());
            }
        )*
    };
}

control_msr! {
    /// IA32_VMX_PINBASED_CTLS and IA32_VMX_TRUE_PINBASED_CTLS
    ///
    /// See: A.3.1 Pin-Based VM-Execution Controls
    pub mod ia32_vmx_pinbased_ctls [ControlMsrs::new(0x481).with_true(0x48d)] {
        EXTERNAL_INTERRUPT_EXITING: external_interrupt_exiting = 0,
        NMI_EXITING: nmi_exiting = 3,
        VIRTUAL_NMIS: virtual_nmis = 5,
        ACTIVATE_VMX_PREEMPTION_TIMER: activate_vmx_preemption_timer = 6,
        PROCESS_POSTED_INTERRUPTS: process_posted_interrupts = 7,
    }

    /// IA32_VMX_PROCBASED_CTLS and IA32_VMX_TRUE_PROCBASED_CTLS
    ///
    /// See: A.3.2 Primary Processor-Based VM-Execution Controls
    pub mod ia32_vmx_procbased_ctls [ControlMsrs::new(0x482).with_true(0x48e)] {
        INTERRUPT_WINDOW_EXITING: interrupt_window_exiting = 2,
        USE_TSC_OFFSETTING: use_tsc_offsetting = 3,
        HLT_EXITING: hlt_exiting = 7,
        INVLPG_EXITING: invlpg_exiting = 9,
        MWAIT_EXITING: mwait_exiting = 10,
        RDPMC_EXITING: rdpmc_exiting = 11,
        RDTSC_EXITING: rdtsc_exiting = 12,
        CR3_LOAD_EXITING: cr3_load_exiting = 15,
        CR3_STORE_EXITING: cr3_store_exiting = 16,
        ACTIVATE_TERTIARY_CONTROLS: activate_tertiary_controls = 17,
        CR8_LOAD_EXITING: cr8_load_exiting = 19,
        CR8_STORE_EXITING: cr8_store_exiting = 20,
        USE_TPR_SHADOW: use_tpr_shadow = 21,
        NMI_WINDOW_EXITING: nmi_window_exiting = 22,
        MOV_DR_EXITING: mov_dr_exiting = 23,
        UNCONDITIONAL_IO_EXITING: unconditional_io_exiting = 24,
        USE_IO_BITMAPS: use_io_bitmaps = 25,
        MONITOR_TRAP_FLAG: monitor_trap_flag = 27,
        USE_MSR_BITMAPS: use_msr_bitmaps = 28,
        MONITOR_EXITING: monitor_exiting = 29,
        PAUSE_EXITING: pause_exiting = 30,
        ACTIVATE_SECONDARY_CONTROLS: activate_secondary_controls = 31,
    }

    /// IA32_VMX_EXIT_CTLS and IA32_VMX_TRUE_EXIT_CTLS
    ///
    /// See: A.4.1 Primary VM-Exit Controls
    pub mod ia32_vmx_exit_ctls [ControlMsrs::new(0x483).with_true(0x48f)] {
        SAVE_DEBUG_CONTROLS: save_debug_controls = 2,
        HOST_ADDRESS_SPACE_SIZE: host_address_space_size = 9,
        LOAD_IA32_PERF_GLOBAL_CTRL: load_ia32_perf_global_ctrl = 12,
        ACKNOWLEDGE_INTERRUPT_ON_EXIT: acknowledge_interrupt_on_exit = 15,
        SAVE_IA32_PAT: save_ia32_pat = 18,
        LOAD_IA32_PAT: load_ia32_pat = 19,
        SAVE_IA32_EFER: save_ia32_efer = 20,
        LOAD_IA32_EFER: load_ia32_efer = 21,
        SAVE_VMX_PREEMPTION_TIMER_VALUE: save_vmx_preemption_timer_value = 22,
        CLEAR_IA32_BNDCFGS: clear_ia32_bndcfgs = 23,
        CONCEAL_VMX_FROM_PT: conceal_vmx_from_pt = 24,
        CLEAR_IA32_RTIT_CTL: clear_ia32_rtit_ctl = 25,
        CLEAR_IA32_LBR_CTL: clear_ia32_lbr_ctl = 26,
        CLEAR_UINV: clear_uinv = 27,
        LOAD_CET_STATE: load_cet_state = 28,
        LOAD_PKRS: load_pkrs = 29,
        SAVE_IA32_PERF_GLOBAL_CTRL: save_ia32_perf_global_ctrl = 30,
        ACTIVATE_SECONDARY_CONTROLS: activate_secondary_controls = 31,
    }

    /// IA32_VMX_ENTRY_CTLS and IA32_VMX_TRUE_ENTRY_CTLS
    ///
    /// See: A.5 VM-ENTRY CONTROLS
    pub mod ia32_vmx_entry_ctls [ControlMsrs::new(0x484).with_true(0x490)] {
        LOAD_DEBUG_CONTROLS: load_debug_controls = 2,
        IA32E_MODE_GUEST: ia32e_mode_guest = 9,
        ENTRY_TO_SMM: entry_to_smm = 10,
        DEACTIVATE_DUAL_MONITOR_TREATMENT: deactivate_dual_monitor_treatment = 11,
        LOAD_IA32_PERF_GLOBAL_CTRL: load_ia32_perf_global_ctrl = 13,
        LOAD_IA32_PAT: load_ia32_pat = 14,
        LOAD_IA32_EFER: load_ia32_efer = 15,
        LOAD_IA32_BNDCFGS: load_ia32_bndcfgs = 16,
        CONCEAL_VMX_FROM_PT: conceal_vmx_from_pt = 17,
        LOAD_IA32_RTIT_CTL: load_ia32_rtit_ctl = 18,
        LOAD_UINV: load_uinv = 19,
        LOAD_CET_STATE: load_cet_state = 20,
        LOAD_IA32_LBR_CTL: load_ia32_lbr_ctl = 21,
        LOAD_PKRS: load_pkrs = 22,
    }

    /// IA32_VMX_PROCBASED_CTLS2
    ///
    /// See: A.3.3 Secondary Processor-Based VM-Execution Controls
    pub mod ia32_vmx_procbased_ctls2 [
        ControlMsrs::new(0x48b).gated_by(Exists::Allowed1(
            super::ia32_vmx_procbased_ctls::ACTIVATE_SECONDARY_CONTROLS,
        ))
    ] {
        VIRTUALIZE_APIC_ACCESSES: virtualize_apic_accesses = 0,
        ENABLE_EPT: enable_ept = 1,
        DESCRIPTOR_TABLE_EXITING: descriptor_table_exiting = 2,
        ENABLE_RDTSCP: enable_rdtscp = 3,
        VIRTUALIZE_X2APIC_MODE: virtualize_x2apic_mode = 4,
        ENABLE_VPID: enable_vpid = 5,
        WBINVD_EXITING: wbinvd_exiting = 6,
        UNRESTRICTED_GUEST: unrestricted_guest = 7,
        APIC_REGISTER_VIRTUALIZATION: apic_register_virtualization = 8,
        VIRTUAL_INTERRUPT_DELIVERY: virtual_interrupt_delivery = 9,
        PAUSE_LOOP_EXITING: pause_loop_exiting = 10,
        RDRAND_EXITING: rdrand_exiting = 11,
        ENABLE_INVPCID: enable_invpcid = 12,
        ENABLE_VM_FUNCTIONS: enable_vm_functions = 13,
        VMCS_SHADOWING: vmcs_shadowing = 14,
        ENABLE_ENCLS_EXITING: enable_encls_exiting = 15,
        RDSEED_EXITING: rdseed_exiting = 16,
        ENABLE_PML: enable_pml = 17,
        EPT_VIOLATION_VE: ept_violation_ve = 18,
        CONCEAL_VMX_FROM_PT: conceal_vmx_from_pt = 19,
        ENABLE_XSAVES_XRSTORS: enable_xsaves_xrstors = 20,
        PASID_TRANSLATION: pasid_translation = 21,
        MODE_BASED_EXECUTE_CONTROL: mode_based_execute_control = 22,
        SUB_PAGE_WRITE_PERMISSIONS: sub_page_write_permissions = 23,
        PT_USES_GUEST_PHYSICAL_ADDRESSES: pt_uses_guest_physical_addresses = 24,
        USE_TSC_SCALING: use_tsc_scaling = 25,
        ENABLE_USER_WAIT_AND_PAUSE: enable_user_wait_and_pause = 26,
        ENABLE_PCONFIG: enable_pconfig = 27,
        ENABLE_ENCLV_EXITING: enable_enclv_exiting = 28,
        VMM_BUS_LOCK_DETECTION: vmm_bus_lock_detection = 30,
        INSTRUCTION_TIMEOUT: instruction_timeout = 31,
    }

    /// IA32_VMX_VMFUNC
    ///
    /// See: A.11 VM FUNCTIONS
    pub mod ia32_vmx_vmfunc [
        ControlMsrs::new(0x491)
            .allowed1_only()
            .gated_by(Exists::Allowed1(super::ia32_vmx_procbased_ctls2::ENABLE_VM_FUNCTIONS))
    ] {
        EPTP_SWITCHING: eptp_switching = 0,
    }

    /// IA32_VMX_PROCBASED_CTLS3
    ///
    /// See: A.3.4 Tertiary Processor-Based VM-Execution Controls
    pub mod ia32_vmx_procbased_ctls3 [
        ControlMsrs::new(0x492).allowed1_only().gated_by(Exists::Allowed1(
            super::ia32_vmx_procbased_ctls::ACTIVATE_TERTIARY_CONTROLS,
        ))
    ] {
        LOADIWKEY_EXITING: loadiwkey_exiting = 0,
        ENABLE_HLAT: enable_hlat = 1,
        EPT_PAGING_WRITE_CONTROL: ept_paging_write_control = 2,
        GUEST_PAGING_VERIFICATION: guest_paging_verification = 3,
        IPI_VIRTUALIZATION: ipi_virtualization = 4,
        VIRTUALIZE_IA32_SPEC_CTRL: virtualize_ia32_spec_ctrl = 7,
    }
}

msr! {
    /// IA32_VMX_BASIC
    ///
    /// See: A.1 BASIC VMX INFORMATION
    pub mod ia32_vmx_basic: ReadOnly = 0x480 {
        REVISION_IDENTIFIER: revision_identifier = range(0x7fff_ffff, 0),
        REGION_SIZE: region_size = range(0x1fff_0000_0000, 32),
        PHYSICAL_ADDRESS_WIDTH_32: physical_address_width_32 = flag(48),
        DUAL_MONITOR_TREATMENT: dual_monitor_treatment = flag(49),
        MEMORY_TYPE: memory_type = range(0x3c_0000_0000_0000, 50),
        INS_OUTS_REPORTING: ins_outs_reporting = flag(54),
        TRUE_BASED_CONTROLS: true_based_controls = flag(55),
        NO_ERROR_CODE_REQUIREMENT: no_error_code_requirement = flag(56),
    }

    /// IA32_VMX_MISC
    ///
    /// See: A.6 MISCELLANEOUS DATA
    pub mod ia32_vmx_misc: ReadOnly = 0x485 {
        PREEMPTION_TIMER_RATE: preemption_timer_rate = range(0x1f, 0),
        STORE_EFER_LMA_ON_EXIT: store_efer_lma_on_exit = flag(5),
        ACTIVITY_HLT: activity_hlt = flag(6),
        ACTIVITY_SHUTDOWN: activity_shutdown = flag(7),
        ACTIVITY_WAIT_FOR_SIPI: activity_wait_for_sipi = flag(8),
        PT_IN_VMX_OPERATION: pt_in_vmx_operation = flag(14),
        RDMSR_SMBASE_IN_SMM: rdmsr_smbase_in_smm = flag(15),
        CR3_TARGET_COUNT: cr3_target_count = range(0x1ff_0000, 16),
        MAX_MSR_LIST_SIZE: max_msr_list_size = range(0xe00_0000, 25),
        SMM_MONITOR_CTL_B2: smm_monitor_ctl_b2 = flag(28),
        VMWRITE_ALL_FIELDS: vmwrite_all_fields = flag(29),
        INJECT_ZERO_LENGTH_INSTRUCTION: inject_zero_length_instruction = flag(30),
        MSEG_REVISION_IDENTIFIER: mseg_revision_identifier = range(0xffff_ffff_0000_0000, 32),
    }

    /// IA32_VMX_CR0_FIXED0
    ///
    /// See: A.7 VMX-FIXED BITS IN CR0
    pub mod ia32_vmx_cr0_fixed0: ReadOnly = 0x486 {}

    /// IA32_VMX_CR0_FIXED1
    pub mod ia32_vmx_cr0_fixed1: ReadOnly = 0x487 {}

    /// IA32_VMX_CR4_FIXED0
    ///
    /// See: A.8 VMX-FIXED BITS IN CR4
    pub mod ia32_vmx_cr4_fixed0: ReadOnly = 0x488 {}

    /// IA32_VMX_CR4_FIXED1
    pub mod ia32_vmx_cr4_fixed1: ReadOnly = 0x489 {}

    /// IA32_VMX_VMCS_ENUM
    ///
    /// See: A.9 VMCS ENUMERATION
    pub mod ia32_vmx_vmcs_enum: ReadOnly = 0x48a {
        HIGHEST_INDEX: highest_index = range(0x3fe, 1),
    }

    /// IA32_VMX_EPT_VPID_CAP
    ///
    /// See: A.10 VPID AND EPT CAPABILITIES
    pub mod ia32_vmx_ept_vpid_cap: ReadOnly = 0x48c [exists: Exists::Any(super::EPT_OR_VPID)] {
        EXECUTE_ONLY: execute_only = flag(0),
        PAGE_WALK_LENGTH_4: page_walk_length_4 = flag(6),
        PAGE_WALK_LENGTH_5: page_walk_length_5 = flag(7),
        MEMORY_TYPE_UC: memory_type_uc = flag(8),
        MEMORY_TYPE_WB: memory_type_wb = flag(14),
        PDE_2MB_PAGES: pde_2mb_pages = flag(16),
        PDPTE_1GB_PAGES: pdpte_1gb_pages = flag(17),
        INVEPT: invept = flag(20),
        ACCESSED_DIRTY_FLAGS: accessed_dirty_flags = flag(21),
        ADVANCED_VMEXIT_INFO: advanced_vmexit_info = flag(22),
        SUPERVISOR_SHADOW_STACK: supervisor_shadow_stack = flag(23),
        INVEPT_SINGLE_CONTEXT: invept_single_context = flag(25),
        INVEPT_ALL_CONTEXT: invept_all_context = flag(26),
        INVVPID: invvpid = flag(32),
        INVVPID_INDIVIDUAL_ADDRESS: invvpid_individual_address = flag(40),
        INVVPID_SINGLE_CONTEXT: invvpid_single_context = flag(41),
        INVVPID_ALL_CONTEXT: invvpid_all_context = flag(42),
        INVVPID_SINGLE_CONTEXT_RETAINING_GLOBALS: invvpid_single_context_retaining_globals = flag(43),
        MAX_HLAT_PREFIX_SIZE: max_hlat_prefix_size = range(0x3f_0000_0000_0000, 48),
    }
}

/// IA32_VMX_EPT_VPID_CAP is implemented if either EPT or VPID may be enabled.
const EPT_OR_VPID: &[Exists] = &[
    Exists::Allowed1(ia32_vmx_procbased_ctls2::ENABLE_EPT),
    Exists::Allowed1(ia32_vmx_procbased_ctls2::ENABLE_VPID),
];

/// Defines the TRUE capability MSRs. They share the bit layout of their
/// non-TRUE counterparts and are implemented when IA32_VMX_BASIC\[55\] is 1.
macro_rules! true_control_msr {
    ($(
        $(#[$meta:meta])*
        pub mod $name:ident = $base:ident;
    )*) => {
        $(
            $(#[$meta])*
            pub mod $name {
                use crate::{access::ReadOnly, capability::TRUE_CONTROLS, msr::Msr};

                /// The address.
                pub const ADDR: u32 = match super::$base::CAPS.true_msr() {
                    Some(addr) => addr,
                    None => panic!("no TRUE capability MSR"),
                };

                /// The register.
                pub const MSR: Msr<ReadOnly> =
                    Msr::new(ADDR, stringify!($name), super::$base::FIELDS)
                        .gated_by(TRUE_CONTROLS);
            }
        )*
    };
}

true_control_msr! {
    /// IA32_VMX_TRUE_PINBASED_CTLS
    pub mod ia32_vmx_true_pinbased_ctls = ia32_vmx_pinbased_ctls;

    /// IA32_VMX_TRUE_PROCBASED_CTLS
    pub mod ia32_vmx_true_procbased_ctls = ia32_vmx_procbased_ctls;

    /// IA32_VMX_TRUE_EXIT_CTLS
    pub mod ia32_vmx_true_exit_ctls = ia32_vmx_exit_ctls;

    /// IA32_VMX_TRUE_ENTRY_CTLS
    pub mod ia32_vmx_true_entry_ctls = ia32_vmx_entry_ctls;
}

/// Every VMX capability MSR, in address order.
pub const CATALOG: &[Msr<ReadOnly>] = &[
    ia32_vmx_basic::MSR,
    ia32_vmx_pinbased_ctls::MSR,
    ia32_vmx_procbased_ctls::MSR,
    ia32_vmx_exit_ctls::MSR,
    ia32_vmx_entry_ctls::MSR,
    ia32_vmx_misc::MSR,
    ia32_vmx_cr0_fixed0::MSR,
    ia32_vmx_cr0_fixed1::MSR,
    ia32_vmx_cr4_fixed0::MSR,
    ia32_vmx_cr4_fixed1::MSR,
    ia32_vmx_vmcs_enum::MSR,
    ia32_vmx_procbased_ctls2::MSR,
    ia32_vmx_ept_vpid_cap::MSR,
    ia32_vmx_true_pinbased_ctls::MSR,
    ia32_vmx_true_procbased_ctls::MSR,
    ia32_vmx_true_exit_ctls::MSR,
    ia32_vmx_true_entry_ctls::MSR,
    ia32_vmx_vmfunc::MSR,
    ia32_vmx_procbased_ctls3::MSR,
];

/// Dumps every VMX capability MSR implemented on this processor.
pub fn dump_vmx_capabilities<B, S>(cpu: &B, verbose: bool, sink: &mut S)
where
    B: MsrAccess + ?Sized,
    S: DumpSink + ?Sized,
{
    sink.emit(0, "VMX capabilities", DumpValue::Section);
    for msr in CATALOG {
        msr.dump_if_exists(cpu, 1, verbose, sink);
    }
}

/// Returns the VMCS revision identifier to write into VMXON and VMCS regions.
pub fn vmcs_revision_id<B: MsrAccess + ?Sized>(cpu: &B) -> u32 {
    ia32_vmx_basic::REVISION_IDENTIFIER.get(cpu) as u32
}

/// Returns the memory type the processor uses to access the VMCS, or `None`
/// for a reserved value.
pub fn vmcs_memory_type<B: MsrAccess + ?Sized>(cpu: &B) -> Option<MemoryType> {
    MemoryType::from_raw(ia32_vmx_basic::MEMORY_TYPE.get(cpu))
}

/// Updates the CR0 to satisfy the requirement for entering VMX operation.
///
/// In order to enter VMX operation, some bits in CR0 (and CR4) have to be
/// set or cleared as indicated by the FIXED0 and FIXED1 MSRs. The rule is
/// summarized as below (taking CR0 as an example):
///
/// ```text
///        IA32_VMX_CR0_FIXED0 IA32_VMX_CR0_FIXED1 Meaning
/// Bit X  1                   (Always 1)          The bit X of CR0 is fixed to 1
/// Bit X  0                   1                   The bit X of CR0 is flexible
/// Bit X  (Always 0)          0                   The bit X of CR0 is fixed to 0
/// ```
///
/// See: A.7 VMX-FIXED BITS IN CR0
pub fn adjust_cr0<B: MsrAccess + ?Sized>(cpu: &B, cr0: u64) -> u64 {
    adjust_fixed(cr0, ia32_vmx_cr0_fixed0::MSR.get(cpu), ia32_vmx_cr0_fixed1::MSR.get(cpu))
}

/// Updates the CR4 to satisfy the requirement for entering VMX operation.
///
/// See: A.8 VMX-FIXED BITS IN CR4
pub fn adjust_cr4<B: MsrAccess + ?Sized>(cpu: &B, cr4: u64) -> u64 {
    adjust_fixed(cr4, ia32_vmx_cr4_fixed0::MSR.get(cpu), ia32_vmx_cr4_fixed1::MSR.get(cpu))
}

/// Tests whether `cr0` can be used in VMX operation as is.
pub fn is_cr0_valid<B: MsrAccess + ?Sized>(cpu: &B, cr0: u64) -> bool {
    adjust_cr0(cpu, cr0) == cr0
}

/// Tests whether `cr4` can be used in VMX operation as is.
pub fn is_cr4_valid<B: MsrAccess + ?Sized>(cpu: &B, cr4: u64) -> bool {
    adjust_cr4(cpu, cr4) == cr4
}

const fn adjust_fixed(value: u64, fixed0: u64, fixed1: u64) -> u64 {
    (value & fixed1) | fixed0
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;
    use crate::{
        dump::{TextConfig, TextSink},
        testing::{Call, MockCpu, init_logger},
    };

    #[test]
    fn addresses() {
        assert_eq!(ia32_vmx_basic::ADDR, 0x480);
        assert_eq!(ia32_vmx_procbased_ctls2::ADDR, 0x48b);
        assert_eq!(ia32_vmx_true_pinbased_ctls::ADDR, 0x48d);
        assert_eq!(ia32_vmx_true_entry_ctls::ADDR, 0x490);
        assert_eq!(ia32_vmx_vmfunc::ADDR, 0x491);
        assert_eq!(ia32_vmx_procbased_ctls3::ADDR, 0x492);
        assert!(CATALOG.windows(2).all(|w| w[0].address() < w[1].address()));
    }

    #[test]
    fn enable_ept_raw_versus_allowed1() {
        init_logger();
        let cpu = MockCpu::new()
            .with_msr(0x480, 0)
            .with_msr(0x482, 1 << 63)
            .with_msr(0x48b, 1 << 33);
        let enable_ept = ia32_vmx_procbased_ctls2::ENABLE_EPT;
        assert!(enable_ept.is_allowed1(&cpu));
        assert!(!enable_ept.is_enabled(&cpu));
        assert!(enable_ept.is_disabled(&cpu));
    }

    #[test]
    fn basic_information() {
        // Revision 4, 4KB regions, write-back, TRUE controls.
        let basic = 0x00da_1000_0000_0004;
        let cpu = MockCpu::new().with_msr(0x480, basic);
        assert_eq!(vmcs_revision_id(&cpu), 4);
        assert_eq!(ia32_vmx_basic::REGION_SIZE.get(&cpu), 0x1000);
        assert_eq!(vmcs_memory_type(&cpu), Some(MemoryType::WriteBack));
        assert!(ia32_vmx_basic::TRUE_BASED_CONTROLS.is_enabled(&cpu));
        assert!(ia32_vmx_basic::INS_OUTS_REPORTING.is_enabled(&cpu));
        assert!(ia32_vmx_basic::NO_ERROR_CODE_REQUIREMENT.is_disabled(&cpu));
    }

    #[test]
    fn fixed_bits() {
        let cpu = MockCpu::new()
            .with_msr(0x486, 0x8000_0021)
            .with_msr(0x487, 0xffff_ffff)
            .with_msr(0x488, 0x2000)
            .with_msr(0x489, 0x003f_ffff);

        // PE, NE and PG are required.
        assert_eq!(adjust_cr0(&cpu, 0x11), 0x8000_0031);
        assert!(is_cr0_valid(&cpu, 0x8000_0031));
        assert!(!is_cr0_valid(&cpu, 0x11));

        // VMXE is required and bit 22 and above are reserved.
        assert_eq!(adjust_cr4(&cpu, 0x0040_0020), 0x2020);
        assert!(!is_cr4_valid(&cpu, 0x20));
        assert!(is_cr4_valid(&cpu, 0x2020));
    }

    #[test]
    fn dump_skips_absent_msrs() {
        init_logger();
        // No TRUE controls, no secondary and tertiary controls.
        let cpu = MockCpu::new()
            .with_msr(0x480, 0)
            .with_msr(0x481, 0)
            .with_msr(0x482, 0)
            .with_msr(0x483, 0)
            .with_msr(0x484, 0)
            .with_msr(0x485, 0)
            .with_msr(0x486, 0)
            .with_msr(0x487, 0)
            .with_msr(0x488, 0)
            .with_msr(0x489, 0)
            .with_msr(0x48a, 0);
        let mut sink = TextSink::new(TextConfig::default());
        dump_vmx_capabilities(&cpu, true, &mut sink);

        let text: String = sink.into_text();
        assert!(text.contains("ia32_vmx_basic"));
        assert!(text.contains("ia32_vmx_procbased_ctls2"));
        assert!(text.contains("<absent>"));
        for absent in [0x48b, 0x48c, 0x48d, 0x48e, 0x48f, 0x490, 0x491, 0x492] {
            assert!(!cpu.calls().contains(&Call::Rdmsr(absent)), "{absent:#x}");
        }
    }
}
