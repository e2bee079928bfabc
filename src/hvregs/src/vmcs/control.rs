//! The VM-execution, VM-exit and VM-entry control fields.
//!
//! See: 25.6 VM-EXECUTION CONTROL FIELDS, 25.7 VM-EXIT CONTROL FIELDS and
//! 25.8 VM-ENTRY CONTROL FIELDS

use super::vmcs_fields;
use crate::{
    capability::Exists,
    msr::vmx::{
        ia32_vmx_basic as basic, ia32_vmx_entry_ctls as entry, ia32_vmx_exit_ctls as exit,
        ia32_vmx_pinbased_ctls as pin, ia32_vmx_procbased_ctls as proc,
        ia32_vmx_procbased_ctls2 as proc2, ia32_vmx_procbased_ctls3 as proc3,
        ia32_vmx_vmfunc as vmfunc,
    },
};

/// The EPTP list is consulted for EPTP switching, a VM function.
const EPTP_LIST: &[Exists] = &[
    Exists::Allowed1(proc2::ENABLE_VM_FUNCTIONS),
    Exists::Allowed1(vmfunc::EPTP_SWITCHING),
];

vmcs_fields! {
    const ALL: "";

    // 16-bit

    /// Virtual-processor identifier (VPID)
    pub mod virtual_processor_identifier: ReadWrite = 0x0000
        [exists: Exists::Allowed1(super::proc2::ENABLE_VPID)] {}

    /// Posted-interrupt notification vector
    pub mod posted_interrupt_notification_vector: ReadWrite = 0x0002
        [exists: Exists::Allowed1(super::pin::PROCESS_POSTED_INTERRUPTS)] {
        VECTOR: vector = range(0xff, 0),
    }

    /// EPTP index
    pub mod eptp_index: ReadWrite = 0x0004
        [exists: Exists::Allowed1(super::proc2::EPT_VIOLATION_VE)] {}

    /// HLAT prefix size
    pub mod hlat_prefix_size: ReadWrite = 0x0006
        [exists: Exists::Allowed1(super::proc3::ENABLE_HLAT)] {}

    /// Last PID-pointer index
    pub mod last_pid_pointer_index: ReadWrite = 0x0008
        [exists: Exists::Allowed1(super::proc3::IPI_VIRTUALIZATION)] {}

    // 64-bit

    /// Address of I/O bitmap A
    pub mod io_bitmap_a_address: ReadWrite = 0x2000
        [exists: Exists::Allowed1(super::proc::USE_IO_BITMAPS)] {}

    /// Address of I/O bitmap B
    pub mod io_bitmap_b_address: ReadWrite = 0x2002
        [exists: Exists::Allowed1(super::proc::USE_IO_BITMAPS)] {}

    /// Address of MSR bitmaps
    pub mod msr_bitmap_address: ReadWrite = 0x2004
        [exists: Exists::Allowed1(super::proc::USE_MSR_BITMAPS)] {}

    /// VM-exit MSR-store address
    pub mod vm_exit_msr_store_address: ReadWrite = 0x2006 {}

    /// VM-exit MSR-load address
    pub mod vm_exit_msr_load_address: ReadWrite = 0x2008 {}

    /// VM-entry MSR-load address
    pub mod vm_entry_msr_load_address: ReadWrite = 0x200a {}

    /// Executive-VMCS pointer
    pub mod executive_vmcs_pointer: ReadWrite = 0x200c
        [exists: Exists::Enabled(super::basic::DUAL_MONITOR_TREATMENT)] {}

    /// PML address
    pub mod pml_address: ReadWrite = 0x200e
        [exists: Exists::Allowed1(super::proc2::ENABLE_PML)] {}

    /// TSC offset
    pub mod tsc_offset: ReadWrite = 0x2010
        [exists: Exists::Allowed1(super::proc::USE_TSC_OFFSETTING)] {}

    /// Virtual-APIC address
    pub mod virtual_apic_address: ReadWrite = 0x2012
        [exists: Exists::Allowed1(super::proc::USE_TPR_SHADOW)] {}

    /// APIC-access address
    pub mod apic_access_address: ReadWrite = 0x2014
        [exists: Exists::Allowed1(super::proc2::VIRTUALIZE_APIC_ACCESSES)] {}

    /// Posted-interrupt descriptor address
    pub mod posted_interrupt_descriptor_address: ReadWrite = 0x2016
        [exists: Exists::Allowed1(super::pin::PROCESS_POSTED_INTERRUPTS)] {}

    /// VM-function controls
    pub mod vm_function_controls: ReadWrite = 0x2018
        [exists: Exists::Allowed1(super::proc2::ENABLE_VM_FUNCTIONS)] {
        EPTP_SWITCHING: eptp_switching = control(super::vmfunc::EPTP_SWITCHING),
    }

    /// EPT pointer (EPTP)
    ///
    /// See: 25.6.11 Extended-Page-Table Pointer (EPTP)
    pub mod ept_pointer: ReadWrite = 0x201a
        [exists: Exists::Allowed1(super::proc2::ENABLE_EPT)] {
        MEMORY_TYPE: memory_type = range(0x7, 0),
        PAGE_WALK_LENGTH: page_walk_length = range(0x38, 3),
        ENABLE_ACCESSED_DIRTY: enable_accessed_dirty = flag(6),
        ENFORCE_SSS: enforce_sss = flag(7),
        PML4_ADDRESS: pml4_address = range(0x000f_ffff_ffff_f000, 12),
    }

    /// EOI-exit bitmap 0
    pub mod eoi_exit_bitmap_0: ReadWrite = 0x201c
        [exists: Exists::Allowed1(super::proc2::VIRTUAL_INTERRUPT_DELIVERY)] {}

    /// EOI-exit bitmap 1
    pub mod eoi_exit_bitmap_1: ReadWrite = 0x201e
        [exists: Exists::Allowed1(super::proc2::VIRTUAL_INTERRUPT_DELIVERY)] {}

    /// EOI-exit bitmap 2
    pub mod eoi_exit_bitmap_2: ReadWrite = 0x2020
        [exists: Exists::Allowed1(super::proc2::VIRTUAL_INTERRUPT_DELIVERY)] {}

    /// EOI-exit bitmap 3
    pub mod eoi_exit_bitmap_3: ReadWrite = 0x2022
        [exists: Exists::Allowed1(super::proc2::VIRTUAL_INTERRUPT_DELIVERY)] {}

    /// EPTP-list address
    pub mod eptp_list_address: ReadWrite = 0x2024 [exists: Exists::All(super::EPTP_LIST)] {}

    /// VMREAD-bitmap address
    pub mod vmread_bitmap_address: ReadWrite = 0x2026
        [exists: Exists::Allowed1(super::proc2::VMCS_SHADOWING)] {}

    /// VMWRITE-bitmap address
    pub mod vmwrite_bitmap_address: ReadWrite = 0x2028
        [exists: Exists::Allowed1(super::proc2::VMCS_SHADOWING)] {}

    /// Virtualization-exception information address
    pub mod virtualization_exception_information_address: ReadWrite = 0x202a
        [exists: Exists::Allowed1(super::proc2::EPT_VIOLATION_VE)] {}

    /// XSS-exiting bitmap
    pub mod xss_exiting_bitmap: ReadWrite = 0x202c
        [exists: Exists::Allowed1(super::proc2::ENABLE_XSAVES_XRSTORS)] {}

    /// ENCLS-exiting bitmap
    pub mod encls_exiting_bitmap: ReadWrite = 0x202e
        [exists: Exists::Allowed1(super::proc2::ENABLE_ENCLS_EXITING)] {}

    /// Sub-page-permission-table pointer
    pub mod sub_page_permission_table_pointer: ReadWrite = 0x2030
        [exists: Exists::Allowed1(super::proc2::SUB_PAGE_WRITE_PERMISSIONS)] {}

    /// TSC multiplier
    pub mod tsc_multiplier: ReadWrite = 0x2032
        [exists: Exists::Allowed1(super::proc2::USE_TSC_SCALING)] {}

    /// Tertiary processor-based VM-execution controls
    pub mod tertiary_processor_based_vm_execution_controls: ReadWrite = 0x2034
        [exists: Exists::Allowed1(super::proc::ACTIVATE_TERTIARY_CONTROLS)] {
        LOADIWKEY_EXITING: loadiwkey_exiting = control(super::proc3::LOADIWKEY_EXITING),
        ENABLE_HLAT: enable_hlat = control(super::proc3::ENABLE_HLAT),
        EPT_PAGING_WRITE_CONTROL: ept_paging_write_control =
            control(super::proc3::EPT_PAGING_WRITE_CONTROL),
        GUEST_PAGING_VERIFICATION: guest_paging_verification =
            control(super::proc3::GUEST_PAGING_VERIFICATION),
        IPI_VIRTUALIZATION: ipi_virtualization = control(super::proc3::IPI_VIRTUALIZATION),
        VIRTUALIZE_IA32_SPEC_CTRL: virtualize_ia32_spec_ctrl =
            control(super::proc3::VIRTUALIZE_IA32_SPEC_CTRL),
    }

    /// ENCLV-exiting bitmap
    pub mod enclv_exiting_bitmap: ReadWrite = 0x2036
        [exists: Exists::Allowed1(super::proc2::ENABLE_ENCLV_EXITING)] {}

    /// PCONFIG-exiting bitmap
    pub mod pconfig_exiting_bitmap: ReadWrite = 0x203e
        [exists: Exists::Allowed1(super::proc2::ENABLE_PCONFIG)] {}

    /// Hypervisor-managed linear-address translation pointer (HLATP)
    pub mod hlat_pointer: ReadWrite = 0x2040
        [exists: Exists::Allowed1(super::proc3::ENABLE_HLAT)] {}

    /// Secondary VM-exit controls
    pub mod secondary_vm_exit_controls: ReadWrite = 0x2044
        [exists: Exists::Allowed1(super::exit::ACTIVATE_SECONDARY_CONTROLS)] {}

    // 32-bit

    /// Pin-based VM-execution controls
    ///
    /// See: 25.6.1 Pin-Based VM-Execution Controls
    pub mod pin_based_vm_execution_controls: ReadWrite = 0x4000 {
        EXTERNAL_INTERRUPT_EXITING: external_interrupt_exiting =
            control(super::pin::EXTERNAL_INTERRUPT_EXITING),
        NMI_EXITING: nmi_exiting = control(super::pin::NMI_EXITING),
        VIRTUAL_NMIS: virtual_nmis = control(super::pin::VIRTUAL_NMIS),
        ACTIVATE_VMX_PREEMPTION_TIMER: activate_vmx_preemption_timer =
            control(super::pin::ACTIVATE_VMX_PREEMPTION_TIMER),
        PROCESS_POSTED_INTERRUPTS: process_posted_interrupts =
            control(super::pin::PROCESS_POSTED_INTERRUPTS),
    }

    /// Primary processor-based VM-execution controls
    ///
    /// See: 25.6.2 Processor-Based VM-Execution Controls
    pub mod primary_processor_based_vm_execution_controls: ReadWrite = 0x4002 {
        INTERRUPT_WINDOW_EXITING: interrupt_window_exiting =
            control(super::proc::INTERRUPT_WINDOW_EXITING),
        USE_TSC_OFFSETTING: use_tsc_offsetting = control(super::proc::USE_TSC_OFFSETTING),
        HLT_EXITING: hlt_exiting = control(super::proc::HLT_EXITING),
        INVLPG_EXITING: invlpg_exiting = control(super::proc::INVLPG_EXITING),
        MWAIT_EXITING: mwait_exiting = control(super::proc::MWAIT_EXITING),
        RDPMC_EXITING: rdpmc_exiting = control(super::proc::RDPMC_EXITING),
        RDTSC_EXITING: rdtsc_exiting = control(super::proc::RDTSC_EXITING),
        CR3_LOAD_EXITING: cr3_load_exiting = control(super::proc::CR3_LOAD_EXITING),
        CR3_STORE_EXITING: cr3_store_exiting = control(super::proc::CR3_STORE_EXITING),
        ACTIVATE_TERTIARY_CONTROLS: activate_tertiary_controls =
            control(super::proc::ACTIVATE_TERTIARY_CONTROLS),
        CR8_LOAD_EXITING: cr8_load_exiting = control(super::proc::CR8_LOAD_EXITING),
        CR8_STORE_EXITING: cr8_store_exiting = control(super::proc::CR8_STORE_EXITING),
        USE_TPR_SHADOW: use_tpr_shadow = control(super::proc::USE_TPR_SHADOW),
        NMI_WINDOW_EXITING: nmi_window_exiting = control(super::proc::NMI_WINDOW_EXITING),
        MOV_DR_EXITING: mov_dr_exiting = control(super::proc::MOV_DR_EXITING),
        UNCONDITIONAL_IO_EXITING: unconditional_io_exiting =
            control(super::proc::UNCONDITIONAL_IO_EXITING),
        USE_IO_BITMAPS: use_io_bitmaps = control(super::proc::USE_IO_BITMAPS),
        MONITOR_TRAP_FLAG: monitor_trap_flag = control(super::proc::MONITOR_TRAP_FLAG),
        USE_MSR_BITMAPS: use_msr_bitmaps = control(super::proc::USE_MSR_BITMAPS),
        MONITOR_EXITING: monitor_exiting = control(super::proc::MONITOR_EXITING),
        PAUSE_EXITING: pause_exiting = control(super::proc::PAUSE_EXITING),
        ACTIVATE_SECONDARY_CONTROLS: activate_secondary_controls =
            control(super::proc::ACTIVATE_SECONDARY_CONTROLS),
    }

    /// Exception bitmap
    pub mod exception_bitmap: ReadWrite = 0x4004 {}

    /// Page-fault error-code mask
    pub mod page_fault_error_code_mask: ReadWrite = 0x4006 {}

    /// Page-fault error-code match
    pub mod page_fault_error_code_match: ReadWrite = 0x4008 {}

    /// CR3-target count
    pub mod cr3_target_count: ReadWrite = 0x400a {}

    /// Primary VM-exit controls
    ///
    /// See: 25.7.1 VM-Exit Controls
    pub mod primary_vm_exit_controls: ReadWrite = 0x400c {
        SAVE_DEBUG_CONTROLS: save_debug_controls = control(super::exit::SAVE_DEBUG_CONTROLS),
        HOST_ADDRESS_SPACE_SIZE: host_address_space_size =
            control(super::exit::HOST_ADDRESS_SPACE_SIZE),
        LOAD_IA32_PERF_GLOBAL_CTRL: load_ia32_perf_global_ctrl =
            control(super::exit::LOAD_IA32_PERF_GLOBAL_CTRL),
        ACKNOWLEDGE_INTERRUPT_ON_EXIT: acknowledge_interrupt_on_exit =
            control(super::exit::ACKNOWLEDGE_INTERRUPT_ON_EXIT),
        SAVE_IA32_PAT: save_ia32_pat = control(super::exit::SAVE_IA32_PAT),
        LOAD_IA32_PAT: load_ia32_pat = control(super::exit::LOAD_IA32_PAT),
        SAVE_IA32_EFER: save_ia32_efer = control(super::exit::SAVE_IA32_EFER),
        LOAD_IA32_EFER: load_ia32_efer = control(super::exit::LOAD_IA32_EFER),
        SAVE_VMX_PREEMPTION_TIMER_VALUE: save_vmx_preemption_timer_value =
            control(super::exit::SAVE_VMX_PREEMPTION_TIMER_VALUE),
        CLEAR_IA32_BNDCFGS: clear_ia32_bndcfgs = control(super::exit::CLEAR_IA32_BNDCFGS),
        CONCEAL_VMX_FROM_PT: conceal_vmx_from_pt = control(super::exit::CONCEAL_VMX_FROM_PT),
        CLEAR_IA32_RTIT_CTL: clear_ia32_rtit_ctl = control(super::exit::CLEAR_IA32_RTIT_CTL),
        CLEAR_IA32_LBR_CTL: clear_ia32_lbr_ctl = control(super::exit::CLEAR_IA32_LBR_CTL),
        CLEAR_UINV: clear_uinv = control(super::exit::CLEAR_UINV),
        LOAD_CET_STATE: load_cet_state = control(super::exit::LOAD_CET_STATE),
        LOAD_PKRS: load_pkrs = control(super::exit::LOAD_PKRS),
        SAVE_IA32_PERF_GLOBAL_CTRL: save_ia32_perf_global_ctrl =
            control(super::exit::SAVE_IA32_PERF_GLOBAL_CTRL),
        ACTIVATE_SECONDARY_CONTROLS: activate_secondary_controls =
            control(super::exit::ACTIVATE_SECONDARY_CONTROLS),
    }

    /// VM-exit MSR-store count
    pub mod vm_exit_msr_store_count: ReadWrite = 0x400e {}

    /// VM-exit MSR-load count
    pub mod vm_exit_msr_load_count: ReadWrite = 0x4010 {}

    /// VM-entry controls
    ///
    /// See: 25.8.1 VM-Entry Controls
    pub mod vm_entry_controls: ReadWrite = 0x4012 {
        LOAD_DEBUG_CONTROLS: load_debug_controls = control(super::entry::LOAD_DEBUG_CONTROLS),
        IA32E_MODE_GUEST: ia32e_mode_guest = control(super::entry::IA32E_MODE_GUEST),
        ENTRY_TO_SMM: entry_to_smm = control(super::entry::ENTRY_TO_SMM),
        DEACTIVATE_DUAL_MONITOR_TREATMENT: deactivate_dual_monitor_treatment =
            control(super::entry::DEACTIVATE_DUAL_MONITOR_TREATMENT),
        LOAD_IA32_PERF_GLOBAL_CTRL: load_ia32_perf_global_ctrl =
            control(super::entry::LOAD_IA32_PERF_GLOBAL_CTRL),
        LOAD_IA32_PAT: load_ia32_pat = control(super::entry::LOAD_IA32_PAT),
        LOAD_IA32_EFER: load_ia32_efer = control(super::entry::LOAD_IA32_EFER),
        LOAD_IA32_BNDCFGS: load_ia32_bndcfgs = control(super::entry::LOAD_IA32_BNDCFGS),
        CONCEAL_VMX_FROM_PT: conceal_vmx_from_pt = control(super::entry::CONCEAL_VMX_FROM_PT),
        LOAD_IA32_RTIT_CTL: load_ia32_rtit_ctl = control(super::entry::LOAD_IA32_RTIT_CTL),
        LOAD_UINV: load_uinv = control(super::entry::LOAD_UINV),
        LOAD_CET_STATE: load_cet_state = control(super::entry::LOAD_CET_STATE),
        LOAD_IA32_LBR_CTL: load_ia32_lbr_ctl = control(super::entry::LOAD_IA32_LBR_CTL),
        LOAD_PKRS: load_pkrs = control(super::entry::LOAD_PKRS),
    }

    /// VM-entry MSR-load count
    pub mod vm_entry_msr_load_count: ReadWrite = 0x4014 {}

    /// VM-entry interruption-information field
    ///
    /// See: 25.8.3 VM-Entry Controls for Event Injection
    pub mod vm_entry_interruption_information: ReadWrite = 0x4016 {
        VECTOR: vector = range(0xff, 0),
        INTERRUPTION_TYPE: interruption_type = range(0x700, 8),
        DELIVER_ERROR_CODE: deliver_error_code = flag(11),
        VALID: valid = flag(31),
    }

    /// VM-entry exception error code
    pub mod vm_entry_exception_error_code: ReadWrite = 0x4018 {}

    /// VM-entry instruction length
    pub mod vm_entry_instruction_length: ReadWrite = 0x401a {}

    /// TPR threshold
    pub mod tpr_threshold: ReadWrite = 0x401c
        [exists: Exists::Allowed1(super::proc::USE_TPR_SHADOW)] {
        THRESHOLD: threshold = range(0xf, 0),
    }

    /// Secondary processor-based VM-execution controls
    ///
    /// See: 25.6.2 Processor-Based VM-Execution Controls
    pub mod secondary_processor_based_vm_execution_controls: ReadWrite = 0x401e
        [exists: Exists::Allowed1(super::proc::ACTIVATE_SECONDARY_CONTROLS)] {
        VIRTUALIZE_APIC_ACCESSES: virtualize_apic_accesses =
            control(super::proc2::VIRTUALIZE_APIC_ACCESSES),
        ENABLE_EPT: enable_ept = control(super::proc2::ENABLE_EPT),
        DESCRIPTOR_TABLE_EXITING: descriptor_table_exiting =
            control(super::proc2::DESCRIPTOR_TABLE_EXITING),
        ENABLE_RDTSCP: enable_rdtscp = control(super::proc2::ENABLE_RDTSCP),
        VIRTUALIZE_X2APIC_MODE: virtualize_x2apic_mode =
            control(super::proc2::VIRTUALIZE_X2APIC_MODE),
        ENABLE_VPID: enable_vpid = control(super::proc2::ENABLE_VPID),
        WBINVD_EXITING: wbinvd_exiting = control(super::proc2::WBINVD_EXITING),
        UNRESTRICTED_GUEST: unrestricted_guest = control(super::proc2::UNRESTRICTED_GUEST),
        APIC_REGISTER_VIRTUALIZATION: apic_register_virtualization =
            control(super::proc2::APIC_REGISTER_VIRTUALIZATION),
        VIRTUAL_INTERRUPT_DELIVERY: virtual_interrupt_delivery =
            control(super::proc2::VIRTUAL_INTERRUPT_DELIVERY),
        PAUSE_LOOP_EXITING: pause_loop_exiting = control(super::proc2::PAUSE_LOOP_EXITING),
        RDRAND_EXITING: rdrand_exiting = control(super::proc2::RDRAND_EXITING),
        ENABLE_INVPCID: enable_invpcid = control(super::proc2::ENABLE_INVPCID),
        ENABLE_VM_FUNCTIONS: enable_vm_functions = control(super::proc2::ENABLE_VM_FUNCTIONS),
        VMCS_SHADOWING: vmcs_shadowing = control(super::proc2::VMCS_SHADOWING),
        ENABLE_ENCLS_EXITING: enable_encls_exiting = control(super::proc2::ENABLE_ENCLS_EXITING),
        RDSEED_EXITING: rdseed_exiting = control(super::proc2::RDSEED_EXITING),
        ENABLE_PML: enable_pml = control(super::proc2::ENABLE_PML),
        EPT_VIOLATION_VE: ept_violation_ve = control(super::proc2::EPT_VIOLATION_VE),
        CONCEAL_VMX_FROM_PT: conceal_vmx_from_pt = control(super::proc2::CONCEAL_VMX_FROM_PT),
        ENABLE_XSAVES_XRSTORS: enable_xsaves_xrstors =
            control(super::proc2::ENABLE_XSAVES_XRSTORS),
        PASID_TRANSLATION: pasid_translation = control(super::proc2::PASID_TRANSLATION),
        MODE_BASED_EXECUTE_CONTROL: mode_based_execute_control =
            control(super::proc2::MODE_BASED_EXECUTE_CONTROL),
        SUB_PAGE_WRITE_PERMISSIONS: sub_page_write_permissions =
            control(super::proc2::SUB_PAGE_WRITE_PERMISSIONS),
        PT_USES_GUEST_PHYSICAL_ADDRESSES: pt_uses_guest_physical_addresses =
            control(super::proc2::PT_USES_GUEST_PHYSICAL_ADDRESSES),
        USE_TSC_SCALING: use_tsc_scaling = control(super::proc2::USE_TSC_SCALING),
        ENABLE_USER_WAIT_AND_PAUSE: enable_user_wait_and_pause =
            control(super::proc2::ENABLE_USER_WAIT_AND_PAUSE),
        ENABLE_PCONFIG: enable_pconfig = control(super::proc2::ENABLE_PCONFIG),
        ENABLE_ENCLV_EXITING: enable_enclv_exiting = control(super::proc2::ENABLE_ENCLV_EXITING),
        VMM_BUS_LOCK_DETECTION: vmm_bus_lock_detection =
            control(super::proc2::VMM_BUS_LOCK_DETECTION),
        INSTRUCTION_TIMEOUT: instruction_timeout = control(super::proc2::INSTRUCTION_TIMEOUT),
    }

    /// PLE_Gap
    pub mod ple_gap: ReadWrite = 0x4020
        [exists: Exists::Allowed1(super::proc2::PAUSE_LOOP_EXITING)] {}

    /// PLE_Window
    pub mod ple_window: ReadWrite = 0x4022
        [exists: Exists::Allowed1(super::proc2::PAUSE_LOOP_EXITING)] {}

    /// Instruction-timeout control
    pub mod instruction_timeout_control: ReadWrite = 0x4024
        [exists: Exists::Allowed1(super::proc2::INSTRUCTION_TIMEOUT)] {}

    // Natural-width

    /// CR0 guest/host mask
    pub mod cr0_guest_host_mask: ReadWrite = 0x6000 {}

    /// CR4 guest/host mask
    pub mod cr4_guest_host_mask: ReadWrite = 0x6002 {}

    /// CR0 read shadow
    pub mod cr0_read_shadow: ReadWrite = 0x6004 {}

    /// CR4 read shadow
    pub mod cr4_read_shadow: ReadWrite = 0x6006 {}

    /// CR3-target value 0
    pub mod cr3_target_value0: ReadWrite = 0x6008 {}

    /// CR3-target value 1
    pub mod cr3_target_value1: ReadWrite = 0x600a {}

    /// CR3-target value 2
    pub mod cr3_target_value2: ReadWrite = 0x600c {}

    /// CR3-target value 3
    pub mod cr3_target_value3: ReadWrite = 0x600e {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCpu, init_logger};

    #[test]
    fn control_subfields_share_the_capability_bit() {
        let enable_ept = secondary_processor_based_vm_execution_controls::ENABLE_EPT;
        assert_eq!(enable_ept.field().from(), 1);
        assert_eq!(enable_ept.as_control().map(|c| c.caps().msr()), Some(0x48b));

        let hlt_exiting = primary_processor_based_vm_execution_controls::HLT_EXITING;
        assert_eq!(hlt_exiting.field().mask(), 1 << 7);
        assert_eq!(hlt_exiting.as_control().map(|c| c.caps().true_msr()), Some(Some(0x48e)));

        assert!(ept_pointer::MEMORY_TYPE.as_control().is_none());
    }

    #[test]
    fn eptp_list_requires_eptp_switching() {
        init_logger();
        let base = || {
            MockCpu::new()
                .with_msr(0x480, 0)
                .with_msr(0x482, 1 << 63)
                .with_msr(0x48b, 1 << (32 + 13))
        };

        let cpu = base().with_msr(0x491, 0);
        assert!(vm_function_controls::FIELD.exists(&cpu));
        assert!(!eptp_list_address::FIELD.exists(&cpu));

        let cpu = base().with_msr(0x491, 1);
        assert!(eptp_list_address::FIELD.exists(&cpu));
    }

    #[test]
    fn executive_vmcs_pointer_requires_dual_monitor_treatment() {
        init_logger();
        let cpu = MockCpu::new().with_msr(0x480, 1 << 49);
        assert!(executive_vmcs_pointer::FIELD.exists(&cpu));
        let cpu = MockCpu::new().with_msr(0x480, 0);
        assert!(!executive_vmcs_pointer::FIELD.exists(&cpu));
    }
}
