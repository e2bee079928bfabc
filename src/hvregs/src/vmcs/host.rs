//! The host-state fields.
//!
//! See: 25.5 HOST-STATE AREA

use super::vmcs_fields;
use crate::msr::vmx::ia32_vmx_exit_ctls as exit;

vmcs_fields! {
    const ALL: "host_";

    // 16-bit

    /// Host ES selector
    pub mod es_selector: ReadWrite = 0x0c00 {}

    /// Host CS selector
    pub mod cs_selector: ReadWrite = 0x0c02 {}

    /// Host SS selector
    pub mod ss_selector: ReadWrite = 0x0c04 {}

    /// Host DS selector
    pub mod ds_selector: ReadWrite = 0x0c06 {}

    /// Host FS selector
    pub mod fs_selector: ReadWrite = 0x0c08 {}

    /// Host GS selector
    pub mod gs_selector: ReadWrite = 0x0c0a {}

    /// Host TR selector
    pub mod tr_selector: ReadWrite = 0x0c0c {}

    // 64-bit

    /// Host IA32_PAT
    pub mod ia32_pat: ReadWrite = 0x2c00
        [exists: Exists::Allowed1(super::exit::LOAD_IA32_PAT)] {}

    /// Host IA32_EFER
    pub mod ia32_efer: ReadWrite = 0x2c02
        [exists: Exists::Allowed1(super::exit::LOAD_IA32_EFER)] {
        SCE: sce = flag(0),
        LME: lme = flag(8),
        LMA: lma = flag(10),
        NXE: nxe = flag(11),
    }

    /// Host IA32_PERF_GLOBAL_CTRL
    pub mod ia32_perf_global_ctrl: ReadWrite = 0x2c04
        [exists: Exists::Allowed1(super::exit::LOAD_IA32_PERF_GLOBAL_CTRL)] {}

    /// Host IA32_PKRS
    pub mod ia32_pkrs: ReadWrite = 0x2c06
        [exists: Exists::Allowed1(super::exit::LOAD_PKRS)] {}

    // 32-bit

    /// Host IA32_SYSENTER_CS
    pub mod ia32_sysenter_cs: ReadWrite = 0x4c00 {}

    // Natural-width

    /// Host CR0
    pub mod cr0: ReadWrite = 0x6c00 {}

    /// Host CR3
    pub mod cr3: ReadWrite = 0x6c02 {}

    /// Host CR4
    pub mod cr4: ReadWrite = 0x6c04 {}

    /// Host FS base
    pub mod fs_base: ReadWrite = 0x6c06 {}

    /// Host GS base
    pub mod gs_base: ReadWrite = 0x6c08 {}

    /// Host TR base
    pub mod tr_base: ReadWrite = 0x6c0a {}

    /// Host GDTR base
    pub mod gdtr_base: ReadWrite = 0x6c0c {}

    /// Host IDTR base
    pub mod idtr_base: ReadWrite = 0x6c0e {}

    /// Host IA32_SYSENTER_ESP
    pub mod ia32_sysenter_esp: ReadWrite = 0x6c10 {}

    /// Host IA32_SYSENTER_EIP
    pub mod ia32_sysenter_eip: ReadWrite = 0x6c12 {}

    /// Host RSP
    pub mod rsp: ReadWrite = 0x6c14 {}

    /// Host RIP
    pub mod rip: ReadWrite = 0x6c16 {}

    /// Host IA32_S_CET
    pub mod ia32_s_cet: ReadWrite = 0x6c18
        [exists: Exists::Allowed1(super::exit::LOAD_CET_STATE)] {}

    /// Host SSP
    pub mod ssp: ReadWrite = 0x6c1a
        [exists: Exists::Allowed1(super::exit::LOAD_CET_STATE)] {}

    /// Host IA32_INTERRUPT_SSP_TABLE_ADDR
    pub mod ia32_interrupt_ssp_table_addr: ReadWrite = 0x6c1c
        [exists: Exists::Allowed1(super::exit::LOAD_CET_STATE)] {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCpu, init_logger};

    #[test]
    fn host_efer_follows_the_exit_control() {
        init_logger();
        let cpu = MockCpu::new()
            .with_msr(0x480, 1 << 55)
            .with_msr(0x48f, 1 << (32 + 21))
            .with_vmcs(0x2c02, 0);
        assert!(ia32_efer::FIELD.exists(&cpu));
        assert!(!ia32_pat::FIELD.exists(&cpu));

        assert_eq!(ia32_efer::LMA.enable_if_exists(&cpu, false), Ok(true));
        assert_eq!(ia32_efer::LME.enable_if_exists(&cpu, false), Ok(true));
        assert_eq!(cpu.vmcs(0x2c02), Some(0x500));
        assert_eq!(ia32_pat::FIELD.set_if_exists(&cpu, 0x0007_0406, true), Ok(false));
        assert_eq!(cpu.vmcs(0x2c00), None);
    }
}
