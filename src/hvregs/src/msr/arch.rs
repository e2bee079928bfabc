//! Architectural MSRs other than the VMX capability MSRs.
//!
//! See: Table 2-2. IA-32 Architectural MSRs

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::msr;

msr! {
    const CATALOG;

    /// IA32_TIME_STAMP_COUNTER
    pub mod ia32_time_stamp_counter: ReadWrite = 0x10 {}

    /// IA32_APIC_BASE
    pub mod ia32_apic_base: ReadWrite = 0x1b {
        BSP: bsp = flag(8),
        X2APIC_ENABLE: x2apic_enable = flag(10),
        APIC_GLOBAL_ENABLE: apic_global_enable = flag(11),
        APIC_BASE: apic_base = range(0x000f_ffff_ffff_f000, 12),
    }

    /// IA32_FEATURE_CONTROL
    ///
    /// See: 24.7 ENABLING AND ENTERING VMX OPERATION
    pub mod ia32_feature_control: ReadWrite = 0x3a {
        LOCK_BIT: lock_bit = flag(0),
        ENABLE_VMX_INSIDE_SMX: enable_vmx_inside_smx = flag(1),
        ENABLE_VMX_OUTSIDE_SMX: enable_vmx_outside_smx = flag(2),
        SENTER_LOCAL_FUNCTION_ENABLES: senter_local_function_enables = range(0x7f00, 8),
        SENTER_GLOBAL_ENABLE: senter_global_enable = flag(15),
        SGX_LAUNCH_CONTROL_ENABLE: sgx_launch_control_enable = flag(17),
        SGX_GLOBAL_ENABLE: sgx_global_enable = flag(18),
        LMCE_ON: lmce_on = flag(20),
    }

    /// IA32_TSC_ADJUST
    pub mod ia32_tsc_adjust: ReadWrite = 0x3b {}

    /// IA32_SPEC_CTRL
    pub mod ia32_spec_ctrl: ReadWrite = 0x48 {
        IBRS: ibrs = flag(0),
        STIBP: stibp = flag(1),
        SSBD: ssbd = flag(2),
    }

    /// IA32_MTRRCAP
    pub mod ia32_mtrrcap: ReadOnly = 0xfe {
        VCNT: vcnt = range(0xff, 0),
        FIXED_RANGE_SUPPORTED: fixed_range_supported = flag(8),
        WC_SUPPORTED: wc_supported = flag(10),
        SMRR_SUPPORTED: smrr_supported = flag(11),
        PRMRR_SUPPORTED: prmrr_supported = flag(12),
    }

    /// IA32_SYSENTER_CS
    pub mod ia32_sysenter_cs: ReadWrite = 0x174 {}

    /// IA32_SYSENTER_ESP
    pub mod ia32_sysenter_esp: ReadWrite = 0x175 {}

    /// IA32_SYSENTER_EIP
    pub mod ia32_sysenter_eip: ReadWrite = 0x176 {}

    /// IA32_DEBUGCTL
    pub mod ia32_debugctl: ReadWrite = 0x1d9 {
        LBR: lbr = flag(0),
        BTF: btf = flag(1),
        BLD: bld = flag(2),
        TR: tr = flag(6),
        BTS: bts = flag(7),
        BTINT: btint = flag(8),
        BTS_OFF_OS: bts_off_os = flag(9),
        BTS_OFF_USR: bts_off_usr = flag(10),
        FREEZE_LBRS_ON_PMI: freeze_lbrs_on_pmi = flag(11),
        FREEZE_PERFMON_ON_PMI: freeze_perfmon_on_pmi = flag(12),
        ENABLE_UNCORE_PMI: enable_uncore_pmi = flag(13),
        FREEZE_WHILE_SMM: freeze_while_smm = flag(14),
        RTM_DEBUG: rtm_debug = flag(15),
    }

    /// IA32_PAT
    ///
    /// See: 13.12.2 IA32_PAT MSR
    pub mod ia32_pat: ReadWrite = 0x277 {
        PA0: pa0 = range(0x7, 0),
        PA1: pa1 = range(0x700, 8),
        PA2: pa2 = range(0x7_0000, 16),
        PA3: pa3 = range(0x700_0000, 24),
        PA4: pa4 = range(0x7_0000_0000, 32),
        PA5: pa5 = range(0x700_0000_0000, 40),
        PA6: pa6 = range(0x7_0000_0000_0000, 48),
        PA7: pa7 = range(0x700_0000_0000_0000, 56),
    }

    /// IA32_MTRR_DEF_TYPE
    pub mod ia32_mtrr_def_type: ReadWrite = 0x2ff {
        DEFAULT_MEMORY_TYPE: default_memory_type = range(0xff, 0),
        FIXED_RANGE_MTRR_ENABLE: fixed_range_mtrr_enable = flag(10),
        MTRR_ENABLE: mtrr_enable = flag(11),
    }

    /// IA32_PERF_GLOBAL_CTRL
    pub mod ia32_perf_global_ctrl: ReadWrite = 0x38f {
        EN_PMC0: en_pmc0 = flag(0),
        EN_PMC1: en_pmc1 = flag(1),
        EN_PMC2: en_pmc2 = flag(2),
        EN_PMC3: en_pmc3 = flag(3),
        EN_FIXED_CTR0: en_fixed_ctr0 = flag(32),
        EN_FIXED_CTR1: en_fixed_ctr1 = flag(33),
        EN_FIXED_CTR2: en_fixed_ctr2 = flag(34),
    }

    /// IA32_RTIT_CTL
    pub mod ia32_rtit_ctl: ReadWrite = 0x570 {
        TRACE_EN: trace_en = flag(0),
        CYC_EN: cyc_en = flag(1),
        OS: os = flag(2),
        USER: user = flag(3),
        PWR_EVT_EN: pwr_evt_en = flag(4),
        FUP_ON_PTW: fup_on_ptw = flag(5),
        FABRIC_EN: fabric_en = flag(6),
        CR3_FILTER: cr3_filter = flag(7),
        TO_PA: to_pa = flag(8),
        MTC_EN: mtc_en = flag(9),
        TSC_EN: tsc_en = flag(10),
        DIS_RETC: dis_retc = flag(11),
        PTW_EN: ptw_en = flag(12),
        BRANCH_EN: branch_en = flag(13),
        MTC_FREQ: mtc_freq = range(0x3_c000, 14),
        CYC_THRESH: cyc_thresh = range(0x78_0000, 19),
        PSB_FREQ: psb_freq = range(0xf00_0000, 24),
        ADDR0_CFG: addr0_cfg = range(0xf_0000_0000, 32),
        ADDR1_CFG: addr1_cfg = range(0xf0_0000_0000, 36),
        ADDR2_CFG: addr2_cfg = range(0xf00_0000_0000, 40),
        ADDR3_CFG: addr3_cfg = range(0xf000_0000_0000, 44),
    }

    /// IA32_S_CET
    pub mod ia32_s_cet: ReadWrite = 0x6a2 {
        SH_STK_EN: sh_stk_en = flag(0),
        WR_SHSTK_EN: wr_shstk_en = flag(1),
        ENDBR_EN: endbr_en = flag(2),
        LEG_IW_EN: leg_iw_en = flag(3),
        NO_TRACK_EN: no_track_en = flag(4),
        SUPPRESS_DIS: suppress_dis = flag(5),
        SUPPRESS: suppress = flag(10),
        TRACKER: tracker = flag(11),
        EB_LEG_BITMAP_BASE: eb_leg_bitmap_base = range(0xffff_ffff_ffff_f000, 12),
    }

    /// IA32_PL0_SSP
    pub mod ia32_pl0_ssp: ReadWrite = 0x6a4 {}

    /// IA32_INTERRUPT_SSP_TABLE_ADDR
    pub mod ia32_interrupt_ssp_table_addr: ReadWrite = 0x6a8 {}

    /// IA32_PKRS
    pub mod ia32_pkrs: ReadWrite = 0x6e1 {}

    /// IA32_BNDCFGS
    pub mod ia32_bndcfgs: ReadWrite = 0xd90 {
        EN: en = flag(0),
        BNDPRESERVE: bndpreserve = flag(1),
        BASE: base = range(0xffff_ffff_ffff_f000, 12),
    }

    /// IA32_XSS
    pub mod ia32_xss: ReadWrite = 0xda0 {
        PT: pt = flag(8),
        PASID: pasid = flag(10),
        CET_U: cet_u = flag(11),
        CET_S: cet_s = flag(12),
        HDC: hdc = flag(13),
        UINTR: uintr = flag(14),
        LBR: lbr = flag(15),
        HWP: hwp = flag(16),
    }

    /// IA32_LBR_CTL
    pub mod ia32_lbr_ctl: ReadWrite = 0x14ce {
        LBR_EN: lbr_en = flag(0),
        OS: os = flag(1),
        USR: usr = flag(2),
        CALL_STACK: call_stack = flag(3),
        COND: cond = flag(16),
        NEAR_REL_JMP: near_rel_jmp = flag(17),
        NEAR_IND_JMP: near_ind_jmp = flag(18),
        NEAR_REL_CALL: near_rel_call = flag(19),
        NEAR_IND_CALL: near_ind_call = flag(20),
        NEAR_RET: near_ret = flag(21),
        OTHER_BRANCH: other_branch = flag(22),
    }

    /// IA32_EFER
    pub mod ia32_efer: ReadWrite = 0xc000_0080 {
        SCE: sce = flag(0),
        LME: lme = flag(8),
        LMA: lma = flag(10),
        NXE: nxe = flag(11),
    }

    /// IA32_STAR
    pub mod ia32_star: ReadWrite = 0xc000_0081 {}

    /// IA32_LSTAR
    pub mod ia32_lstar: ReadWrite = 0xc000_0082 {}

    /// IA32_CSTAR
    pub mod ia32_cstar: ReadWrite = 0xc000_0083 {}

    /// IA32_FMASK
    pub mod ia32_fmask: ReadWrite = 0xc000_0084 {}

    /// IA32_FS_BASE
    pub mod ia32_fs_base: ReadWrite = 0xc000_0100 {}

    /// IA32_GS_BASE
    pub mod ia32_gs_base: ReadWrite = 0xc000_0101 {}

    /// IA32_KERNEL_GS_BASE
    pub mod ia32_kernel_gs_base: ReadWrite = 0xc000_0102 {}

    /// IA32_TSC_AUX
    pub mod ia32_tsc_aux: ReadWrite = 0xc000_0103 {}
}

/// The memory types encoded in IA32_PAT, the MTRRs, IA32_VMX_BASIC and the
/// EPT pointer.
///
/// See: Table 13-8. Memory Types That Can Be Encoded With PAT
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum MemoryType {
    /// UC
    Uncacheable = 0,
    /// WC
    WriteCombining = 1,
    /// WT
    WriteThrough = 4,
    /// WP
    WriteProtected = 5,
    /// WB
    WriteBack = 6,
    /// UC-. Valid in IA32_PAT only.
    UncacheableMinus = 7,
}

impl MemoryType {
    /// Decodes a memory type, or returns `None` for a reserved encoding.
    #[must_use]
    pub fn from_raw(value: u64) -> Option<Self> {
        <Self as FromPrimitive>::from_u64(value)
    }
}

/// Decodes the memory type of the PAT entry `index` from an IA32_PAT value.
#[must_use]
pub fn pat_entry(pat: u64, index: usize) -> Option<MemoryType> {
    let field = ia32_pat::FIELDS.get(index)?;
    MemoryType::from_raw(field.get(pat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCpu;

    #[test]
    fn addresses() {
        assert_eq!(ia32_feature_control::ADDR, 0x3a);
        assert_eq!(ia32_efer::ADDR, 0xc000_0080);
        assert_eq!(ia32_efer::MSR.address(), 0xc000_0080);
        assert_eq!(ia32_efer::MSR.name(), "ia32_efer");
        assert_eq!(ia32_debugctl::ADDR, 0x1d9);
        assert_eq!(ia32_pat::ADDR, 0x277);
    }

    #[test]
    fn efer_fields() {
        let cpu = MockCpu::new().with_msr(0xc000_0080, 0xd01);
        assert!(ia32_efer::SCE.is_enabled(&cpu));
        assert!(ia32_efer::LME.is_enabled(&cpu));
        assert!(ia32_efer::LMA.is_enabled(&cpu));
        assert!(ia32_efer::NXE.is_enabled(&cpu));
        assert_eq!(ia32_efer::FIELDS.len(), 4);
    }

    #[test]
    fn default_pat() {
        // The power-up value of IA32_PAT.
        let pat = 0x0007_0406_0007_0406;
        assert_eq!(pat_entry(pat, 0), Some(MemoryType::WriteBack));
        assert_eq!(pat_entry(pat, 1), Some(MemoryType::WriteThrough));
        assert_eq!(pat_entry(pat, 2), Some(MemoryType::UncacheableMinus));
        assert_eq!(pat_entry(pat, 3), Some(MemoryType::Uncacheable));
        assert_eq!(pat_entry(pat, 8), None);
        assert_eq!(pat_entry(0x2, 0), None);
    }
}
