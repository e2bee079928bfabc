//! The guest-state fields.
//!
//! See: 25.4 GUEST-STATE AREA

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::vmcs_fields;
use crate::{
    capability::Exists,
    msr::vmx::{
        ia32_vmx_entry_ctls as entry, ia32_vmx_exit_ctls as exit,
        ia32_vmx_pinbased_ctls as pin, ia32_vmx_procbased_ctls as proc,
        ia32_vmx_procbased_ctls2 as proc2,
    },
};

/// The PDPTEs are consulted with EPT in PAE paging mode.
const PDPTE: &[Exists] = &[
    Exists::Allowed1(proc::ACTIVATE_SECONDARY_CONTROLS),
    Exists::Allowed1(proc2::ENABLE_EPT),
];
const IA32_PAT: &[Exists] = &[
    Exists::Allowed1(entry::LOAD_IA32_PAT),
    Exists::Allowed1(exit::SAVE_IA32_PAT),
];
const IA32_EFER: &[Exists] = &[
    Exists::Allowed1(entry::LOAD_IA32_EFER),
    Exists::Allowed1(exit::SAVE_IA32_EFER),
];
const IA32_PERF_GLOBAL_CTRL: &[Exists] = &[
    Exists::Allowed1(entry::LOAD_IA32_PERF_GLOBAL_CTRL),
    Exists::Allowed1(exit::SAVE_IA32_PERF_GLOBAL_CTRL),
];
const IA32_BNDCFGS: &[Exists] = &[
    Exists::Allowed1(entry::LOAD_IA32_BNDCFGS),
    Exists::Allowed1(exit::CLEAR_IA32_BNDCFGS),
];
const IA32_RTIT_CTL: &[Exists] = &[
    Exists::Allowed1(entry::LOAD_IA32_RTIT_CTL),
    Exists::Allowed1(exit::CLEAR_IA32_RTIT_CTL),
];
const IA32_LBR_CTL: &[Exists] = &[
    Exists::Allowed1(entry::LOAD_IA32_LBR_CTL),
    Exists::Allowed1(exit::CLEAR_IA32_LBR_CTL),
];
const UINV: &[Exists] = &[
    Exists::Allowed1(entry::LOAD_UINV),
    Exists::Allowed1(exit::CLEAR_UINV),
];

vmcs_fields! {
    const ALL: "guest_";

    // 16-bit

    /// Guest ES selector
    pub mod es_selector: ReadWrite = 0x0800 {}

    /// Guest CS selector
    pub mod cs_selector: ReadWrite = 0x0802 {}

    /// Guest SS selector
    pub mod ss_selector: ReadWrite = 0x0804 {}

    /// Guest DS selector
    pub mod ds_selector: ReadWrite = 0x0806 {}

    /// Guest FS selector
    pub mod fs_selector: ReadWrite = 0x0808 {}

    /// Guest GS selector
    pub mod gs_selector: ReadWrite = 0x080a {}

    /// Guest LDTR selector
    pub mod ldtr_selector: ReadWrite = 0x080c {}

    /// Guest TR selector
    pub mod tr_selector: ReadWrite = 0x080e {}

    /// Guest interrupt status
    pub mod interrupt_status: ReadWrite = 0x0810
        [exists: Exists::Allowed1(super::proc2::VIRTUAL_INTERRUPT_DELIVERY)] {
        RVI: rvi = range(0xff, 0),
        SVI: svi = range(0xff00, 8),
    }

    /// PML index
    pub mod pml_index: ReadWrite = 0x0812
        [exists: Exists::Allowed1(super::proc2::ENABLE_PML)] {}

    /// Guest UINV
    pub mod uinv: ReadWrite = 0x0814 [exists: Exists::Any(super::UINV)] {}

    // 64-bit

    /// VMCS link pointer
    pub mod vmcs_link_pointer: ReadWrite = 0x2800 {}

    /// Guest IA32_DEBUGCTL
    pub mod ia32_debugctl: ReadWrite = 0x2802 {}

    /// Guest IA32_PAT
    pub mod ia32_pat: ReadWrite = 0x2804 [exists: Exists::Any(super::IA32_PAT)] {
        PA0: pa0 = range(0x7, 0),
        PA1: pa1 = range(0x700, 8),
        PA2: pa2 = range(0x7_0000, 16),
        PA3: pa3 = range(0x700_0000, 24),
        PA4: pa4 = range(0x7_0000_0000, 32),
        PA5: pa5 = range(0x700_0000_0000, 40),
        PA6: pa6 = range(0x7_0000_0000_0000, 48),
        PA7: pa7 = range(0x700_0000_0000_0000, 56),
    }

    /// Guest IA32_EFER
    pub mod ia32_efer: ReadWrite = 0x2806 [exists: Exists::Any(super::IA32_EFER)] {
        SCE: sce = flag(0),
        LME: lme = flag(8),
        LMA: lma = flag(10),
        NXE: nxe = flag(11),
    }

    /// Guest IA32_PERF_GLOBAL_CTRL
    pub mod ia32_perf_global_ctrl: ReadWrite = 0x2808
        [exists: Exists::Any(super::IA32_PERF_GLOBAL_CTRL)] {}

    /// Guest PDPTE0
    pub mod pdpte0: ReadWrite = 0x280a [exists: Exists::All(super::PDPTE)] {}

    /// Guest PDPTE1
    pub mod pdpte1: ReadWrite = 0x280c [exists: Exists::All(super::PDPTE)] {}

    /// Guest PDPTE2
    pub mod pdpte2: ReadWrite = 0x280e [exists: Exists::All(super::PDPTE)] {}

    /// Guest PDPTE3
    pub mod pdpte3: ReadWrite = 0x2810 [exists: Exists::All(super::PDPTE)] {}

    /// Guest IA32_BNDCFGS
    pub mod ia32_bndcfgs: ReadWrite = 0x2812 [exists: Exists::Any(super::IA32_BNDCFGS)] {}

    /// Guest IA32_RTIT_CTL
    pub mod ia32_rtit_ctl: ReadWrite = 0x2814 [exists: Exists::Any(super::IA32_RTIT_CTL)] {}

    /// Guest IA32_LBR_CTL
    pub mod ia32_lbr_ctl: ReadWrite = 0x2816 [exists: Exists::Any(super::IA32_LBR_CTL)] {}

    /// Guest IA32_PKRS
    pub mod ia32_pkrs: ReadWrite = 0x2818
        [exists: Exists::Allowed1(super::entry::LOAD_PKRS)] {}

    // 32-bit

    /// Guest ES limit
    pub mod es_limit: ReadWrite = 0x4800 {}

    /// Guest CS limit
    pub mod cs_limit: ReadWrite = 0x4802 {}

    /// Guest SS limit
    pub mod ss_limit: ReadWrite = 0x4804 {}

    /// Guest DS limit
    pub mod ds_limit: ReadWrite = 0x4806 {}

    /// Guest FS limit
    pub mod fs_limit: ReadWrite = 0x4808 {}

    /// Guest GS limit
    pub mod gs_limit: ReadWrite = 0x480a {}

    /// Guest LDTR limit
    pub mod ldtr_limit: ReadWrite = 0x480c {}

    /// Guest TR limit
    pub mod tr_limit: ReadWrite = 0x480e {}

    /// Guest GDTR limit
    pub mod gdtr_limit: ReadWrite = 0x4810 {}

    /// Guest IDTR limit
    pub mod idtr_limit: ReadWrite = 0x4812 {}

    /// Guest ES access rights
    ///
    /// See: 25.4.1 Guest Register State
    pub mod es_access_rights: ReadWrite = 0x4814 {
        SEGMENT_TYPE: segment_type = range(0xf, 0),
        DESCRIPTOR_TYPE: descriptor_type = flag(4),
        DPL: dpl = range(0x60, 5),
        PRESENT: present = flag(7),
        AVL: avl = flag(12),
        LONG_MODE: long_mode = flag(13),
        DEFAULT_BIG: default_big = flag(14),
        GRANULARITY: granularity = flag(15),
        UNUSABLE: unusable = flag(16),
    }

    /// Guest CS access rights
    pub mod cs_access_rights: ReadWrite = 0x4816 {
        SEGMENT_TYPE: segment_type = range(0xf, 0),
        DESCRIPTOR_TYPE: descriptor_type = flag(4),
        DPL: dpl = range(0x60, 5),
        PRESENT: present = flag(7),
        AVL: avl = flag(12),
        LONG_MODE: long_mode = flag(13),
        DEFAULT_BIG: default_big = flag(14),
        GRANULARITY: granularity = flag(15),
        UNUSABLE: unusable = flag(16),
    }

    /// Guest SS access rights
    pub mod ss_access_rights: ReadWrite = 0x4818 {
        SEGMENT_TYPE: segment_type = range(0xf, 0),
        DESCRIPTOR_TYPE: descriptor_type = flag(4),
        DPL: dpl = range(0x60, 5),
        PRESENT: present = flag(7),
        AVL: avl = flag(12),
        LONG_MODE: long_mode = flag(13),
        DEFAULT_BIG: default_big = flag(14),
        GRANULARITY: granularity = flag(15),
        UNUSABLE: unusable = flag(16),
    }

    /// Guest DS access rights
    pub mod ds_access_rights: ReadWrite = 0x481a {
        SEGMENT_TYPE: segment_type = range(0xf, 0),
        DESCRIPTOR_TYPE: descriptor_type = flag(4),
        DPL: dpl = range(0x60, 5),
        PRESENT: present = flag(7),
        AVL: avl = flag(12),
        LONG_MODE: long_mode = flag(13),
        DEFAULT_BIG: default_big = flag(14),
        GRANULARITY: granularity = flag(15),
        UNUSABLE: unusable = flag(16),
    }

    /// Guest FS access rights
    pub mod fs_access_rights: ReadWrite = 0x481c {
        SEGMENT_TYPE: segment_type = range(0xf, 0),
        DESCRIPTOR_TYPE: descriptor_type = flag(4),
        DPL: dpl = range(0x60, 5),
        PRESENT: present = flag(7),
        AVL: avl = flag(12),
        LONG_MODE: long_mode = flag(13),
        DEFAULT_BIG: default_big = flag(14),
        GRANULARITY: granularity = flag(15),
        UNUSABLE: unusable = flag(16),
    }

    /// Guest GS access rights
    pub mod gs_access_rights: ReadWrite = 0x481e {
        SEGMENT_TYPE: segment_type = range(0xf, 0),
        DESCRIPTOR_TYPE: descriptor_type = flag(4),
        DPL: dpl = range(0x60, 5),
        PRESENT: present = flag(7),
        AVL: avl = flag(12),
        LONG_MODE: long_mode = flag(13),
        DEFAULT_BIG: default_big = flag(14),
        GRANULARITY: granularity = flag(15),
        UNUSABLE: unusable = flag(16),
    }

    /// Guest LDTR access rights
    pub mod ldtr_access_rights: ReadWrite = 0x4820 {
        SEGMENT_TYPE: segment_type = range(0xf, 0),
        DESCRIPTOR_TYPE: descriptor_type = flag(4),
        DPL: dpl = range(0x60, 5),
        PRESENT: present = flag(7),
        AVL: avl = flag(12),
        LONG_MODE: long_mode = flag(13),
        DEFAULT_BIG: default_big = flag(14),
        GRANULARITY: granularity = flag(15),
        UNUSABLE: unusable = flag(16),
    }

    /// Guest TR access rights
    pub mod tr_access_rights: ReadWrite = 0x4822 {
        SEGMENT_TYPE: segment_type = range(0xf, 0),
        DESCRIPTOR_TYPE: descriptor_type = flag(4),
        DPL: dpl = range(0x60, 5),
        PRESENT: present = flag(7),
        AVL: avl = flag(12),
        LONG_MODE: long_mode = flag(13),
        DEFAULT_BIG: default_big = flag(14),
        GRANULARITY: granularity = flag(15),
        UNUSABLE: unusable = flag(16),
    }

    /// Guest interruptibility state
    ///
    /// See: 25.4.2 Guest Non-Register State
    pub mod interruptibility_state: ReadWrite = 0x4824 {
        BLOCKING_BY_STI: blocking_by_sti = flag(0),
        BLOCKING_BY_MOV_SS: blocking_by_mov_ss = flag(1),
        BLOCKING_BY_SMI: blocking_by_smi = flag(2),
        BLOCKING_BY_NMI: blocking_by_nmi = flag(3),
        ENCLAVE_INTERRUPTION: enclave_interruption = flag(4),
    }

    /// Guest activity state
    pub mod activity_state: ReadWrite = 0x4826 {}

    /// Guest SMBASE
    pub mod smbase: ReadWrite = 0x4828 {}

    /// Guest IA32_SYSENTER_CS
    pub mod ia32_sysenter_cs: ReadWrite = 0x482a {}

    /// VMX-preemption timer value
    pub mod vmx_preemption_timer_value: ReadWrite = 0x482e
        [exists: Exists::Allowed1(super::pin::ACTIVATE_VMX_PREEMPTION_TIMER)] {}

    // Natural-width

    /// Guest CR0
    pub mod cr0: ReadWrite = 0x6800 {
        PE: pe = flag(0),
        MP: mp = flag(1),
        EM: em = flag(2),
        TS: ts = flag(3),
        ET: et = flag(4),
        NE: ne = flag(5),
        WP: wp = flag(16),
        AM: am = flag(18),
        NW: nw = flag(29),
        CD: cd = flag(30),
        PG: pg = flag(31),
    }

    /// Guest CR3
    pub mod cr3: ReadWrite = 0x6802 {}

    /// Guest CR4
    pub mod cr4: ReadWrite = 0x6804 {
        VME: vme = flag(0),
        PVI: pvi = flag(1),
        TSD: tsd = flag(2),
        DE: de = flag(3),
        PSE: pse = flag(4),
        PAE: pae = flag(5),
        MCE: mce = flag(6),
        PGE: pge = flag(7),
        PCE: pce = flag(8),
        OSFXSR: osfxsr = flag(9),
        OSXMMEXCPT: osxmmexcpt = flag(10),
        UMIP: umip = flag(11),
        LA57: la57 = flag(12),
        VMXE: vmxe = flag(13),
        SMXE: smxe = flag(14),
        FSGSBASE: fsgsbase = flag(16),
        PCIDE: pcide = flag(17),
        OSXSAVE: osxsave = flag(18),
        KL: kl = flag(19),
        SMEP: smep = flag(20),
        SMAP: smap = flag(21),
        PKE: pke = flag(22),
        CET: cet = flag(23),
        PKS: pks = flag(24),
    }

    /// Guest ES base
    pub mod es_base: ReadWrite = 0x6806 {}

    /// Guest CS base
    pub mod cs_base: ReadWrite = 0x6808 {}

    /// Guest SS base
    pub mod ss_base: ReadWrite = 0x680a {}

    /// Guest DS base
    pub mod ds_base: ReadWrite = 0x680c {}

    /// Guest FS base
    pub mod fs_base: ReadWrite = 0x680e {}

    /// Guest GS base
    pub mod gs_base: ReadWrite = 0x6810 {}

    /// Guest LDTR base
    pub mod ldtr_base: ReadWrite = 0x6812 {}

    /// Guest TR base
    pub mod tr_base: ReadWrite = 0x6814 {}

    /// Guest GDTR base
    pub mod gdtr_base: ReadWrite = 0x6816 {}

    /// Guest IDTR base
    pub mod idtr_base: ReadWrite = 0x6818 {}

    /// Guest DR7
    pub mod dr7: ReadWrite = 0x681a {}

    /// Guest RSP
    pub mod rsp: ReadWrite = 0x681c {}

    /// Guest RIP
    pub mod rip: ReadWrite = 0x681e {}

    /// Guest RFLAGS
    pub mod rflags: ReadWrite = 0x6820 {
        CF: cf = flag(0),
        PF: pf = flag(2),
        AF: af = flag(4),
        ZF: zf = flag(6),
        SF: sf = flag(7),
        TF: tf = flag(8),
        IF: interrupt_enable = flag(9),
        DF: df = flag(10),
        OF: of = flag(11),
        IOPL: iopl = range(0x3000, 12),
        NT: nt = flag(14),
        RF: rf = flag(16),
        VM: vm = flag(17),
        AC: ac = flag(18),
        VIF: vif = flag(19),
        VIP: vip = flag(20),
        ID: id = flag(21),
    }

    /// Guest pending debug exceptions
    pub mod pending_debug_exceptions: ReadWrite = 0x6822 {}

    /// Guest IA32_SYSENTER_ESP
    pub mod ia32_sysenter_esp: ReadWrite = 0x6824 {}

    /// Guest IA32_SYSENTER_EIP
    pub mod ia32_sysenter_eip: ReadWrite = 0x6826 {}

    /// Guest IA32_S_CET
    pub mod ia32_s_cet: ReadWrite = 0x6828
        [exists: Exists::Allowed1(super::entry::LOAD_CET_STATE)] {}

    /// Guest SSP
    pub mod ssp: ReadWrite = 0x682a
        [exists: Exists::Allowed1(super::entry::LOAD_CET_STATE)] {}

    /// Guest IA32_INTERRUPT_SSP_TABLE_ADDR
    pub mod ia32_interrupt_ssp_table_addr: ReadWrite = 0x682c
        [exists: Exists::Allowed1(super::entry::LOAD_CET_STATE)] {}
}

/// The activity state of a logical processor.
///
/// See: 25.4.2 Guest Non-Register State
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, derive_more::Display)]
pub enum GuestActivityState {
    /// Active
    #[display("active")]
    Active = 0,
    /// HLT
    #[display("HLT")]
    Hlt = 1,
    /// Shutdown
    #[display("shutdown")]
    Shutdown = 2,
    /// Wait-for-SIPI
    #[display("wait-for-SIPI")]
    WaitForSipi = 3,
}

impl GuestActivityState {
    /// Decodes the value of the activity-state field.
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        <Self as FromPrimitive>::from_u64(raw)
    }
}
