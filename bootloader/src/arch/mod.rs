//! Architecture abstraction layer
//!
//! CPU primitives the loader needs once it has given up on booting.

/// Architecture types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86_64,
    AArch64,
    RiscV64,
    Other,
}

impl Architecture {
    /// Get the current architecture at compile time
    pub const fn current() -> Self {
        if cfg!(target_arch = "x86_64") {
            Architecture::X86_64
        } else if cfg!(target_arch = "aarch64") {
            Architecture::AArch64
        } else if cfg!(target_arch = "riscv64") {
            Architecture::RiscV64
        } else {
            Architecture::Other
        }
    }

    /// Get architecture name
    pub fn name(self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::AArch64 => "AArch64",
            Architecture::RiscV64 => "RISC-V 64",
            Architecture::Other => "unknown",
        }
    }
}

/// Park the CPU until the next event
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(target_arch = "x86_64")]
    x86_64::instructions::hlt();

    #[cfg(target_arch = "aarch64")]
    aarch64_cpu::asm::wfe();

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    core::hint::spin_loop();
}

/// Stop the boot for good
pub fn halt() -> ! {
    loop {
        wait_for_interrupt();
    }
}
