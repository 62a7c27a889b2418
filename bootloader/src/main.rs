//! Aderina Bootloader - UEFI application entry point

#![cfg_attr(target_os = "uefi", no_std)]
#![cfg_attr(target_os = "uefi", no_main)]

#[cfg(target_os = "uefi")]
use aderina_bootloader::arch::Architecture;
#[cfg(target_os = "uefi")]
use aderina_bootloader::{BootConfig, HandoffCoordinator, VERSION, uefi::UefiFirmware};
#[cfg(target_os = "uefi")]
use uefi::prelude::*;

#[cfg(target_os = "uefi")]
#[entry]
fn main() -> Status {
    if uefi::helpers::init().is_err() {
        return Status::ABORTED;
    }

    let config = BootConfig::default();
    log::set_max_level(config.log_level);
    log::info!(
        "Aderina bootloader v{} ({})",
        VERSION,
        Architecture::current().name()
    );

    // SAFETY: running as a UEFI application with boot services active.
    let mut firmware = unsafe { UefiFirmware::new() };
    let mut coordinator = HandoffCoordinator::new(&mut firmware, config);

    // SAFETY: the coordinator only jumps into a validated, fully placed image.
    unsafe { coordinator.boot() }
}

/// Non-UEFI stub so host builds and tests still link
#[cfg(not(target_os = "uefi"))]
fn main() {
    eprintln!("The Aderina bootloader must be built for a UEFI target");
    std::process::exit(1);
}
