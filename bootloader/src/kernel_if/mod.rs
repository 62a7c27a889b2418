//! Kernel Interface - image validation, placement and handoff

pub mod elf64;
pub mod elf_validator;
pub mod segment_placer;
pub mod kernel_entry;
pub mod kernel_handoff;
