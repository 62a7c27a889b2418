//! Core - boot sequencing state

pub mod boot_state;
