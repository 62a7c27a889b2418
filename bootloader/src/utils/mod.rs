//! Utility library - firmware service traits and memory helpers

pub mod boot_traits;
pub mod mem_util;
