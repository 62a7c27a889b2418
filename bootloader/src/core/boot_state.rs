// Boot stage tracking for the handoff sequence

use core::fmt;

use crate::error::{BootError, Result};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootStage {
    Init = 0,
    Validated = 1,
    SegmentsLoaded = 2,
    ResourcesDiscovered = 3,
    Transferred = 4,
    Halted = 0xFFFF_FFFF,
}

impl BootStage {
    /// The only stage reachable from `self` on success
    pub fn successor(self) -> Option<BootStage> {
        match self {
            BootStage::Init => Some(BootStage::Validated),
            BootStage::Validated => Some(BootStage::SegmentsLoaded),
            BootStage::SegmentsLoaded => Some(BootStage::ResourcesDiscovered),
            BootStage::ResourcesDiscovered => Some(BootStage::Transferred),
            BootStage::Transferred | BootStage::Halted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BootStage::Transferred | BootStage::Halted)
    }

    pub fn name(self) -> &'static str {
        match self {
            BootStage::Init => "init",
            BootStage::Validated => "validated",
            BootStage::SegmentsLoaded => "segments loaded",
            BootStage::ResourcesDiscovered => "resources discovered",
            BootStage::Transferred => "transferred",
            BootStage::Halted => "halted",
        }
    }
}

impl fmt::Display for BootStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Forward-only stage machine; no retries, no rollback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootState {
    stage: BootStage,
}

impl BootState {
    pub fn new() -> Self {
        Self {
            stage: BootStage::Init,
        }
    }

    pub fn stage(&self) -> BootStage {
        self.stage
    }

    pub fn advance(&mut self, next: BootStage) -> Result {
        if self.stage.successor() != Some(next) {
            log::error!("Illegal boot stage transition: {} -> {}", self.stage, next);
            return Err(BootError::InvalidState);
        }

        log::trace!("Boot stage: {} -> {}", self.stage, next);
        self.stage = next;
        Ok(())
    }

    /// Enter the terminal halted stage after a fatal error
    pub fn halt(&mut self) -> Result {
        if self.stage.is_terminal() {
            return Err(BootError::InvalidState);
        }

        self.stage = BootStage::Halted;
        Ok(())
    }

    pub fn is_halted(&self) -> bool {
        self.stage == BootStage::Halted
    }
}

impl Default for BootState {
    fn default() -> Self {
        Self::new()
    }
}
