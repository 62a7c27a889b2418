//! Bootloader error handling
//!
//! This module defines the error types used throughout the loader
//! for consistent error reporting and handling.

use core::fmt;

/// Bootloader error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// A file could not be opened at the requested path
    FileNotFound,
    /// The firmware could not deliver the exact number of bytes requested
    ReadFailed,

    /// Kernel image errors
    FormatInvalid(&'static str),
    NoLoadableSegments,
    EntryOutsideImage,

    /// Physical memory unavailable at a mandated address, or pool exhausted
    AllocationFailure,

    /// Optional discovery failures
    ProtocolNotFound,
    FontNotFound,
    FontFormatInvalid,

    /// Boot stage machine was driven out of order
    InvalidState,

    /// Any other firmware status
    UefiError(uefi::Status),
}

impl BootError {
    /// Convert to an error code suitable for passing to firmware
    pub fn as_error_code(&self) -> u32 {
        match self {
            BootError::FileNotFound => 0x7000,
            BootError::ReadFailed => 0x7001,
            BootError::FormatInvalid(_) => 0x9002,
            BootError::NoLoadableSegments => 0x9003,
            BootError::EntryOutsideImage => 0x9004,
            BootError::AllocationFailure => 0x2000,
            BootError::ProtocolNotFound => 0x3000,
            BootError::FontNotFound => 0x6000,
            BootError::FontFormatInvalid => 0x6001,
            BootError::InvalidState => 0xE001,
            BootError::UefiError(status) => status.0 as u32,
        }
    }

    /// Get a human-readable description of the error
    pub fn description(&self) -> &'static str {
        match self {
            BootError::FileNotFound => "File not found",
            BootError::ReadFailed => "Failed to read from file",
            BootError::FormatInvalid(reason) => reason,
            BootError::NoLoadableSegments => "Kernel image has no loadable segments",
            BootError::EntryOutsideImage => "Entry point is not inside an executable segment",
            BootError::AllocationFailure => "Failed to allocate memory",
            BootError::ProtocolNotFound => "Graphics output protocol not found",
            BootError::FontNotFound => "Font not found",
            BootError::FontFormatInvalid => "Invalid font format",
            BootError::InvalidState => "Invalid bootloader state",
            BootError::UefiError(_) => "UEFI error",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Graphics and fonts are optional for the kernel; everything touching
    /// the kernel image itself aborts the boot.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BootError::ProtocolNotFound | BootError::FontNotFound | BootError::FontFormatInvalid
        )
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BootError: {} (code: {:#x})", self.description(), self.as_error_code())
    }
}

/// Result type used throughout the bootloader
pub type Result<T = ()> = core::result::Result<T, BootError>;

/// Convert UEFI status to bootloader error
impl From<uefi::Status> for BootError {
    fn from(status: uefi::Status) -> Self {
        match status {
            uefi::Status::NOT_FOUND => BootError::FileNotFound,
            uefi::Status::OUT_OF_RESOURCES => BootError::AllocationFailure,
            uefi::Status::UNSUPPORTED => BootError::ProtocolNotFound,
            _ => BootError::UefiError(status),
        }
    }
}

impl<Data: fmt::Debug> From<uefi::Error<Data>> for BootError {
    fn from(error: uefi::Error<Data>) -> Self {
        error.status().into()
    }
}
