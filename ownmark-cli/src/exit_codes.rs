//! Exit codes following sysexits.h conventions.
//!
//! Scripts can tell a claim that did not verify (65) apart from a service
//! that could not be reached (69).

use ownmark_core::OwnmarkError;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments or identifiers).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Claim not verified, or anchor failed or already registered.
/// Maps to EX_DATAERR from sysexits.h.
pub const VERIFICATION_FAILED: i32 = 65;

/// Cannot open input file.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (extraction, registry, explorer).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const NETWORK_ERROR: i32 = 69;

/// I/O error.
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Typed errors in the chain win; the message is the fallback.
        let code = if message.contains("Failed to read file") {
            INPUT_ERROR
        } else if let Some(core) = err.chain().find_map(|e| e.downcast_ref::<OwnmarkError>()) {
            classify(core)
        } else if message.contains("Verification failed") || message.contains("Anchor failed") {
            VERIFICATION_FAILED
        } else if err.chain().any(|e| e.is::<std::io::Error>()) {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}

fn classify(err: &OwnmarkError) -> i32 {
    match err {
        OwnmarkError::InvalidInput(_) => USAGE_ERROR,
        OwnmarkError::AlreadyRegistered(_) => VERIFICATION_FAILED,
        OwnmarkError::Service(_) | OwnmarkError::Http(_) | OwnmarkError::Serialization(_) => {
            NETWORK_ERROR
        }
        OwnmarkError::Io(_) => IO_ERROR,
    }
}
