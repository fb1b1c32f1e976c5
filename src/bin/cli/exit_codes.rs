//! Exit codes for the CLI tool.

use std::io;

use tarpatch::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Fatal error occurred
pub const FATAL_ERROR: i32 = 2;
/// Archive or entry content could not be processed
pub const BAD_ARCHIVE: i32 = 3;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Ctrl+C (128 + SIGINT)
pub const USER_INTERRUPT: i32 = 130;
/// Invalid command line arguments or rules
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    BadArchive,
    IoError,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::BadArchive => BAD_ARCHIVE,
            Self::IoError => IO_ERROR,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts a tarpatch error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Io(_) => ExitCode::IoError,
        // A missing or unreadable input is an I/O problem, anything else
        // on the read side is a damaged archive.
        Error::SourceRead { source, .. } => match source.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => ExitCode::IoError,
            _ => ExitCode::BadArchive,
        },
        Error::MalformedJson { .. } => ExitCode::BadArchive,
        Error::OutputWrite { .. } | Error::Finalize { .. } => ExitCode::IoError,
        Error::InvalidPattern { .. } | Error::InvalidConfig(_) => ExitCode::BadArgs,
        Error::EntryAlreadyWritten { .. } | Error::Handler { .. } => ExitCode::FatalError,
        _ => ExitCode::FatalError,
    }
}
