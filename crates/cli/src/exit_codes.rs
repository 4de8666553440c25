//! CLI Exit Code Registry
//!
//! Single source of truth for the exit codes of `postwatch`. Scripts rely on
//! them, so a code never changes meaning once released.
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | Success                                         |
//! | 2    | Usage error (bad arguments)                     |
//! | 3    | Input payload cannot be read or is not JSON     |
//! | 4    | Config file cannot be read, parsed or validated |
//! | 5    | Rendering an artifact failed                    |
//! | 6    | Writing an artifact or stdout failed            |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse errors.
pub const EXIT_USAGE: u8 = 2;

/// A payload file is missing, unreadable, or not valid JSON.
pub const EXIT_INPUT: u8 = 3;

/// The report config is unreadable, malformed, or fails validation.
pub const EXIT_CONFIG: u8 = 4;

/// Workbook or document rendering failed.
pub const EXIT_RENDER: u8 = 5;

/// An artifact (or stdout) could not be written.
pub const EXIT_WRITE: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let mut codes = vec![
            EXIT_SUCCESS,
            EXIT_USAGE,
            EXIT_INPUT,
            EXIT_CONFIG,
            EXIT_RENDER,
            EXIT_WRITE,
        ];
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 6);
    }
}
