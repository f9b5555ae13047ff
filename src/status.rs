//! Exit status accumulation.
//!
//! The process exit code is a bitmask combinable by OR: independent outcome
//! categories are collected as flags during the run and folded into the
//! numeric code once, at exit.

/// All URLs looked up and safe.
pub const CODE_SAFE: u8 = 0;
/// At least one URL is not safe.
pub const CODE_UNSAFE: u8 = 1;
/// At least one URL lookup failed.
pub const CODE_FAILED: u8 = 2;
/// The input was invalid.
pub const CODE_INVALID: u8 = 4;

/// Outcome flags accumulated over a scan run. Flags only ever turn on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanFlags {
    /// At least one scanned URL matched a threat list.
    pub saw_unsafe: bool,

    /// At least one lookup returned an error.
    pub saw_lookup_failure: bool,

    /// The input stream failed mid-scan.
    pub saw_invalid_input: bool,
}

impl ScanFlags {
    /// Fold the flags into the process exit code.
    pub fn code(&self) -> u8 {
        let mut code = CODE_SAFE;
        if self.saw_unsafe {
            code |= CODE_UNSAFE;
        }
        if self.saw_lookup_failure {
            code |= CODE_FAILED;
        }
        if self.saw_invalid_input {
            code |= CODE_INVALID;
        }
        code
    }

    /// True when nothing went wrong and nothing was flagged.
    pub fn is_clean(&self) -> bool {
        self.code() == CODE_SAFE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_run_is_zero() {
        let flags = ScanFlags::default();
        assert_eq!(flags.code(), 0);
        assert!(flags.is_clean());
    }

    #[test]
    fn test_single_bits() {
        let flags = ScanFlags {
            saw_unsafe: true,
            ..Default::default()
        };
        assert_eq!(flags.code(), 1);

        let flags = ScanFlags {
            saw_lookup_failure: true,
            ..Default::default()
        };
        assert_eq!(flags.code(), 2);

        let flags = ScanFlags {
            saw_invalid_input: true,
            ..Default::default()
        };
        assert_eq!(flags.code(), 4);
    }

    #[test]
    fn test_bits_combine_by_or() {
        let flags = ScanFlags {
            saw_unsafe: true,
            saw_lookup_failure: true,
            saw_invalid_input: false,
        };
        assert_eq!(flags.code(), 3);

        let flags = ScanFlags {
            saw_unsafe: true,
            saw_lookup_failure: true,
            saw_invalid_input: true,
        };
        assert_eq!(flags.code(), 7);
        assert!(!flags.is_clean());
    }
}
