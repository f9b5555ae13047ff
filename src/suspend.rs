//! Suspended-account detection.
//!
//! cPanel keeps one status file per account under `/var/cpanel/users`; an
//! account is suspended iff its file contains the exact line `SUSPENDED=1`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::debug;

/// Per-run memoized view of account suspension state.
///
/// Suspension status is assumed stable for the duration of a scan, so each
/// account's file is read at most once. A file that is missing or unreadable
/// for any reason classifies the account as active: a permissions hiccup must
/// not shrink the set of scanned URLs.
pub struct SuspensionOracle {
    users_dir: PathBuf,
    cache: HashMap<String, bool>,
}

impl SuspensionOracle {
    /// Create an oracle reading status files from `users_dir`.
    pub fn new(users_dir: impl Into<PathBuf>) -> Self {
        Self {
            users_dir: users_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Whether `account` is administratively suspended.
    pub fn is_suspended(&mut self, account: &str) -> bool {
        if let Some(&suspended) = self.cache.get(account) {
            return suspended;
        }

        let suspended = self.read_status(account);
        debug!(account = %account, suspended, "Loaded account status");
        self.cache.insert(account.to_string(), suspended);
        suspended
    }

    fn read_status(&self, account: &str) -> bool {
        let path = self.users_dir.join(account);
        let file = match File::open(&path) {
            Ok(f) => f,
            // The account does not exist (or its file is unreadable)
            Err(_) => return false,
        };

        for line in BufReader::new(file).lines() {
            match line {
                Ok(line) if line == "SUSPENDED=1" => return true,
                Ok(_) => {}
                // Lines read so far still count
                Err(_) => break,
            }
        }

        false
    }
}
