//! The scan driver.

use crate::domains::parse_line;
use crate::lookup::{LookupError, ThreatMatch, UrlLookup};
use crate::report::write_threat_block;
use crate::status::ScanFlags;
use crate::suspend::SuspensionOracle;
use std::io::{self, BufRead, Write};
use tracing::{debug, info};

/// Per-URL classification of a lookup result.
#[derive(Debug)]
pub enum ThreatVerdict {
    /// No threat list matched.
    Safe,
    /// At least one list matched; carries the first match.
    Unsafe(ThreatMatch),
    /// The lookup itself failed.
    LookupFailed(LookupError),
}

impl ThreatVerdict {
    /// Classify a single-URL lookup result.
    pub fn classify(result: Result<Vec<Vec<ThreatMatch>>, LookupError>) -> Self {
        match result {
            Err(e) => ThreatVerdict::LookupFailed(e),
            Ok(per_url) => {
                let mut matches = per_url.into_iter().next().unwrap_or_default();
                if matches.is_empty() {
                    ThreatVerdict::Safe
                } else {
                    ThreatVerdict::Unsafe(matches.remove(0))
                }
            }
        }
    }
}

/// Folds the userdomains stream into verdict output and exit flags.
///
/// Writers are injected so tests can assert the byte-exact stdout/stderr
/// contract; write failures are the caller's problem and abort the run.
pub struct Scanner<'a> {
    lookup: &'a dyn UrlLookup,
    oracle: SuspensionOracle,
    ignore_suspended: bool,
}

impl<'a> Scanner<'a> {
    /// Create a scanner over the given lookup backend.
    pub fn new(lookup: &'a dyn UrlLookup, oracle: SuspensionOracle, ignore_suspended: bool) -> Self {
        Self {
            lookup,
            oracle,
            ignore_suspended,
        }
    }

    /// Scan every line of `input`, one lookup at a time, in input order.
    pub async fn run<R, W, E>(
        &mut self,
        input: R,
        stdout: &mut W,
        stderr: &mut E,
    ) -> io::Result<ScanFlags>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let mut flags = ScanFlags::default();
        let mut scanned = 0usize;
        let mut skipped = 0usize;
        let mut unsafe_found = 0usize;
        let mut lookup_failures = 0usize;

        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    writeln!(stderr, "Unable to read input: {}", e)?;
                    flags.saw_invalid_input = true;
                    break;
                }
            };

            let record = match parse_line(&line) {
                Some(record) => record,
                None => {
                    skipped += 1;
                    continue;
                }
            };

            // Wildcard and ownerless entries are not scannable domains
            if record.account.is_empty() || record.account == "*" {
                skipped += 1;
                continue;
            }

            if self.ignore_suspended && self.oracle.is_suspended(&record.account) {
                debug!(url = %record.url, account = %record.account, "Skipping suspended account");
                skipped += 1;
                continue;
            }

            scanned += 1;
            let result = self
                .lookup
                .lookup_urls(std::slice::from_ref(&record.url))
                .await;

            match ThreatVerdict::classify(result) {
                ThreatVerdict::Safe => {}
                ThreatVerdict::Unsafe(threat) => {
                    write_threat_block(stdout, &threat.threat_type, &record.account, &record.url)?;
                    flags.saw_unsafe = true;
                    unsafe_found += 1;
                }
                ThreatVerdict::LookupFailed(e) => {
                    writeln!(stdout, "Unknown URL: {}", record.url)?;
                    writeln!(stderr, "Lookup error: {}", e)?;
                    flags.saw_lookup_failure = true;
                    lookup_failures += 1;
                }
            }
        }

        info!(
            scanned,
            skipped, unsafe_found, lookup_failures, "Scan complete"
        );

        Ok(flags)
    }
}
