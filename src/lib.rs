//! Safe Browsing scanner for cPanel-hosted domains.
//!
//! Reads `domain: account` lines from a userdomains file, skips domains
//! belonging to suspended accounts, checks every remaining URL against the
//! Google Safe Browsing Lookup API, and prints verdicts as plain text.
//!
//! # Features
//!
//! - **Safe Browsing Lookup** - Query the v4 `threatMatches:find` endpoint
//! - **Suspension Filter** - Skip accounts marked `SUSPENDED=1` in cPanel
//! - **Verdict Caching** - TTL cache with optional on-disk persistence
//! - **Bitmask Exit Code** - Independent outcome bits combinable by OR
//!
//! Exit codes: `0` all safe, `1` unsafe found, `2` lookup failed, `4`
//! invalid input; a run can end with any OR of these.

pub mod cache;
pub mod config;
pub mod domains;
pub mod lookup;
pub mod report;
pub mod scanner;
pub mod status;
pub mod suspend;

pub use config::{Config, SafeBrowsingConfig};
pub use lookup::safebrowsing::SafeBrowsingClient;
pub use scanner::Scanner;
pub use status::ScanFlags;
pub use suspend::SuspensionOracle;
