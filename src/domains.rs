//! Parsing of the userdomains file.
//!
//! Each line is expected to look like `http://example.com: account`, with a
//! literal colon-space separating the URL from the account that owns it.

/// One parsed line of the userdomains file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    /// URL to look up.
    pub url: String,

    /// cPanel account that owns the domain.
    pub account: String,
}

/// Parse one userdomains line into a record.
///
/// The split is strict: exactly one `": "` must occur, with no trimming or
/// quoting. Anything else is not a record and yields `None`.
pub fn parse_line(line: &str) -> Option<DomainRecord> {
    let mut parts = line.split(": ");
    let url = parts.next()?;
    let account = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    Some(DomainRecord {
        url: url.to_string(),
        account: account.to_string(),
    })
}
