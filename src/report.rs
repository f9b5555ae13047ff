//! Verdict report text.

use std::io::{self, Write};

/// Defang a URL for safe display.
///
/// Dots are bracketed before the scheme prefixes are mangled; the scheme
/// strings contain no dots, so the two passes cannot interfere, but the
/// order is fixed regardless.
pub fn defang(url: &str) -> String {
    let defanged = url.replace('.', "[.]");
    let defanged = defanged.replace("http://", "hxxp://");
    defanged.replace("https://", "hxxps://")
}

/// Write the delimited threat report block for one flagged domain.
pub fn write_threat_block<W: Write>(
    out: &mut W,
    threat_type: &str,
    account: &str,
    url: &str,
) -> io::Result<()> {
    writeln!(out, "{}", "-".repeat(10))?;
    writeln!(out, "Threat found: {}", threat_type)?;
    writeln!(out, "Account: {}", account)?;
    writeln!(out, "Domain: {}", defang(url))?;
    writeln!(out, "{}", "-".repeat(10))?;
    writeln!(out)?;
    Ok(())
}
