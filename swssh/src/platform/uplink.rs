//! Extractors for the layer-2 uplink probe chain.
//!
//! Each step reads free-form command output line by line and returns the
//! first token it recognises; `None` ends the chain. The patterns come from
//! the vendor profile; the defaults below fit every built-in vendor.

use once_cell::sync::Lazy;
use regex::Regex;

/// IPv4 address whose first octet is not zero, so `0.0.0.0` never matches.
pub static DEFAULT_GATEWAY_IP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[1-9]\d{0,2}(?:\.\d{1,3}){3}\b").expect("ipv4 pattern must compile")
});

/// MAC address in dotted (`0000.0c9f.f064`) or dashed (`0000-5e00-0101`) form.
pub static DEFAULT_MAC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:[0-9a-f]{4}[.-]){2}[0-9a-f]{4}").expect("mac pattern must compile")
});

/// First gateway address in default-route output.
pub fn extract_gateway_ip(output: &str, pattern: &Regex) -> Option<String> {
    first_match(pattern, output)
}

/// First MAC address in ARP output.
pub fn extract_mac(output: &str, pattern: &Regex) -> Option<String> {
    first_match(pattern, output)
}

/// First match of `pattern` in `output`; its first capture group, if it has
/// one, otherwise the whole match.
fn first_match(pattern: &Regex, output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find_map(|row| pattern.captures(row))
        .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str().to_string())
}

/// Port for `mac` in MAC table output.
///
/// The first row holding a MAC address (per `mac_pattern`) is used, skipping
/// the echoed `command`. The port is field `column` among the fields that
/// follow `mac` in that row.
pub fn extract_uplink(
    output: &str,
    command: &str,
    mac: &str,
    column: usize,
    mac_pattern: &Regex,
) -> Option<String> {
    let row = output
        .lines()
        .map(str::trim)
        .filter(|row| !row.contains(command))
        .find(|row| mac_pattern.is_match(row))?;

    let lower = row.to_ascii_lowercase();
    let rest = match lower.rfind(&mac.to_ascii_lowercase()) {
        Some(pos) => &row[pos + mac.len()..],
        None => row,
    };
    rest.split_whitespace().nth(column).map(str::to_string)
}
