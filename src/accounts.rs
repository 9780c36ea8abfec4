// Account parsing: turns the raw accounts text (one `label|cookie` or
// `label:cookie` per line) into records. Malformed lines are skipped so a
// single typo never blocks the rest of the batch.

use serde::Serialize;

/// Marker users often paste along with the token when they copy a whole
/// cookie header. Everything up to and including it is stripped.
const COOKIE_MARKER: &str = ".ROBLOSECURITY=";

/// One account to run the command for. `credential` goes over the wire
/// as `cookie`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub label: String,
    #[serde(rename = "cookie")]
    pub credential: String,
}

/// Parse every non-blank line of `raw`. Never fails.
pub fn parse_accounts(raw: &str) -> Vec<AccountRecord> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<AccountRecord> {
    // `|` wins when both separators are present.
    let sep = if line.contains('|') {
        '|'
    } else if line.contains(':') {
        ':'
    } else {
        return None;
    };
    // Only the text between the first and second separator is the
    // credential; anything after a second separator is discarded.
    let mut parts = line.split(sep);
    let label = parts.next()?.trim();
    let mut credential = parts.next().unwrap_or("").trim();
    if let Some(idx) = credential.find(COOKIE_MARKER) {
        credential = credential[idx + COOKIE_MARKER.len()..].trim();
    }

    if label.is_empty() || credential.is_empty() {
        return None;
    }
    Some(AccountRecord {
        label: label.to_string(),
        credential: credential.to_string(),
    })
}
