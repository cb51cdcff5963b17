//! Mail address extraction from address-list header values.

/// Extracts the bare mail addresses from an address list.
///
/// Handles `Name <addr>`, bare `addr`, quoted display names containing
/// commas and group syntax (`team: a@x, b@y;`). Entries without an `@`
/// are ignored.
///
/// ```
/// use mailpattern_mime::address::extract;
///
/// let addrs = extract(r#""Doe, Jane" <jane@example.com>, bob@example.org"#);
/// assert_eq!(addrs, vec!["jane@example.com", "bob@example.org"]);
/// ```
#[must_use]
pub fn extract(list: &str) -> Vec<String> {
    split_entries(list)
        .into_iter()
        .filter_map(address_of)
        .collect()
}

fn split_entries(list: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut start = 0;

    for (index, c) in list.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' | ';' if !in_quotes && !in_angle => {
                entries.push(&list[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    entries.push(&list[start..]);
    entries
}

fn address_of(entry: &str) -> Option<String> {
    let entry = entry.trim();
    // Group syntax: "team: a@x" -> "a@x"
    let entry = match (entry.find(':'), entry.find('<'), entry.find('"')) {
        (Some(colon), angle, quote)
            if angle.is_none_or(|a| colon < a) && quote.is_none_or(|q| colon < q) =>
        {
            entry[colon + 1..].trim()
        }
        _ => entry,
    };

    let candidate = match (entry.rfind('<'), entry.rfind('>')) {
        (Some(open), Some(close)) if open < close => &entry[open + 1..close],
        _ => entry,
    };
    let candidate = candidate.trim();

    (candidate.contains('@') && !candidate.contains(char::is_whitespace))
        .then(|| candidate.to_string())
}
