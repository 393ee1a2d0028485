//! List serialization with the reserved separator token

/// Token separating list elements in serialized form
///
/// Every element is followed by the separator, including the last one.
pub const LIST_SEPARATOR: &str = "@@@__@@@";

/// Join elements, appending the separator after each one
pub fn join_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for item in items {
        out.push_str(item.as_ref());
        out.push_str(LIST_SEPARATOR);
    }
    out
}

/// Split a serialized list, discarding the single trailing empty token
pub fn split_list(s: &str) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    let mut parts: Vec<&str> = s.split(LIST_SEPARATOR).collect();
    if parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts
}

/// Reject elements that would not survive a join/split cycle
pub(crate) fn check_element(value: &str) -> Result<(), String> {
    if value.contains(LIST_SEPARATOR) {
        Err(format!("'{}' contains the reserved list separator", value))
    } else {
        Ok(())
    }
}
