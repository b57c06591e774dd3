/// Most recent `cap` entries, in original order. Borrows, never copies.
pub fn cap_history<T>(messages: &[T], cap: usize) -> &[T] {
    let start = messages.len().saturating_sub(cap);
    &messages[start..]
}

/// In-place variant for owned histories: drains the oldest entries.
pub fn cap_history_in_place<T>(messages: &mut Vec<T>, cap: usize) {
    let excess = messages.len().saturating_sub(cap);
    if excess > 0 {
        messages.drain(..excess);
    }
}
