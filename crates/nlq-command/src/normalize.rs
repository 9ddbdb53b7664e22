/// Trim, collapse whitespace, lowercase and drop trailing `?`, `!` and `.`.
pub fn normalize(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw).to_lowercase();
    collapsed
        .trim_end_matches(['?', '!', '.'])
        .trim_end()
        .to_string()
}

/// Single spaces between words, nothing at either end.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
