//! Quoting for SQL text that cannot use bind parameters
//!
//! `SET LOCAL` takes neither identifiers nor values as parameters, so these two
//! functions are the only place caller-influenced text is spliced into SQL.
//! They are applied to every value, trusted or not.

/// Quote an identifier: double every `"` and wrap in `"`
pub fn quote_identifier(ident: &str) -> String {
    quote(ident, '"')
}

/// Quote a string literal: double every `'` and wrap in `'`
pub fn quote_literal(value: &str) -> String {
    quote(value, '\'')
}

fn quote(raw: &str, mark: char) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push(mark);
    for c in raw.chars() {
        if c == mark {
            out.push(mark);
        }
        out.push(c);
    }
    out.push(mark);
    out
}
