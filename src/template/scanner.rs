#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Bracketed,
    LineComment,
    BlockComment(u32),
}

/// Where in the statement a placeholder was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Site {
    /// Plain SQL.
    Code,
    /// A string literal holding nothing but the placeholder, `'{name}'` or
    /// `N'{name}'`. A replacement covers the quotes and the `N` prefix.
    QuotedValue,
    /// Part of a longer string literal.
    Quoted,
    /// Inside a `[..]` or `".."` identifier.
    Identifier,
    Comment,
}

impl State {
    pub(super) fn site(self) -> Site {
        match self {
            State::Normal => Site::Code,
            State::SingleQuoted => Site::Quoted,
            State::DoubleQuoted | State::Bracketed => Site::Identifier,
            State::LineComment | State::BlockComment(_) => Site::Comment,
        }
    }
}

/// Scan `{name}` starting at the opening brace. Returns the index of the
/// closing brace and the name.
pub(super) fn scan_placeholder(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    if bytes.get(start) != Some(&b'{') {
        return None;
    }
    let name_start = start + 1;
    let first = *bytes.get(name_start)?;
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }
    let mut idx = name_start + 1;
    while idx < bytes.len() && is_ident_byte(bytes[idx]) {
        idx += 1;
    }
    if bytes.get(idx) != Some(&b'}') {
        return None;
    }
    std::str::from_utf8(&bytes[name_start..idx])
        .ok()
        .map(|name| (idx, name))
}

/// `'{name}'` starting at the opening quote. Returns the index of the closing
/// quote and the name.
pub(super) fn scan_quoted_placeholder(bytes: &[u8], quote: usize) -> Option<(usize, &str)> {
    let (close_brace, name) = scan_placeholder(bytes, quote + 1)?;
    let close_quote = close_brace + 1;
    // `'{name}'''` keeps going as one literal
    if bytes.get(close_quote) == Some(&b'\'') && bytes.get(close_quote + 1) != Some(&b'\'') {
        Some((close_quote, name))
    } else {
        None
    }
}

/// Start of the literal whose opening quote is at `quote`, including an
/// `N` prefix that stands on its own.
pub(super) fn literal_start(bytes: &[u8], quote: usize, floor: usize) -> usize {
    if quote > floor
        && matches!(bytes[quote - 1], b'N' | b'n')
        && (quote < 2 || !is_ident_byte(bytes[quote - 2]))
    {
        quote - 1
    } else {
        quote
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
