/// Kind of an unterminated comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comment {
    /// `-- ...` up to the end of the line.
    Line,
    /// `/* ... */`, not nested.
    Block,
}

/// Lexical position reached after scanning a SQL prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ScanState {
    /// Parenthesis nesting depth outside quoted regions and comments.
    pub depth: usize,
    /// Quote character of an unterminated literal or quoted identifier.
    pub open_quote: Option<char>,
    /// Comment still open at the end of the text.
    pub open_comment: Option<Comment>,
    /// A `)` appeared with no matching `(`.
    pub underflow: bool,
}

impl ScanState {
    /// True when the scanned prefix ends outside any literal, comment and parenthesis.
    pub fn is_top_level(&self) -> bool {
        self.depth == 0 && self.open_quote.is_none() && self.open_comment.is_none() && !self.underflow
    }
}

/// Run the lexer over `text`, handing every character that is not part of a comment
/// to `keep`. Each comment is reported as a single space.
fn walk(text: &str, mut keep: impl FnMut(char)) -> ScanState {
    let mut state = ScanState::default();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(comment) = state.open_comment {
            match comment {
                Comment::Line if ch == '\n' => {
                    state.open_comment = None;
                    keep(ch);
                }
                Comment::Block if ch == '*' && chars.peek() == Some(&'/') => {
                    chars.next();
                    state.open_comment = None;
                }
                _ => {}
            }
            continue;
        }

        if let Some(quote) = state.open_quote {
            if ch == quote {
                state.open_quote = None;
            }
            keep(ch);
            continue;
        }

        match ch {
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                state.open_comment = Some(Comment::Line);
                keep(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                state.open_comment = Some(Comment::Block);
                keep(' ');
            }
            '\'' | '"' => {
                state.open_quote = Some(ch);
                keep(ch);
            }
            '(' => {
                state.depth += 1;
                keep(ch);
            }
            ')' => {
                if state.depth == 0 {
                    state.underflow = true;
                } else {
                    state.depth -= 1;
                }
                keep(ch);
            }
            _ => keep(ch),
        }
    }

    state
}

/// Track parenthesis depth, quoting and comments across `text`.
///
/// Doubled quotes (`'it''s'`) fall out naturally: the literal closes and reopens.
pub(crate) fn scan(text: &str) -> ScanState {
    walk(text, |_| {})
}

/// `text` with every comment outside literals replaced by a space. An unterminated
/// block comment runs to the end, as in SQLite.
pub(crate) fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    walk(text, |ch| out.push(ch));
    out
}
