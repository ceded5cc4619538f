use std::iter::Peekable;
use std::str::CharIndices;

#[derive(PartialEq, Eq, Debug, Clone)]
/// Something with a position in some source code. This is useful for proper error reporting
pub struct Spanned<T> {
    pub start_idx: usize, // inclusive
    pub end_idx: usize,   // exclusive
    pub line_nr: u32,     // the line of the start_idx
    pub content: T,
}

impl<T> Spanned<T> {
    pub fn new(start_idx: usize, end_idx: usize, line_nr: u32, content: T) -> Self {
        Self {
            start_idx,
            end_idx,
            line_nr,
            content,
        }
    }

    /// Keeps the same location data as the old Spanned, but swaps out the inner value
    pub fn with_new_content<O>(&self, o: O) -> Spanned<O> {
        Spanned::new(self.start_idx, self.end_idx, self.line_nr, o)
    }
}

/// A character walker shared by the jack, vm and assembly lexers
pub struct StringLexer<'src> {
    source: &'src str,
    line_nr: u32,
    chars: Peekable<CharIndices<'src>>,
}

impl<'src> StringLexer<'src> {
    pub fn new(source: &'src str) -> Self {
        StringLexer {
            source,
            line_nr: 1,
            chars: source.char_indices().peekable(),
        }
    }

    pub fn line_nr(&self) -> u32 {
        self.line_nr
    }

    /// the byte offset of the next character (or the length of the source at the end)
    pub fn position(&mut self) -> usize {
        self.chars.peek().map_or(self.source.len(), |&(i, _)| i)
    }

    pub fn current_char(&mut self) -> Option<Spanned<char>> {
        let line_nr = self.line_nr;
        self.chars
            .peek()
            .map(|&(i, c)| Spanned::new(i, i + c.len_utf8(), line_nr, c))
    }

    pub fn current_eq(&mut self, test: char) -> bool {
        self.chars.peek().map_or(false, |&(_, c)| c == test)
    }

    pub fn advance(&mut self) -> Option<Spanned<char>> {
        let line_nr = self.line_nr;
        let (i, c) = self.chars.next()?;
        if c == '\n' {
            self.line_nr += 1;
        }

        Some(Spanned::new(i, i + c.len_utf8(), line_nr, c))
    }

    /// Consumes characters as long as the predicate holds.
    ///
    /// Returns None only if there was nothing left to consume at all
    pub fn take_chars_while<P>(&mut self, mut predicate: P) -> Option<Spanned<&'src str>>
    where
        P: FnMut(char) -> bool,
    {
        let start_idx = self.chars.peek()?.0;
        let start_line = self.line_nr;

        while let Some(&(_, c)) = self.chars.peek() {
            if !predicate(c) {
                break;
            }
            self.advance();
        }

        let end_idx = self.position();
        self.source
            .get(start_idx..end_idx)
            .map(|s| Spanned::new(start_idx, end_idx, start_line, s))
    }

    /// Consumes everything up to and including the next occurrence of `substr`.
    ///
    /// Returns the text in front of `substr`, or None if `substr` never occurs. In that case
    /// the rest of the input is consumed
    pub fn take_past_substr(&mut self, substr: &str) -> Option<Spanned<&'src str>> {
        let start_line = self.line_nr;
        let start_idx = self.position();

        let found = self.source.get(start_idx..)?.find(substr);
        let Some(offset) = found else {
            while self.advance().is_some() {}
            return None;
        };

        let end_idx = start_idx + offset;
        while self.position() < end_idx + substr.len() {
            self.advance()?;
        }

        self.source
            .get(start_idx..end_idx)
            .map(|s| Spanned::new(start_idx, end_idx, start_line, s))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lexer_take_while() {
        let mut iter = StringLexer::new("hello world");
        assert_eq!(
            Some(Spanned::new(0, 0, 1, "")),
            iter.take_chars_while(char::is_whitespace)
        );

        assert_eq!(
            Some(Spanned::new(0, 5, 1, "hello")),
            iter.take_chars_while(|c| !c.is_whitespace())
        );

        iter.advance();

        assert_eq!(
            Some(Spanned::new(6, 11, 1, "world")),
            iter.take_chars_while(|c| !c.is_whitespace())
        );
        assert_eq!(None, iter.take_chars_while(|_| true));
    }

    #[test]
    fn test_lexer_counts_lines() {
        let mut iter = StringLexer::new("a\nb\n\nc");
        iter.take_chars_while(|c| c != 'c');
        assert_eq!(4, iter.line_nr());
        assert_eq!(Some(Spanned::new(5, 6, 4, 'c')), iter.current_char());
    }

    #[test]
    fn test_lexer_take_past_substr_should_consume_the_terminator() {
        let mut iter = StringLexer::new("a comment */ rest");
        assert_eq!(
            Some(Spanned::new(0, 10, 1, "a comment ")),
            iter.take_past_substr("*/")
        );

        assert_eq!(
            Some(Spanned::new(12, 17, 1, " rest")),
            iter.take_chars_while(|_| true)
        );
    }

    #[test]
    fn test_lexer_take_past_substr_should_return_none_if_not_found() {
        let mut iter = StringLexer::new("hello world");
        assert_eq!(None, iter.take_past_substr("test"));
        assert_eq!(None, iter.current_char());
    }
}
