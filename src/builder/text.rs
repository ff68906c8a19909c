//! Text literal reassembly: escape decoding, multi-line dedent and
//! interpolation pairing.

use super::{child, shape, token, Builder};
use crate::ast::{Expression, TextLiteral};
use crate::errors::AstError;
use crate::syntax::{ParseTree, Span};

/// A run of literal text or an interpolated expression, before pairing.
#[derive(Debug)]
enum Piece<'t> {
    Text(String),
    Interpolation(&'t ParseTree),
}

impl Builder {
    pub(super) fn double_quoted(&mut self, node: &ParseTree) -> Result<TextLiteral, AstError> {
        let mut pieces = Vec::new();
        for chunk in node.children() {
            match chunk.rule() {
                "double-quote-char" => push_text(&mut pieces, token(chunk)?),
                "double-quote-escaped" => {
                    push_text(&mut pieces, &decode_escape(token(chunk)?, chunk.span)?)
                }
                "interpolation" => pieces.push(Piece::Interpolation(chunk)),
                _ => return Err(shape(chunk, "not a text chunk")),
            }
        }
        self.assemble(pieces)
    }

    pub(super) fn single_quoted(&mut self, node: &ParseTree) -> Result<TextLiteral, AstError> {
        let mut pieces = Vec::new();
        for chunk in node.children() {
            match chunk.rule() {
                "single-quote-char" => {
                    let text = token(chunk)?;
                    push_text(&mut pieces, if text == "\r\n" { "\n" } else { text });
                }
                "escaped-quote-pair" => push_text(&mut pieces, "''"),
                "escaped-interpolation" => push_text(&mut pieces, "${"),
                "interpolation" => pieces.push(Piece::Interpolation(chunk)),
                _ => return Err(shape(chunk, "not a text chunk")),
            }
        }
        self.assemble(dedent(pieces))
    }

    fn assemble(&mut self, pieces: Vec<Piece<'_>>) -> Result<TextLiteral, AstError> {
        let mut literal = TextLiteral::default();
        let mut pending = String::new();
        for piece in pieces {
            match piece {
                Piece::Text(text) => pending.push_str(&text),
                Piece::Interpolation(node) => {
                    let expression: Expression = self.expression(child(node, 0)?)?;
                    literal
                        .chunks
                        .push((std::mem::take(&mut pending), expression));
                }
            }
        }
        literal.trailing = pending;
        Ok(literal)
    }
}

fn push_text(pieces: &mut Vec<Piece<'_>>, text: &str) {
    match pieces.last_mut() {
        Some(Piece::Text(last)) => last.push_str(text),
        _ => pieces.push(Piece::Text(text.to_string())),
    }
}

/// Decode one `\…` escape sequence, backslash included.
fn decode_escape(escape: &str, span: Span) -> Result<String, AstError> {
    let invalid = || AstError::InvalidEscape {
        escape: escape.to_string(),
        span,
    };
    let body = escape.strip_prefix('\\').ok_or_else(invalid)?;
    let decoded = match body {
        "\"" => '"',
        "$" => '$',
        "\\" => '\\',
        "/" => '/',
        "b" => '\u{8}',
        "f" => '\u{c}',
        "n" => '\n',
        "r" => '\r',
        "t" => '\t',
        _ => {
            let hex = body.strip_prefix('u').ok_or_else(invalid)?;
            let hex = match hex.strip_prefix('{') {
                Some(braced) => braced.strip_suffix('}').ok_or_else(invalid)?,
                None if hex.len() == 4 => hex,
                None => return Err(invalid()),
            };
            u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(invalid)?
        }
    };
    Ok(decoded.to_string())
}

/// Remove the longest run of leading spaces and tabs shared by every line.
///
/// Blank lines do not constrain the indent, except the last line, which
/// holds the indentation of the closing quotes.
fn dedent(pieces: Vec<Piece<'_>>) -> Vec<Piece<'_>> {
    let mut lines: Vec<Vec<Piece<'_>>> = vec![Vec::new()];
    for piece in pieces {
        match piece {
            Piece::Text(text) => {
                for (i, part) in text.split('\n').enumerate() {
                    if i > 0 {
                        lines.push(Vec::new());
                    }
                    if let Some(line) = lines.last_mut() {
                        if !part.is_empty() {
                            push_text(line, part);
                        }
                    }
                }
            }
            interpolation => {
                if let Some(line) = lines.last_mut() {
                    line.push(interpolation);
                }
            }
        }
    }

    let last = lines.len() - 1;
    let indent = lines
        .iter()
        .enumerate()
        .filter(|(i, line)| *i == last || !line.is_empty())
        .map(|(_, line)| leading_whitespace(line))
        .reduce(common_prefix)
        .unwrap_or("")
        .to_string();

    let mut result = Vec::new();
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 {
            push_text(&mut result, "\n");
        }
        for (j, piece) in line.into_iter().enumerate() {
            match piece {
                Piece::Text(text) if j == 0 => {
                    let stripped = text.strip_prefix(indent.as_str()).unwrap_or(&text);
                    push_text(&mut result, stripped);
                }
                Piece::Text(text) => push_text(&mut result, &text),
                interpolation => result.push(interpolation),
            }
        }
    }
    result
}

fn leading_whitespace<'a>(line: &'a [Piece<'_>]) -> &'a str {
    match line.first() {
        Some(Piece::Text(text)) => {
            let end = text
                .find(|c: char| c != ' ' && c != '\t')
                .unwrap_or(text.len());
            &text[..end]
        }
        _ => "",
    }
}

fn common_prefix<'a>(a: &'a str, b: &'a str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()));
    &a[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(pieces: &[Piece<'_>]) -> String {
        pieces
            .iter()
            .map(|p| match p {
                Piece::Text(text) => text.as_str(),
                Piece::Interpolation(_) => "<>",
            })
            .collect()
    }

    #[test]
    fn escapes_decode() {
        let span = Span::new(0, 2);
        assert_eq!(decode_escape("\\n", span).unwrap(), "\n");
        assert_eq!(decode_escape("\\u00e9", span).unwrap(), "é");
        assert_eq!(decode_escape("\\u{1F600}", span).unwrap(), "😀");
        assert!(matches!(
            decode_escape("\\uD800", span),
            Err(AstError::InvalidEscape { .. })
        ));
        assert!(matches!(
            decode_escape("\\u{110000}", span),
            Err(AstError::InvalidEscape { .. })
        ));
    }

    #[test]
    fn dedent_strips_the_shared_indent() {
        let pieces = vec![Piece::Text("    foo\n      bar\n    ".to_string())];
        assert_eq!(flatten(&dedent(pieces)), "foo\n  bar\n");
    }

    #[test]
    fn blank_lines_do_not_limit_the_indent() {
        let pieces = vec![Piece::Text("  a\n\n  b\n  ".to_string())];
        assert_eq!(flatten(&dedent(pieces)), "a\n\nb\n");
    }

    #[test]
    fn closing_line_counts_towards_the_indent() {
        let pieces = vec![Piece::Text("    a\n  ".to_string())];
        assert_eq!(flatten(&dedent(pieces)), "  a\n");
    }

    #[test]
    fn common_prefix_is_char_aligned() {
        assert_eq!(common_prefix("  \t", "  x"), "  ");
        assert_eq!(common_prefix("  ", "    "), "  ");
        assert_eq!(common_prefix("", "  "), "");
    }
}
