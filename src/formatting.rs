//! Content adaptation between body formats.
//!
//! A body is converted at most once per distinct target format during a
//! dispatch; the [`ConversionCache`] holds those conversions for the length
//! of one call. Escape decoding, when requested, runs after conversion.

use crate::core::NotifyFormat;
use crate::error::EscapeError;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::hash_map::{Entry, HashMap};
use std::sync::OnceLock;
use tracing::{debug, warn};

fn html_table_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[& \t<>]").expect("static regex"))
}

fn line_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r*\n").expect("static regex"))
}

/// Renders plain text as HTML that keeps its spacing and line breaks.
pub fn text_to_html(body: &str) -> String {
    let escaped = html_table_regex().replace_all(body, |caps: &Captures| match &caps[0] {
        "&" => "&amp;",
        " " => "&nbsp;",
        "\t" => "&nbsp;&nbsp;&nbsp;",
        "<" => "&lt;",
        ">" => "&gt;",
        _ => "",
    });
    line_break_regex()
        .replace_all(&escaped, "<br/>\r\n")
        .into_owned()
}

/// Renders markdown as HTML.
pub fn markdown_to_html(body: &str) -> String {
    use pulldown_cmark::{html, Options, Parser};
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(body, opts);
    let mut html_output = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut html_output, parser);
    html_output
}

/// Converts `body` written in `source` into what a `target` format expects.
///
/// Only MARKDOWN→HTML and TEXT→HTML transform the body; every other pairing,
/// and an unknown source format, passes through untouched.
pub fn convert(body: &str, source: Option<NotifyFormat>, target: NotifyFormat) -> Cow<'_, str> {
    match (source, target) {
        (Some(NotifyFormat::Markdown), NotifyFormat::Html) => Cow::Owned(markdown_to_html(body)),
        (Some(NotifyFormat::Text), NotifyFormat::Html) => Cow::Owned(text_to_html(body)),
        _ => Cow::Borrowed(body),
    }
}

/// Per-dispatch cache of converted bodies, keyed by target format.
pub struct ConversionCache<'a> {
    body: &'a str,
    source: Option<NotifyFormat>,
    interpret_escapes: bool,
    converted: HashMap<NotifyFormat, String>,
}

impl<'a> ConversionCache<'a> {
    pub fn new(body: &'a str, source: Option<NotifyFormat>, interpret_escapes: bool) -> Self {
        Self {
            body,
            source,
            interpret_escapes,
            converted: HashMap::new(),
        }
    }

    /// Returns the body adapted for `target`, converting it on first use.
    pub fn body_for(&mut self, target: NotifyFormat) -> Result<&str, EscapeError> {
        match self.converted.entry(target) {
            Entry::Occupied(entry) => Ok(entry.into_mut().as_str()),
            Entry::Vacant(entry) => {
                debug!(source = ?self.source, %target, "Converting message body");
                let converted = convert(self.body, self.source, target);
                let converted = if self.interpret_escapes {
                    interpret_escapes(&converted)?
                } else {
                    converted.into_owned()
                };
                Ok(entry.insert(converted).as_str())
            }
        }
    }

    /// Number of distinct formats converted so far.
    pub fn len(&self) -> usize {
        self.converted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converted.is_empty()
    }
}

/// Turns literal backslash escape sequences (`\n`, `\t`, `\x41`, `\u00e9`, ...)
/// into the characters they name.
///
/// Escapes naming a code point that cannot live in a `String` (a lone
/// surrogate, or anything above U+10FFFF) make the strict pass fail; the
/// input is then decoded again with those replaced by U+FFFD. A hex escape
/// cut short is an error in either pass.
pub fn interpret_escapes(input: &str) -> Result<String, EscapeError> {
    match decode_escapes(input, false) {
        Ok(decoded) => Ok(decoded),
        Err(EscapeError::InvalidCodePoint { value, position }) => {
            warn!(
                code_point = value,
                position, "Escape names an invalid code point; decoding with replacement"
            );
            decode_escapes(input, true)
        }
        Err(e) => Err(e),
    }
}

fn decode_escapes(input: &str, lossy: bool) -> Result<String, EscapeError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some((_, escape)) = chars.next() else {
            // A trailing backslash stays literal.
            out.push('\\');
            break;
        };
        match escape {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0b}'),
            // line continuation
            '\n' => {}
            '0'..='7' => {
                let mut value = escape as u32 - '0' as u32;
                for _ in 0..2 {
                    match chars.peek().and_then(|&(_, d)| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                push_code_point(&mut out, value, position, lossy)?;
            }
            'x' | 'u' | 'U' => {
                let width = match escape {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut value: u32 = 0;
                for _ in 0..width {
                    match chars.peek().and_then(|&(_, d)| d.to_digit(16)) {
                        Some(digit) => {
                            value = value * 16 + digit;
                            chars.next();
                        }
                        None => {
                            return Err(EscapeError::Truncated {
                                kind: escape,
                                position,
                            })
                        }
                    }
                }
                push_code_point(&mut out, value, position, lossy)?;
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn push_code_point(
    out: &mut String,
    value: u32,
    position: usize,
    lossy: bool,
) -> Result<(), EscapeError> {
    match char::from_u32(value) {
        Some(c) => out.push(c),
        None if lossy => out.push(char::REPLACEMENT_CHARACTER),
        None => return Err(EscapeError::InvalidCodePoint { value, position }),
    }
    Ok(())
}
