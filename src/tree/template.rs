//! Path templating
//!
//! A template such as `{title}/{title} - {subtitle}` describes where a
//! recording lands in the namespace. Separators in the template become
//! directory boundaries; placeholders are filled from the record.
//!
//! Templates are validated when parsed, so rendering never fails: a field the
//! record does not carry renders as an empty string.

use crate::record::Record;
use crate::types::SEPARATOR;
use chrono::format::{Item, StrftimeItems};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Template used when none is configured
pub const DEFAULT_TEMPLATE: &str = "{title}/{title} - {subtitle}";

/// Timestamp format used by `{start}` and `{end}` without an explicit format
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H.%M";

/// Template parse failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,
    #[error("unknown placeholder {{{0}}}")]
    UnknownField(String),
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),
    #[error("unmatched '}}' at byte {0}")]
    UnmatchedClose(usize),
    #[error("placeholder {{{0}}} does not take a format")]
    UnexpectedFormat(String),
    #[error("invalid time format '{0}'")]
    InvalidTimeFormat(String),
}

/// Record fields a template can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Subtitle,
    Id,
    Channel,
    Description,
    Start,
    End,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Field::Title),
            "subtitle" => Some(Field::Subtitle),
            "id" => Some(Field::Id),
            "channel" => Some(Field::Channel),
            "description" => Some(Field::Description),
            "start" => Some(Field::Start),
            "end" => Some(Field::End),
            _ => None,
        }
    }

    fn is_timestamp(self) -> bool {
        matches!(self, Field::Start | Field::End)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Field { field: Field, format: Option<String> },
}

/// A record rendered through a template, before sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPath {
    /// Leading directory components, outermost first
    pub dirs: Vec<String>,
    /// Final component naming the file
    pub base: String,
}

/// Parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    /// One entry per separator-delimited component of the template
    segments: Vec<Vec<Piece>>,
}

impl PathTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        if source.trim_matches(SEPARATOR).trim().is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut segments = Vec::new();
        let mut offset = 0;
        for segment in source.split(SEPARATOR) {
            if !segment.is_empty() {
                segments.push(parse_segment(segment, offset)?);
            }
            offset += segment.len() + SEPARATOR.len_utf8();
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Render `record` into directory components and a base name.
    ///
    /// Components that render empty are dropped. An empty base name falls back
    /// to the record id so that every record still gets a file.
    pub fn render(&self, record: &Record) -> RenderedPath {
        let mut components: Vec<String> = self
            .segments
            .iter()
            .map(|pieces| render_segment(pieces, record))
            .collect();

        let base = components.pop().unwrap_or_default();
        let base = if base.trim().is_empty() {
            record.id.clone()
        } else {
            base
        };
        components.retain(|c| !c.trim().is_empty());

        RenderedPath {
            dirs: components,
            base,
        }
    }
}

impl Default for PathTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_TEMPLATE).unwrap_or_else(|_| unreachable!("default template parses"))
    }
}

impl FromStr for PathTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_segment(segment: &str, offset: usize) -> Result<Vec<Piece>, TemplateError> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = segment.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                literal.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(TemplateError::UnmatchedClose(offset + i)),
            '{' => {
                let rest = &segment[i + 1..];
                let Some(end) = rest.find('}') else {
                    return Err(TemplateError::Unterminated(offset + i));
                };
                let body = &rest[..end];
                // skip the placeholder body and its closing brace
                for _ in 0..body.chars().count() + 1 {
                    chars.next();
                }
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(parse_placeholder(body)?);
            }
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

fn parse_placeholder(body: &str) -> Result<Piece, TemplateError> {
    let (name, format) = match body.split_once(':') {
        Some((name, format)) => (name.trim(), Some(format)),
        None => (body.trim(), None),
    };
    let field =
        Field::from_name(name).ok_or_else(|| TemplateError::UnknownField(name.to_string()))?;

    if let Some(format) = format {
        if !field.is_timestamp() {
            return Err(TemplateError::UnexpectedFormat(name.to_string()));
        }
        if format.is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
        {
            return Err(TemplateError::InvalidTimeFormat(format.to_string()));
        }
    }

    Ok(Piece::Field {
        field,
        format: format.map(str::to_string),
    })
}

fn render_segment(pieces: &[Piece], record: &Record) -> String {
    let mut out = String::new();
    for piece in pieces {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Field { field, format } => {
                let format = format.as_deref().unwrap_or(DEFAULT_TIME_FORMAT);
                match field {
                    Field::Title => out.push_str(record.title.as_deref().unwrap_or_default()),
                    Field::Subtitle => out.push_str(record.subtitle.as_deref().unwrap_or_default()),
                    Field::Id => out.push_str(&record.id),
                    Field::Channel => out.push_str(record.channel.as_deref().unwrap_or_default()),
                    Field::Description => {
                        out.push_str(record.description.as_deref().unwrap_or_default())
                    }
                    Field::Start => out.push_str(&record.start.format(format).to_string()),
                    Field::End => out.push_str(&record.end.format(format).to_string()),
                }
            }
        }
    }
    out
}
