//! `${name}` template matching.
//!
//! A template mixes literal text with named placeholders, for example
//! `[${datetime}] ${msg}`. [`Format::compile`] turns it into an anchored
//! regular expression: literals are escaped and every placeholder captures
//! lazily, so a field runs up to the first occurrence of the literal that
//! follows it. The final placeholder runs to the end of the line.
//!
//! A `$` that is not followed by `{` is ordinary literal text.

use regex::Regex;
use thiserror::Error;

use crate::models::Fields;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),
    #[error("invalid placeholder name \"{0}\"")]
    InvalidName(String),
    #[error("placeholder \"{0}\" appears more than once")]
    Duplicate(String),
    #[error("template does not compile to a valid pattern: {0}")]
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Format {
    template: String,
    names: Vec<String>,
    regex: Regex,
}

impl Format {
    pub fn compile(template: &str) -> Result<Self, FormatError> {
        let segments = parse_segments(template)?;

        let mut pattern = String::from("(?s)^");
        let mut names = Vec::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Field(name) => {
                    pattern.push_str(&format!("(?P<{}>.*?)", name));
                    names.push(name.clone());
                }
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| FormatError::Pattern(e.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            names,
            regex,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names in template order.
    pub fn field_names(&self) -> &[String] {
        &self.names
    }

    /// Extract every placeholder from `line`, or `None` if the line does
    /// not satisfy the template.
    pub fn match_line(&self, line: &str) -> Option<Fields> {
        let caps = self.regex.captures(line)?;
        let fields = self
            .names
            .iter()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect();
        Some(fields)
    }
}

fn parse_segments(template: &str) -> Result<Vec<Segment>, FormatError> {
    let mut segments = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(pos) = rest.find("${") {
        literal.push_str(&rest[..pos]);
        let start = template.len() - rest.len() + pos;
        let after = &rest[pos + 2..];
        let end = after.find('}').ok_or(FormatError::Unterminated(start))?;
        let name = &after[..end];

        if !is_identifier(name) {
            return Err(FormatError::InvalidName(name.to_string()));
        }
        if seen.iter().any(|n| n == name) {
            return Err(FormatError::Duplicate(name.to_string()));
        }
        seen.push(name.to_string());

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Field(name.to_string()));
        rest = &after[end + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
