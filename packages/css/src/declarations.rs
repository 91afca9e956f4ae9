//! Ordered CSS declaration lists
//!
//! `color: red; padding: 4px !important;` parses into a list of
//! [`Declaration`]s. Property names are unique within a list; setting an
//! existing property replaces its value in place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single `property: value` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub important: bool,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into().trim().to_ascii_lowercase(),
            value: value.into().trim().to_string(),
            important: false,
        }
    }

    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }

    /// Whether the declaration can be written into a rule block inside a
    /// `<style>` element without closing either of them
    pub fn is_embeddable(&self) -> bool {
        !self.property.is_empty()
            && !self
                .property
                .contains(|c: char| matches!(c, '<' | '{' | '}' | ':' | ';'))
            && !self.value.contains('<')
            && !has_bare_brace(&self.value)
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.important {
            write!(f, "{}: {} !important;", self.property, self.value)
        } else {
            write!(f, "{}: {};", self.property, self.value)
        }
    }
}

/// Ordered declarations with unique property names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclarationList(Vec<Declaration>);

impl DeclarationList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Parse a declaration block body (no braces)
    ///
    /// Never fails: fragments without a `:`, with an empty property or value,
    /// or that are not [embeddable](Declaration::is_embeddable) are skipped.
    /// Semicolons inside quotes or parentheses do not split.
    pub fn parse(input: &str) -> Self {
        let mut list = Self::new();
        for chunk in split_top_level(input, ';') {
            let Some((property, value)) = chunk.split_once(':') else {
                continue;
            };
            let property = property.trim();
            let (value, important) = strip_important(value.trim());
            if property.is_empty() || value.is_empty() {
                continue;
            }
            let mut decl = Declaration::new(property, value);
            decl.important = important;
            if !decl.is_embeddable() {
                continue;
            }
            list.push(decl);
        }
        list
    }

    /// Insert or replace by property name, keeping the original position
    pub fn push(&mut self, decl: Declaration) {
        match self.0.iter_mut().find(|d| d.property == decl.property) {
            Some(existing) => *existing = decl,
            None => self.0.push(decl),
        }
    }

    pub fn set(&mut self, property: &str, value: &str) {
        self.push(Declaration::new(property, value));
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.find(property).map(|d| d.value.as_str())
    }

    pub fn find(&self, property: &str) -> Option<&Declaration> {
        let property = property.trim().to_ascii_lowercase();
        self.0.iter().find(|d| d.property == property)
    }

    pub fn remove(&mut self, property: &str) -> Option<Declaration> {
        let property = property.trim().to_ascii_lowercase();
        let index = self.0.iter().position(|d| d.property == property)?;
        Some(self.0.remove(index))
    }

    pub fn contains(&self, property: &str) -> bool {
        self.find(property).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First declaration that is not [embeddable](Declaration::is_embeddable)
    pub fn first_unembeddable(&self) -> Option<&Declaration> {
        self.0.iter().find(|d| !d.is_embeddable())
    }

    /// `(property, value)` pairs in order, for form-style consumers
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|d| (d.property.clone(), d.value.clone()))
            .collect()
    }

    /// Format as `a: b; c: d;`
    pub fn to_css(&self) -> String {
        self.0
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn replace_all(&mut self, decls: Vec<Declaration>) {
        self.0 = decls;
    }

    pub(crate) fn into_vec(self) -> Vec<Declaration> {
        self.0
    }
}

impl fmt::Display for DeclarationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

impl FromIterator<Declaration> for DeclarationList {
    fn from_iter<T: IntoIterator<Item = Declaration>>(iter: T) -> Self {
        let mut list = Self::new();
        for decl in iter {
            list.push(decl);
        }
        list
    }
}

impl<'a> IntoIterator for &'a DeclarationList {
    type Item = &'a Declaration;
    type IntoIter = std::slice::Iter<'a, Declaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn strip_important(value: &str) -> (&str, bool) {
    let lower = value.to_ascii_lowercase();
    if let Some(pos) = lower.rfind('!') {
        if lower[pos + 1..].trim() == "important" {
            return (value[..pos].trim_end(), true);
        }
    }
    (value, false)
}

/// `{` or `}` outside a quoted string
fn has_bare_brace(value: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match quote {
            Some(_) if ch == '\\' => {
                chars.next();
            }
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '{' | '}' => return true,
                _ => {}
            },
        }
    }
    false
}

/// Split on `separator` outside quotes, parentheses and comments
pub(crate) fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut chars = input.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if let Some(q) = quote {
            if ch == '\\' {
                chars.next();
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}
