//! Model output cleanup for sqlai
//!
//! Language models wrap the statement they were asked for in reasoning
//! blocks, echoed prompt text and markdown fences. [`ResponseSanitizer`]
//! strips those artifacts and leaves the statement text itself untouched.
//!
//! Sanitizing is a pure text transform. Whether the result is executable is
//! decided later by the executor.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{SqlaiError, SqlaiResult};

/// Opening marker of a reasoning segment
pub const REASONING_START: &str = "<think>";
/// Closing marker of a reasoning segment
pub const REASONING_END: &str = "</think>";

static FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| {
        Regex::new(r"(?s)```(?:[A-Za-z0-9_-]*[ \t]*\r?\n|(?i:sql(?:ite)?)\b)?[ \t]*(.*?)\s*```")
            .unwrap()
    });

/// Leading keywords of statements a model is asked to produce
const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "VALUES", "INSERT", "REPLACE", "UPDATE", "DELETE", "CREATE", "DROP",
    "ALTER", "PRAGMA", "EXPLAIN",
];

static ECHO_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:sql\s+query\s+for\s*:|sql\s*:)[ \t]*").unwrap());

/// Text of a model response after cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedSql(String);

impl SanitizedSql {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SanitizedSql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips non-SQL artifacts from raw model output
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseSanitizer;

impl ResponseSanitizer {
    pub fn new() -> Self {
        ResponseSanitizer
    }

    /// Clean a raw model response
    ///
    /// # Returns
    /// * `Ok(SanitizedSql)`, possibly empty
    /// * `Err(SanitizationError)` if the text contains a NUL character, which
    ///   no statement can carry
    pub fn sanitize(&self, raw: &str) -> SqlaiResult<SanitizedSql> {
        if raw.contains('\0') {
            return Err(SqlaiError::SanitizationError(
                "model response contains a NUL character".to_string(),
            ));
        }
        let clean = sanitize_text(raw);
        if clean.len() != raw.len() {
            debug!("sanitized response from {} to {} chars", raw.len(), clean.len());
        }
        Ok(SanitizedSql(clean))
    }
}

/// Apply every cleanup step until the text stops changing
///
/// Each step only removes text, so the loop terminates, and its output is a
/// fixed point: cleaning it again returns it unchanged.
pub fn sanitize_text(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_once(text: &str) -> String {
    let text = strip_reasoning(text).trim();
    let text = strip_fence(text).trim();
    let text = ECHO_REGEX.replace(text, "");
    text.trim().to_string()
}

/// Remove a reasoning prefix, including unbalanced markers
///
/// Only reasoning in front of the statement is removed. Markers inside the
/// statement's string literals are statement text.
fn strip_reasoning(text: &str) -> &str {
    let mut text = text.trim_start();
    while starts_with_ignore_case(text, REASONING_START) {
        match find_ignore_case(text, REASONING_END) {
            Some(end) => text = text[end + REASONING_END.len()..].trim_start(),
            // Reasoning that never closes leaves no statement
            None => return "",
        }
    }

    // A closing marker with no opening one ends a reasoning prefix
    let stray_end = if looks_like_statement(text) {
        find_outside_literals(text, REASONING_END)
    } else {
        find_ignore_case(text, REASONING_END)
    };
    match stray_end {
        Some(end) => &text[end + REASONING_END.len()..],
        None => text,
    }
}

/// Take the contents of the first fenced block
///
/// A reply that already reads as a statement is left alone unless it opens
/// with a fence, so backticks inside its literals are kept.
fn strip_fence(text: &str) -> &str {
    if !text.starts_with("```") && looks_like_statement(text) {
        return text;
    }
    FENCE_REGEX
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

fn looks_like_statement(text: &str) -> bool {
    let keyword = text
        .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    STATEMENT_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(keyword))
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

/// Byte offset of `needle` outside quoted strings and identifiers
fn find_outside_literals(haystack: &str, needle: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in haystack.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if matches!(c, '\'' | '"' | '`') => quote = Some(c),
            None if starts_with_ignore_case(&haystack[i..], needle) => return Some(i),
            None => {}
        }
    }
    None
}
