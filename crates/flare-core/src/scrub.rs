//! Redaction of sensitive data from serialized payloads.
//!
//! A scrubber sees the final JSON text of a packet immediately before it is
//! written to the wire and returns the text that is actually sent. Rules that
//! only make sense for free text, such as card numbers, are confined to JSON
//! string literals so bare numbers in the payload keep it valid JSON.

use regex::{Captures, NoExpand, Regex};

use crate::error::{CoreError, Result};

/// Replacement used for credit-card-like digit runs.
pub const CREDIT_CARD_REPLACEMENT: &str = "####-CC-TRUNCATED-####";

/// Replacement used for password values.
pub const PASSWORD_REPLACEMENT: &str = "\"password\":\"XXXXXXXXXXXXXXX\"";

const CREDIT_CARD_PATTERN: &str = r"\b(?:\d[ -]*?){13,16}\b";
const PASSWORD_PATTERN: &str = r#""password"\s*:\s*"(?:[^"\\]|\\.)*""#;
const STRING_LITERAL_PATTERN: &str = r#""(?:[^"\\]|\\.)*""#;

/// Redacts sensitive substrings from serialized text.
pub trait Scrubber: Send + Sync {
    /// Returns `input` with sensitive content removed.
    fn scrub(&self, input: String) -> String;
}

impl<F> Scrubber for F
where
    F: Fn(String) -> String + Send + Sync,
{
    fn scrub(&self, input: String) -> String {
        self(input)
    }
}

/// Where a rule is allowed to match.
#[derive(Debug, Clone)]
enum Scope {
    /// Anywhere in the serialized text.
    Text,
    /// Only inside JSON string literals matched by the contained regex.
    StringLiterals(Regex),
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    replacement: String,
    scope: Scope,
}

impl Rule {
    fn apply(&self, text: &str) -> String {
        match &self.scope {
            Scope::Text => {
                self.pattern.replace_all(text, NoExpand(&self.replacement)).into_owned()
            },
            Scope::StringLiterals(literal) => literal
                .replace_all(text, |caps: &Captures<'_>| {
                    self.pattern.replace_all(&caps[0], NoExpand(&self.replacement)).into_owned()
                })
                .into_owned(),
        }
    }
}

/// Regex-driven scrubber applying each rule in order.
#[derive(Debug, Clone, Default)]
pub struct PatternScrubber {
    rules: Vec<Rule>,
}

impl PatternScrubber {
    /// Creates a scrubber with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scrubber redacting credit card numbers inside string values
    /// and JSON password fields.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if a built-in pattern fails to
    /// compile.
    pub fn standard() -> Result<Self> {
        Self::new()
            .with_string_rule(CREDIT_CARD_PATTERN, CREDIT_CARD_REPLACEMENT)?
            .with_rule(PASSWORD_PATTERN, PASSWORD_REPLACEMENT)
    }

    /// Adds a rule replacing every match of `pattern` with `replacement`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if `pattern` is not a valid regex.
    pub fn with_rule(mut self, pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        self.rules.push(Rule {
            pattern: compile(pattern)?,
            replacement: replacement.into(),
            scope: Scope::Text,
        });
        Ok(self)
    }

    /// Adds a rule that only rewrites matches inside JSON string literals.
    ///
    /// The replacement is spliced into the literal verbatim, so it may not
    /// contain `"` or `\`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if `pattern` is not a valid regex or
    /// `replacement` would end or escape the surrounding literal.
    pub fn with_string_rule(
        mut self,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self> {
        let replacement = replacement.into();
        if replacement.contains(['"', '\\']) {
            return Err(CoreError::invalid_input(
                "string scrub replacement cannot contain quotes or backslashes",
            ));
        }

        self.rules.push(Rule {
            pattern: compile(pattern)?,
            replacement,
            scope: Scope::StringLiterals(compile(STRING_LITERAL_PATTERN)?),
        });
        Ok(self)
    }

    /// Number of configured rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| CoreError::invalid_input(format!("invalid scrub pattern: {e}")))
}

impl Scrubber for PatternScrubber {
    fn scrub(&self, input: String) -> String {
        self.rules.iter().fold(input, |text, rule| rule.apply(&text))
    }
}
