//! Query Translator
//!
//! Maps a free-text question to exactly one SQL statement by evaluating the
//! rule table against the normalized question. Translation is total and
//! deterministic: every input, including the empty string, yields the same
//! non-empty statement every time.

pub mod rules;

use crate::models::{Question, Translation};
use regex::Regex;
use std::sync::Arc;

pub use rules::{default_rules, Predicate, Rule, RuleSummary, RuleTable, Template};

lazy_static::lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("static regex");
}

/// Lower-case and collapse whitespace runs to single spaces.
pub fn normalize(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").to_lowercase()
}

#[derive(Debug, Clone)]
pub struct Translator {
    rules: Arc<RuleTable>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Translator {
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn translate(&self, question: &Question) -> Translation {
        self.translate_text(&question.text)
    }

    pub fn translate_text(&self, text: &str) -> Translation {
        let normalized = normalize(text);
        let rule = self.rules.first_match(&normalized);
        Translation {
            sql: rule.render(),
            rule_id: rule.id,
        }
    }
}
