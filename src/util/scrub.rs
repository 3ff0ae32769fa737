//! Redaction of secrets and identity numbers before text reaches a log.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Mask an Aadhaar number down to its last four digits.
pub fn mask_aadhaar(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return "XXXX".to_string();
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("XXXX-XXXX-{tail}")
}

#[derive(Debug, Clone)]
pub struct Scrubber {
    patterns: Vec<(Regex, &'static str)>,
}

impl Scrubber {
    pub fn new(patterns: Vec<(Regex, &'static str)>) -> Self {
        Self { patterns }
    }

    pub fn default_patterns() -> Vec<(Regex, &'static str)> {
        let raw = [
            (r"Bearer\s+[A-Za-z0-9._-]{10,}", "Bearer [REDACTED]"),
            (r"data:image/[a-zA-Z+.-]+;base64,[A-Za-z0-9+/=]+", "[IMAGE]"),
            (r"(?i)(otp|password)([\x22']?\s*[:=]\s*[\x22']?)[^\s\x22',}]+", "$1$2[REDACTED]"),
        ];
        raw.into_iter()
            .filter_map(|(p, replacement)| Regex::new(p).ok().map(|re| (re, replacement)))
            .collect()
    }

    /// Shared instance with the default patterns.
    pub fn global() -> &'static Scrubber {
        static SCRUBBER: OnceLock<Scrubber> = OnceLock::new();
        SCRUBBER.get_or_init(|| Scrubber::new(Self::default_patterns()))
    }

    pub fn scrub(&self, input: &str) -> String {
        let mut out = input.to_string();
        for (re, replacement) in &self.patterns {
            out = re.replace_all(&out, *replacement).into_owned();
        }
        mask_aadhaar_runs(&out)
    }
}

/// Replace standalone 12-digit runs with their masked form.
fn mask_aadhaar_runs(input: &str) -> String {
    static AADHAAR: OnceLock<Option<Regex>> = OnceLock::new();
    match AADHAAR
        .get_or_init(|| Regex::new(r"\b\d{4}\s?\d{4}\s?\d{4}\b").ok())
        .as_ref()
    {
        Some(re) => re
            .replace_all(input, |caps: &Captures<'_>| mask_aadhaar(&caps[0]))
            .into_owned(),
        None => input.to_string(),
    }
}
