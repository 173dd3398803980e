use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    // Local mobiles (0501234567), international (+966 50 123 4567) and dashed forms
    static ref PHONE_REGEX: Regex =
        Regex::new(r"(?:\+|\b)\d(?:[\s-]?\d){7,13}\b").unwrap();
    static ref DEFAULT_REDACTOR: PiiRedactor = PiiRedactor::new(RedactionConfig::default());
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    /// Replace matches with a short hash so the same value can be followed
    /// across log lines without revealing it
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// PII redactor for log messages
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    /// Redact every recognised PII value inside free text
    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    /// Mask a value known to be a phone number, whatever its format
    pub fn mask_phone(&self, phone: &str) -> String {
        let trimmed = phone.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        if self.config.hash_for_correlation {
            format!("PHONE[{}]", self.hash_value(trimmed))
        } else {
            let visible: String = trimmed
                .chars()
                .rev()
                .filter(|c| c.is_ascii_digit())
                .take(2)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("***{}", visible)
        }
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = &caps[0];
                if self.config.hash_for_correlation {
                    format!("EMAIL[{}]", self.hash_value(email))
                } else {
                    match email.split_once('@') {
                        Some((user, domain)) => format!(
                            "{}***@{}***",
                            user.chars().next().unwrap_or('*'),
                            domain.chars().next().unwrap_or('*')
                        ),
                        None => "***@***".to_string(),
                    }
                }
            })
            .to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let found = &caps[0];
                let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
                if is_identifier_segment(&text[..start]) {
                    found.to_string()
                } else {
                    self.mask_phone(found)
                }
            })
            .to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let result = hasher.finalize();
        general_purpose::STANDARD.encode(&result[..8]) // Use first 8 bytes for shorter hash
    }
}

/// Digits right after `<letters>-` belong to an id such as `REC-1700000000000-abcde`
fn is_identifier_segment(before: &str) -> bool {
    match before.strip_suffix('-') {
        Some(head) => head
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphabetic()),
        None => false,
    }
}

/// Redact free text with the default configuration
pub fn redact(text: &str) -> String {
    DEFAULT_REDACTOR.redact(text)
}

/// Mask a phone number with the default configuration
pub fn mask_phone(phone: &str) -> String {
    DEFAULT_REDACTOR.mask_phone(phone)
}
