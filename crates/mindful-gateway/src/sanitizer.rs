/// Input sanitizer to prevent log poisoning and oversized prompts.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    max_message_length: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            max_message_length: 4_000,
        }
    }
}

impl Sanitizer {
    pub fn new(max_message_length: usize) -> Self {
        Self { max_message_length }
    }

    /// Strip control characters and enforce the length limit (in characters).
    pub fn sanitize(&self, input: &str) -> SanitizeResult {
        if input.chars().count() > self.max_message_length {
            return SanitizeResult::Rejected(format!(
                "Message is too long (limit is {} characters)",
                self.max_message_length
            ));
        }

        let cleaned: String = input
            .chars()
            .filter(|c| {
                // Allow printable characters, newlines, tabs
                !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r'
            })
            .collect();

        if cleaned.is_empty() && !input.is_empty() {
            return SanitizeResult::Rejected("Message contains only control characters".to_string());
        }

        if cleaned != input {
            SanitizeResult::Cleaned(cleaned)
        } else {
            SanitizeResult::Clean(cleaned)
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum SanitizeResult {
    /// Input was already clean.
    Clean(String),
    /// Input was cleaned (control characters removed).
    Cleaned(String),
    /// Input was rejected entirely, with the reason shown to the user.
    Rejected(String),
}

impl SanitizeResult {
    pub fn is_rejected(&self) -> bool {
        matches!(self, SanitizeResult::Rejected(_))
    }

    /// The usable text, or the rejection reason.
    pub fn into_result(self) -> Result<String, String> {
        match self {
            SanitizeResult::Clean(s) | SanitizeResult::Cleaned(s) => Ok(s),
            SanitizeResult::Rejected(reason) => Err(reason),
        }
    }
}
