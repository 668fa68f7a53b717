use serde::Serialize;

/// Result of phone-number validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneCheck {
    pub pass: bool,
    /// Canonical `(XXX) XXX-XXXX` display form when valid.
    pub formatted: Option<String>,
}

/// Validate a US phone number and normalize it for display.
///
/// Accepts exactly 10 digits, or 11 digits with a leading country `1`
/// (stripped before formatting). Anything else is invalid. Pure — no network,
/// no side effects.
pub fn validate_phone(raw: &str) -> PhoneCheck {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('1') => &digits[1..],
        _ => {
            return PhoneCheck {
                pass: false,
                formatted: None,
            }
        }
    };

    PhoneCheck {
        pass: true,
        formatted: Some(format!(
            "({}) {}-{}",
            &national[..3],
            &national[3..6],
            &national[6..]
        )),
    }
}
