use once_cell::sync::Lazy;
use regex::Regex;

static MANDAYS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]*\.?[0-9]*$").expect("valid mandays pattern"));

/// Text state of a mandays input while the user is typing.
///
/// Keystrokes are only accepted when the text stays a digit/decimal pattern.
/// An empty field stays empty (not 0) until blur; on blur the text becomes a
/// number again, or falls back to the last committed value when it does not
/// parse (a lone `.`, for instance).
#[derive(Clone, Debug, PartialEq)]
pub struct MandaysField {
    text: String,
    value: f64,
}

impl MandaysField {
    pub fn new(value: f64) -> Self {
        Self {
            text: format_mandays(value),
            value,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Last committed value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Apply typed text. Returns false (and keeps the old text) when rejected.
    pub fn input(&mut self, text: &str) -> bool {
        if !is_mandays_input(text) {
            return false;
        }
        self.text = text.to_string();
        true
    }

    /// Commit the text and return the resulting value.
    pub fn blur(&mut self) -> f64 {
        if let Ok(parsed) = self.text.parse::<f64>() {
            self.value = parsed;
        }
        self.text = format_mandays(self.value);
        self.value
    }
}

pub fn is_mandays_input(text: &str) -> bool {
    MANDAYS_PATTERN.is_match(text)
}

fn format_mandays(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_digits_and_one_decimal_point() {
        assert!(is_mandays_input("1.5"));
        assert!(is_mandays_input("12"));
        assert!(is_mandays_input(".5"));
        assert!(is_mandays_input("3."));
        assert!(is_mandays_input(""));
        assert!(!is_mandays_input("1.2.3"));
        assert!(!is_mandays_input("abc"));
        assert!(!is_mandays_input("-1"));
        assert!(!is_mandays_input("1,5"));
    }

    #[test]
    fn only_ascii_digits_are_accepted() {
        assert!(!is_mandays_input("\u{0661}\u{0662}"));
        assert!(!is_mandays_input("\u{0967}.5"));

        let mut field = MandaysField::new(1.0);
        assert!(!field.input("\u{0661}"));
        assert_eq!(field.text(), "1");
    }

    #[test]
    fn rejected_input_keeps_previous_text() {
        let mut field = MandaysField::new(2.0);
        assert!(!field.input("2x"));
        assert_eq!(field.text(), "2");
    }

    #[test]
    fn empty_text_survives_until_blur() {
        let mut field = MandaysField::new(4.0);
        assert!(field.input(""));
        assert_eq!(field.text(), "");
        assert_eq!(field.value(), 4.0);

        assert_eq!(field.blur(), 4.0);
        assert_eq!(field.text(), "4");
    }

    #[test]
    fn blur_parses_the_typed_number() {
        let mut field = MandaysField::new(1.0);
        field.input("2.5");
        assert_eq!(field.blur(), 2.5);
        assert_eq!(field.text(), "2.5");
    }

    #[test]
    fn blur_of_lone_point_keeps_previous_value() {
        let mut field = MandaysField::new(3.0);
        field.input(".");
        assert_eq!(field.blur(), 3.0);
    }
}
