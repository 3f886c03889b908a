//! Value formatting for object elements.
//!
//! A `format` attribute names a codec: `string('###-###')`, `number(2)`,
//! or `date('yyyy-MM-dd')`. The codec runs in both directions: [`Format::encode`]
//! turns the model value into display text at render time, and
//! [`Format::decode`] turns edited text back into a model value before the
//! change event is raised.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use thiserror::Error;

use tether_core::Value;

/// Errors raised by format parsing and decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// A `format` attribute that does not match `name(args)`.
    #[error("malformed format descriptor '{descriptor}'")]
    MalformedDescriptor {
        /// The attribute text.
        descriptor: String,
    },
    /// A descriptor naming a codec that does not exist.
    #[error("unknown format '{name}'")]
    UnknownFormat {
        /// The codec name.
        name: String,
    },
    /// A descriptor argument the codec cannot use.
    #[error("invalid argument '{argument}' for format '{name}'")]
    InvalidArgument {
        /// The codec name.
        name: &'static str,
        /// The offending argument text.
        argument: String,
    },
    /// Edited text the codec cannot turn back into a value.
    #[error("cannot decode '{text}' as {kind}")]
    DecodeFailed {
        /// The codec kind.
        kind: &'static str,
        /// The rejected text.
        text: String,
    },
}

static DESCRIPTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([a-zA-Z]+)\s*\(\s*(.*?)\s*\)\s*$").unwrap()
});

/// A bidirectional value↔text codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Format {
    /// Masked string formatting.
    String(StringFormat),
    /// Fixed-scale, thousands-grouped numbers.
    Number(NumberFormat),
    /// Pattern-based date/time formatting.
    Date(DateFormat),
}

impl Format {
    /// Parse a `format` attribute value, e.g. `number(2)`.
    pub fn from_descriptor(descriptor: &str) -> Result<Format, FormatError> {
        let captures = DESCRIPTOR.captures(descriptor).ok_or_else(|| {
            FormatError::MalformedDescriptor {
                descriptor: descriptor.to_string(),
            }
        })?;
        let name = &captures[1];
        let argument = strip_quotes(&captures[2]);
        match name {
            "string" => Ok(Format::String(StringFormat::new(argument))),
            "number" => {
                let scale = if argument.is_empty() {
                    0
                } else {
                    argument.parse().map_err(|_| FormatError::InvalidArgument {
                        name: "number",
                        argument: argument.to_string(),
                    })?
                };
                Ok(Format::Number(NumberFormat::new(scale)))
            }
            "date" => Ok(Format::Date(DateFormat::new(argument))),
            other => Err(FormatError::UnknownFormat {
                name: other.to_string(),
            }),
        }
    }

    /// The model value as display text.
    pub fn encode(&self, value: &Value) -> String {
        match self {
            Format::String(format) => format.encode(value),
            Format::Number(format) => format.encode(value),
            Format::Date(format) => format.encode(value),
        }
    }

    /// Edited display text as a model value. Empty text decodes to null.
    pub fn decode(&self, text: &str) -> Result<Value, FormatError> {
        if text.is_empty() {
            return Ok(Value::Null);
        }
        match self {
            Format::String(format) => Ok(format.decode(text)),
            Format::Number(format) => format.decode(text),
            Format::Date(format) => format.decode(text),
        }
    }
}

fn strip_quotes(argument: &str) -> &str {
    let trimmed = argument.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('\'') && trimmed.ends_with('\''))
            || (trimmed.starts_with('"') && trimmed.ends_with('"')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Masked string codec. Each `#` in the pattern consumes one character of
/// the value; other pattern characters are emitted literally.
#[derive(Debug, Clone, PartialEq)]
pub struct StringFormat {
    pattern: String,
}

impl StringFormat {
    /// Codec for the given mask pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    fn encode(&self, value: &Value) -> String {
        let text = value.display_string();
        if text.is_empty() {
            return String::new();
        }
        let mut chars = text.chars();
        let mut output = String::new();
        for pattern_char in self.pattern.chars() {
            if pattern_char == '#' {
                match chars.next() {
                    Some(ch) => output.push(ch),
                    None => break,
                }
            } else {
                // Stop once the value is exhausted so short values do not
                // pick up trailing literals.
                if chars.as_str().is_empty() {
                    break;
                }
                output.push(pattern_char);
            }
        }
        output.extend(chars);
        output
    }

    fn decode(&self, text: &str) -> Value {
        let mut chars = text.chars();
        let mut output = String::new();
        for pattern_char in self.pattern.chars() {
            let Some(ch) = chars.next() else {
                break;
            };
            if pattern_char == '#' {
                output.push(ch);
            }
            // Literal positions are dropped.
        }
        output.extend(chars);
        Value::String(output)
    }
}

/// Fixed-scale numeric codec with thousands grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormat {
    scale: usize,
}

impl NumberFormat {
    /// Codec rendering `scale` fractional digits.
    pub fn new(scale: usize) -> Self {
        Self { scale }
    }

    fn encode(&self, value: &Value) -> String {
        let Some(number) = value.as_float() else {
            return String::new();
        };
        let fixed = format!("{:.*}", self.scale, number);
        let (integral, fraction) = match fixed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (fixed.as_str(), None),
        };
        let mut output = group_thousands(integral);
        if let Some(fraction) = fraction {
            output.push('.');
            output.push_str(fraction);
        }
        output
    }

    fn decode(&self, text: &str) -> Result<Value, FormatError> {
        let stripped: String = text.chars().filter(|ch| *ch != ',').collect();
        // A lone sign is a half-typed number; treat it as zero.
        if stripped == "-" || stripped == "+" {
            return Ok(Value::Float(0.0));
        }
        let number: f64 = stripped.parse().map_err(|_| FormatError::DecodeFailed {
            kind: "number",
            text: text.to_string(),
        })?;
        let factor = 10f64.powi(self.scale as i32);
        Ok(Value::Float((number * factor).round() / factor))
    }
}

fn group_thousands(integral: &str) -> String {
    let (sign, digits) = match integral.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integral),
    };
    let mut output = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    output.push_str(sign);
    let offset = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && i % 3 == offset % 3 {
            output.push(',');
        }
        output.push(ch);
    }
    output
}

/// Pattern-based date/time codec.
///
/// Recognized tokens: `yyyy`, `yy`, `MM`, `dd`, `HH`, `hh`, `mm`, `ss`.
/// Anything else in the pattern is a literal. Model values are ISO-8601
/// strings; decoded values normalize to `yyyy-MM-ddTHH:mm:ss`.
#[derive(Debug, Clone, PartialEq)]
pub struct DateFormat {
    pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DateToken {
    Year4,
    Year2,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Literal(char),
}

impl DateFormat {
    /// Codec for the given pattern, e.g. `yyyy-MM-dd HH:mm:ss`.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    fn tokens(&self) -> Vec<DateToken> {
        let chars: Vec<char> = self.pattern.chars().collect();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let rest = &chars[i..];
            let (token, len) = if rest.starts_with(&['y', 'y', 'y', 'y']) {
                (DateToken::Year4, 4)
            } else if rest.starts_with(&['y', 'y']) {
                (DateToken::Year2, 2)
            } else if rest.starts_with(&['M', 'M']) {
                (DateToken::Month, 2)
            } else if rest.starts_with(&['d', 'd']) {
                (DateToken::Day, 2)
            } else if rest.starts_with(&['H', 'H']) || rest.starts_with(&['h', 'h']) {
                (DateToken::Hour, 2)
            } else if rest.starts_with(&['m', 'm']) {
                (DateToken::Minute, 2)
            } else if rest.starts_with(&['s', 's']) {
                (DateToken::Second, 2)
            } else {
                (DateToken::Literal(chars[i]), 1)
            };
            tokens.push(token);
            i += len;
        }
        tokens
    }

    fn encode(&self, value: &Value) -> String {
        let Value::String(text) = value else {
            return String::new();
        };
        let Some(datetime) = parse_iso(text) else {
            return String::new();
        };
        let mut output = String::new();
        for token in self.tokens() {
            match token {
                DateToken::Year4 => output.push_str(&format!("{:04}", datetime.year())),
                DateToken::Year2 => output.push_str(&format!("{:02}", datetime.year() % 100)),
                DateToken::Month => output.push_str(&format!("{:02}", datetime.month())),
                DateToken::Day => output.push_str(&format!("{:02}", datetime.day())),
                DateToken::Hour => output.push_str(&format!("{:02}", datetime.hour())),
                DateToken::Minute => output.push_str(&format!("{:02}", datetime.minute())),
                DateToken::Second => output.push_str(&format!("{:02}", datetime.second())),
                DateToken::Literal(ch) => output.push(ch),
            }
        }
        output
    }

    fn decode(&self, text: &str) -> Result<Value, FormatError> {
        let fail = || FormatError::DecodeFailed {
            kind: "date",
            text: text.to_string(),
        };
        let mut chars = text.chars().peekable();
        let mut year = 1970i32;
        let mut month = 1u32;
        let mut day = 1u32;
        let mut hour = 0u32;
        let mut minute = 0u32;
        let mut second = 0u32;
        for token in self.tokens() {
            match token {
                DateToken::Literal(expected) => {
                    if chars.next() != Some(expected) {
                        return Err(fail());
                    }
                }
                field => {
                    let width = if field == DateToken::Year4 { 4 } else { 2 };
                    let mut digits = String::new();
                    for _ in 0..width {
                        match chars.peek() {
                            Some(ch) if ch.is_ascii_digit() => {
                                digits.push(*ch);
                                chars.next();
                            }
                            _ => break,
                        }
                    }
                    let number: u32 = digits.parse().map_err(|_| fail())?;
                    match field {
                        DateToken::Year4 => year = number as i32,
                        DateToken::Year2 => year = 2000 + number as i32,
                        DateToken::Month => month = number,
                        DateToken::Day => day = number,
                        DateToken::Hour => hour = number,
                        DateToken::Minute => minute = number,
                        DateToken::Second => second = number,
                        DateToken::Literal(_) => {}
                    }
                }
            }
        }
        let datetime = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(fail)?;
        Ok(Value::String(
            datetime.format("%Y-%m-%dT%H:%M:%S").to_string(),
        ))
    }
}

fn parse_iso(text: &str) -> Option<NaiveDateTime> {
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(datetime.naive_local());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(datetime);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_parsing() {
        assert_eq!(
            Format::from_descriptor("number(2)"),
            Ok(Format::Number(NumberFormat::new(2)))
        );
        assert_eq!(
            Format::from_descriptor(" string( '###-###' ) "),
            Ok(Format::String(StringFormat::new("###-###")))
        );
        assert_eq!(
            Format::from_descriptor("date('yyyy-MM-dd')"),
            Ok(Format::Date(DateFormat::new("yyyy-MM-dd")))
        );
        assert!(matches!(
            Format::from_descriptor("currency(2)"),
            Err(FormatError::UnknownFormat { .. })
        ));
        assert!(matches!(
            Format::from_descriptor("number"),
            Err(FormatError::MalformedDescriptor { .. })
        ));
        assert!(matches!(
            Format::from_descriptor("number(two)"),
            Err(FormatError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_number_round_trip() {
        let format = Format::from_descriptor("number(2)").unwrap();
        assert_eq!(format.encode(&Value::Float(1234.5)), "1,234.50");
        assert_eq!(format.decode("1,234.50"), Ok(Value::Float(1234.5)));
        assert_eq!(format.encode(&Value::Int(-1234567)), "-1,234,567.00");
        assert_eq!(format.decode("-"), Ok(Value::Float(0.0)));
        assert_eq!(format.decode(""), Ok(Value::Null));
        assert!(matches!(
            format.decode("abc"),
            Err(FormatError::DecodeFailed { kind: "number", .. })
        ));
    }

    #[test]
    fn test_number_rounds_to_scale() {
        let format = Format::from_descriptor("number(1)").unwrap();
        assert_eq!(format.decode("2.36"), Ok(Value::Float(2.4)));
        assert_eq!(format.encode(&Value::Float(2.36)), "2.4");
    }

    #[test]
    fn test_string_mask() {
        let format = Format::from_descriptor("string('###-###')").unwrap();
        assert_eq!(format.encode(&Value::String("123456".into())), "123-456");
        assert_eq!(format.decode("123-456"), Ok(Value::String("123456".into())));
        // A short value stops before the literal.
        assert_eq!(format.encode(&Value::String("12".into())), "12");
        // Excess value characters pass through untouched.
        assert_eq!(format.encode(&Value::String("12345678".into())), "123-45678");
        assert_eq!(format.encode(&Value::Null), "");
    }

    #[test]
    fn test_date_round_trip() {
        let format = Format::from_descriptor("date('yyyy-MM-dd HH:mm:ss')").unwrap();
        assert_eq!(
            format.encode(&Value::String("2024-03-05T07:08:09".into())),
            "2024-03-05 07:08:09"
        );
        assert_eq!(
            format.decode("2024-03-05 07:08:09"),
            Ok(Value::String("2024-03-05T07:08:09".into()))
        );
    }

    #[test]
    fn test_date_partial_patterns() {
        let format = Format::from_descriptor("date('yyyy-MM-dd')").unwrap();
        // Missing time fields default to midnight.
        assert_eq!(
            format.decode("2024-03-05"),
            Ok(Value::String("2024-03-05T00:00:00".into()))
        );
        // Date-only model values still render.
        assert_eq!(format.encode(&Value::String("2024-03-05".into())), "2024-03-05");

        let short = Format::from_descriptor("date('yy/MM')").unwrap();
        assert_eq!(
            short.decode("24/06"),
            Ok(Value::String("2024-06-01T00:00:00".into()))
        );
        assert!(matches!(
            short.decode("xx/06"),
            Err(FormatError::DecodeFailed { kind: "date", .. })
        ));
    }

    #[test]
    fn test_date_invalid_calendar_day() {
        let format = Format::from_descriptor("date('yyyy-MM-dd')").unwrap();
        assert!(matches!(
            format.decode("2024-02-31"),
            Err(FormatError::DecodeFailed { .. })
        ));
    }
}
