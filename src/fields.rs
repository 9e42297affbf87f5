//! Decoding of loosely typed catalog fields into canonical values.
//!
//! Every function here is total: malformed input maps to an empty list or
//! `None`, never to an error.

use serde_json::Value;
use std::iter::Peekable;

/// Outcome of decoding a list-valued field.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedList {
    Empty,
    Single(String),
    List(Vec<String>),
}

impl ParsedList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ParsedList::Empty => Vec::new(),
            ParsedList::Single(value) => vec![value],
            ParsedList::List(values) => values,
        }
    }
}

/// Decodes genre and country fields.
///
/// A string opening with `[` is read as a list literal and yields `Empty` when
/// the literal is malformed. Any other non-empty string is wrapped as a single
/// entry. Lists keep their string entries.
pub fn parse_list_field(value: Option<&Value>) -> ParsedList {
    match value {
        Some(Value::String(text)) if text.starts_with('[') => {
            match parse_list_literal(text) {
                Some(values) => ParsedList::List(values),
                None => ParsedList::Empty,
            }
        }
        Some(Value::String(text)) if !text.is_empty() => ParsedList::Single(text.clone()),
        Some(Value::Array(values)) => ParsedList::List(strings_of(values)),
        _ => ParsedList::Empty,
    }
}

/// Decodes the cast field, which is either a serialized list or a list.
pub fn parse_cast_field(value: Option<&Value>) -> ParsedList {
    match value {
        Some(Value::String(text)) => match parse_list_literal(text) {
            Some(values) => ParsedList::List(values),
            None => ParsedList::Empty,
        },
        Some(Value::Array(values)) => ParsedList::List(strings_of(values)),
        _ => ParsedList::Empty,
    }
}

pub fn parse_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

pub fn parse_number(value: Option<&Value>) -> Option<f64> {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64()?,
        Some(Value::String(text)) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if number.is_finite() {
        Some(number)
    } else {
        None
    }
}

/// Years may be stored as integers, floats (`2021.0`) or numeric strings.
pub fn parse_year(value: Option<&Value>) -> Option<i32> {
    let number = parse_number(value)?;
    if number.fract() != 0.0 || number < i32::MIN as f64 || number > i32::MAX as f64 {
        return None;
    }
    Some(number as i32)
}

fn strings_of(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|value| match value {
            Value::String(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Parses a bracketed list of quoted strings, e.g. `['Action', "Sci-Fi"]`.
///
/// Accepts single and double quotes, backslash escapes, surrounding whitespace
/// and a trailing comma. Anything else, including non-string elements, is
/// rejected.
pub fn parse_list_literal(text: &str) -> Option<Vec<String>> {
    let mut chars = text.trim().chars().peekable();
    if chars.next()? != '[' {
        return None;
    }
    let mut values = Vec::new();
    loop {
        skip_whitespace(&mut chars);
        match chars.next()? {
            ']' => break,
            quote @ '\'' | quote @ '"' => values.push(read_quoted(&mut chars, quote)?),
            _ => return None,
        }
        skip_whitespace(&mut chars);
        match chars.next()? {
            ',' => continue,
            ']' => break,
            _ => return None,
        }
    }
    if chars.next().is_some() {
        return None;
    }
    Some(values)
}

fn skip_whitespace<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    while chars.peek().map_or(false, |c| c.is_whitespace()) {
        chars.next();
    }
}

fn read_quoted<I: Iterator<Item = char>>(chars: &mut Peekable<I>, quote: char) -> Option<String> {
    let mut value = String::new();
    loop {
        match chars.next()? {
            '\\' => read_escape(chars, &mut value)?,
            c if c == quote => return Some(value),
            c => value.push(c),
        }
    }
}

/// Decodes the escape following a backslash. Unknown escapes keep the
/// backslash; malformed numeric escapes and `\N{...}` reject the literal.
fn read_escape<I: Iterator<Item = char>>(chars: &mut Peekable<I>, value: &mut String) -> Option<()> {
    match chars.next()? {
        '\n' => {}
        'n' => value.push('\n'),
        't' => value.push('\t'),
        'r' => value.push('\r'),
        'a' => value.push('\u{7}'),
        'b' => value.push('\u{8}'),
        'f' => value.push('\u{c}'),
        'v' => value.push('\u{b}'),
        'x' => value.push(read_hex(chars, 2)?),
        'u' => value.push(read_hex(chars, 4)?),
        'U' => value.push(read_hex(chars, 8)?),
        'N' => return None,
        first @ '0'..='7' => {
            let mut code = first.to_digit(8)?;
            for _ in 0..2 {
                match chars.peek().and_then(|c| c.to_digit(8)) {
                    Some(digit) => {
                        code = code * 8 + digit;
                        chars.next();
                    }
                    None => break,
                }
            }
            value.push(std::char::from_u32(code)?);
        }
        c @ '\\' | c @ '\'' | c @ '"' => value.push(c),
        other => {
            value.push('\\');
            value.push(other);
        }
    }
    Some(())
}

fn read_hex<I: Iterator<Item = char>>(chars: &mut I, digits: usize) -> Option<char> {
    let mut code = 0u32;
    for _ in 0..digits {
        code = code * 16 + chars.next()?.to_digit(16)?;
    }
    std::char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn text(s: &str) -> Value {
        Value::String(s.to_owned())
    }

    fn parse(value: &Value) -> Vec<String> {
        parse_list_field(Some(value)).into_vec()
    }

    #[test]
    fn list_literals() {
        assert_eq!(parse(&text(r#"["Action","Drama"]"#)), vec!["Action", "Drama"]);
        assert_eq!(
            parse(&text("['Science Fiction', 'Drama', ]")),
            vec!["Science Fiction", "Drama"]
        );
        assert_eq!(parse(&text(r"['Ocean\'s Eleven']")), vec!["Ocean's Eleven"]);
        assert_eq!(parse(&text("[]")), Vec::<String>::new());
    }

    #[test]
    fn escapes_decode_like_python_literals() {
        assert_eq!(
            parse_list_literal(r"['Amélie', 'Caf\xe9', 'Ca\u0301', '\U0001F3AC']"),
            Some(vec![
                "Amélie".to_owned(),
                "Café".to_owned(),
                "Ca\u{301}".to_owned(),
                "\u{1F3AC}".to_owned(),
            ])
        );
        assert_eq!(
            parse_list_literal(r"['tab\there', 'octal\101', 'keep\q']"),
            Some(vec![
                "tab\there".to_owned(),
                "octalA".to_owned(),
                "keep\\q".to_owned(),
            ])
        );
        assert_eq!(parse_list_literal(r"['bad\xZ9']"), None);
        assert_eq!(parse_list_literal(r"['\N{DASH}']"), None);
        assert_eq!(parse_list_literal(r"['\ud800']"), None);
    }

    #[test]
    fn single_strings_are_wrapped() {
        assert_eq!(
            parse_list_field(Some(&text("Action"))),
            ParsedList::Single("Action".to_owned())
        );
    }

    #[test]
    fn malformed_and_missing_values_are_empty() {
        assert_eq!(parse_list_field(None), ParsedList::Empty);
        assert_eq!(parse_list_field(Some(&Value::Null)), ParsedList::Empty);
        assert_eq!(parse_list_field(Some(&text(""))), ParsedList::Empty);
        assert_eq!(parse_list_field(Some(&text("[invalid"))), ParsedList::Empty);
        assert_eq!(parse_list_field(Some(&text("[invalid]"))), ParsedList::Empty);
        assert_eq!(parse_list_field(Some(&text("['a', 3]"))), ParsedList::Empty);
        assert_eq!(parse_list_field(Some(&text("['a' 'b']"))), ParsedList::Empty);
        assert_eq!(parse_list_field(Some(&json!(4))), ParsedList::Empty);
        assert_eq!(parse_list_field(Some(&Value::Bool(true))), ParsedList::Empty);
    }

    #[test]
    fn lists_keep_their_strings() {
        let value = json!(["France", null, "Spain", 3]);
        assert_eq!(parse(&value), vec!["France", "Spain"]);
    }

    #[test]
    fn cast_requires_a_list() {
        assert_eq!(
            parse_cast_field(Some(&text("['Tom Hanks', 'Meg Ryan']"))).into_vec(),
            vec!["Tom Hanks", "Meg Ryan"]
        );
        assert_eq!(parse_cast_field(Some(&text("Tom Hanks"))), ParsedList::Empty);
        assert_eq!(parse_cast_field(None), ParsedList::Empty);
    }

    #[test]
    fn years_and_numbers() {
        assert_eq!(parse_year(Some(&json!(2021))), Some(2021));
        assert_eq!(parse_year(Some(&text(" 1999 "))), Some(1999));
        assert_eq!(parse_year(Some(&text("2019.0"))), Some(2019));
        assert_eq!(parse_year(Some(&text("unknown"))), None);
        assert_eq!(parse_year(Some(&json!(2021.5))), None);
        assert_eq!(parse_year(None), None);
        assert_eq!(parse_number(Some(&text("12.5"))), Some(12.5));
        assert_eq!(parse_number(Some(&text("NaN"))), None);
    }
}
