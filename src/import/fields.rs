//! Spreadsheet field aliases and value coercion.
//!
//! Rows arrive with whatever headers the spreadsheet had. Each logical field
//! has an ordered list of accepted keys; the first key holding a non-blank
//! value wins.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};

pub type RawRecord = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Subtitle,
    Author,
    Edition,
    Quantity,
    Price,
    Isbn,
    Description,
}

impl Field {
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Title => &["Naziv dela", "Naziv", "Naslov", "title", "Title"],
            Field::Subtitle => &["podnaslov", "Podnaslov", "subtitle", "Subtitle"],
            Field::Author => &["Pisac", "Autor", "author", "Author"],
            Field::Edition => &["Biblioteka", "Edicija", "edition", "Edition"],
            Field::Quantity => &["Kolicina", "Količina", "quantity", "Quantity"],
            Field::Price => &["Cena", "price", "Price"],
            Field::Isbn => &["ISBN", "isbn"],
            Field::Description => &["Opis", "description", "Description"],
        }
    }
}

/// Trimmed text of the first non-blank alias of `field`.
pub fn extract(record: &RawRecord, field: Field) -> Option<String> {
    field
        .aliases()
        .iter()
        .filter_map(|key| record.get(*key))
        .find_map(value_text)
}

/// True when no value in the record carries any text.
pub fn is_blank(record: &RawRecord) -> bool {
    record.values().all(|v| value_text(v).is_none())
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Stock count. Missing, unparseable or negative values count as zero;
/// fractional values are truncated and trailing units ("12 kom") ignored.
pub fn parse_quantity(raw: Option<&str>) -> i32 {
    let Some(token) = raw.and_then(|r| r.split_whitespace().next()) else {
        return 0;
    };
    let token = token.replace(',', ".");

    let value = match token.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => Decimal::from_str(&token)
            .ok()
            .and_then(|d| d.trunc().to_i64()),
    };

    value.map_or(0, |n| n.clamp(0, i32::MAX as i64) as i32)
}

/// Price in dinars. `None` means "not set": missing, unparseable, negative
/// or finer than one para.
pub fn parse_price(raw: Option<&str>) -> Option<Decimal> {
    let mut text = raw?.trim().to_lowercase();
    for suffix in ["rsd", "дин.", "дин", "din.", "din"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            text = stripped.trim_end().to_string();
            break;
        }
    }
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    let normalized = match (text.rfind(','), text.rfind('.')) {
        // 1.234,50
        (Some(comma), Some(dot)) if comma > dot => text.replace('.', "").replace(',', "."),
        // 1,234.50
        (Some(_), Some(_)) => text.replace(',', ""),
        (Some(_), None) => text.replace(',', "."),
        // 1.200 or 12.500.000
        (None, Some(_)) if is_dot_grouped(&text) => text.replace('.', ""),
        _ => text,
    };

    let price = Decimal::from_str(&normalized).ok()?;
    if price.is_sign_negative() && !price.is_zero() {
        return None;
    }
    if price.normalize().scale() > 2 {
        return None;
    }
    Some(price)
}

/// Digits in dot-separated thousands groups, with no decimal part.
fn is_dot_grouped(text: &str) -> bool {
    let mut groups = text.split('.');
    let leading_ok = groups
        .next()
        .is_some_and(|g| {
            (1..=3).contains(&g.len())
                && !g.starts_with('0')
                && g.bytes().all(|b| b.is_ascii_digit())
        });
    let rest: Vec<&str> = groups.collect();
    leading_ok
        && !rest.is_empty()
        && rest
            .iter()
            .all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Best-effort split: the last word is the last name, the rest the first name.
/// A single-word name yields neither.
pub fn split_full_name(full_name: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    match parts.split_last() {
        Some((last, rest)) if !rest.is_empty() => (Some(rest.join(" ")), Some(last.to_string())),
        _ => (None, None),
    }
}
