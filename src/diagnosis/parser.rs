//! Chat message parser
//!
//! Splits "Toyota 2015 rattling noise" into brand, model year and symptom
//! around the first plausible year.

use crate::diagnosis::types::ParsedMessage;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximal runs of ASCII digits, so a year can't be cut out of a longer number
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// Split a raw message around the first 19xx/20xx token
pub fn parse_message(text: &str) -> ParsedMessage {
    let found = DIGIT_RUN.find_iter(text).find(|m| {
        let digits = m.as_str();
        digits.len() == 4 && (digits.starts_with("19") || digits.starts_with("20"))
    });

    let Some(m) = found else {
        return ParsedMessage {
            brand: None,
            year: None,
            symptom: text.trim().to_string(),
        };
    };

    let brand = text[..m.start()].trim();

    ParsedMessage {
        brand: (!brand.is_empty()).then(|| brand.to_string()),
        year: m.as_str().parse().ok(),
        symptom: text[m.end()..].trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_brand_year_symptom() {
        let parsed = parse_message("Toyota 2015 rattling noise");
        assert_eq!(parsed.brand.as_deref(), Some("Toyota"));
        assert_eq!(parsed.year, Some(2015));
        assert_eq!(parsed.symptom, "rattling noise");
    }

    #[test]
    fn test_no_year() {
        let parsed = parse_message("  my car won't start ");
        assert_eq!(parsed.brand, None);
        assert_eq!(parsed.year, None);
        assert_eq!(parsed.symptom, "my car won't start");
    }

    #[test]
    fn test_year_first_has_no_brand() {
        let parsed = parse_message("2008 engine knocks");
        assert_eq!(parsed.brand, None);
        assert_eq!(parsed.year, Some(2008));
        assert_eq!(parsed.symptom, "engine knocks");
    }

    #[test]
    fn test_only_first_year_used() {
        let parsed = parse_message("Honda 2009 swapped engine from 2014 stalls");
        assert_eq!(parsed.year, Some(2009));
        assert_eq!(parsed.symptom, "swapped engine from 2014 stalls");
    }

    #[test]
    fn test_longer_numbers_are_not_years() {
        let parsed = parse_message("VIN 120155 then Ford 1998 misfire");
        assert_eq!(parsed.brand.as_deref(), Some("VIN 120155 then Ford"));
        assert_eq!(parsed.year, Some(1998));
        assert_eq!(parsed.symptom, "misfire");
    }

    #[test]
    fn test_other_centuries_ignored() {
        let parsed = parse_message("odometer 1800 km, lada 2107 clunks");
        assert_eq!(parsed.year, None);
        assert_eq!(parsed.symptom, "odometer 1800 km, lada 2107 clunks");
    }

    #[test]
    fn test_letters_adjacent_to_year() {
        let parsed = parse_message("Mazda3 2010misfires");
        assert_eq!(parsed.brand.as_deref(), Some("Mazda3"));
        assert_eq!(parsed.year, Some(2010));
        assert_eq!(parsed.symptom, "misfires");
    }

    #[test]
    fn test_year_only_leaves_empty_symptom() {
        let parsed = parse_message("BMW 2019");
        assert_eq!(parsed.brand.as_deref(), Some("BMW"));
        assert_eq!(parsed.symptom, "");
    }

    #[quickcheck]
    fn prop_digitless_text_is_all_symptom(text: String) -> bool {
        let text: String = text.chars().filter(|c| !c.is_ascii_digit()).collect();
        let parsed = parse_message(&text);
        parsed.brand.is_none() && parsed.year.is_none() && parsed.symptom == text.trim()
    }
}
