//! Reusable attribute validators.

use std::sync::OnceLock;

use azurerm_ids::ResourceId;
use regex::Regex;

use crate::schema::{Validation, Validator};

fn not_a(kind: &str, key: &str) -> Validation {
    (vec![], vec![format!("expected {key:?} to be {kind}")])
}

/// Adapt a typed ID's validation to the schema
pub fn resource_id<T: ResourceId + 'static>() -> Validator {
    Validator::new(|value, key| {
        let (warnings, errors) = T::validate(value, key);
        (warnings, errors.into_iter().map(|e| e.to_string()).collect())
    })
}

pub fn string_is_not_empty() -> Validator {
    Validator::new(|value, key| match value.as_str() {
        Some(s) if s.trim().is_empty() => (vec![], vec![format!("{key:?} must not be empty")]),
        Some(_) => (vec![], vec![]),
        None => not_a("a string", key),
    })
}

pub fn string_in_slice(values: &'static [&'static str], ignore_case: bool) -> Validator {
    Validator::new(move |value, key| {
        let Some(s) = value.as_str() else {
            return not_a("a string", key);
        };

        let found = values.iter().any(|candidate| {
            if ignore_case {
                candidate.eq_ignore_ascii_case(s)
            } else {
                *candidate == s
            }
        });

        if found {
            (vec![], vec![])
        } else {
            (
                vec![],
                vec![format!("expected {key} to be one of {values:?}, got {s}")],
            )
        }
    })
}

pub fn int_between(min: i64, max: i64) -> Validator {
    Validator::new(move |value, key| match value.as_i64() {
        Some(n) if (min..=max).contains(&n) => (vec![], vec![]),
        Some(n) => (
            vec![],
            vec![format!("expected {key} to be in the range ({min} - {max}), got {n}")],
        ),
        None => not_a("an integer", key),
    })
}

pub fn regex_matches(pattern: Regex, message: &'static str) -> Validator {
    Validator::new(move |value, key| match value.as_str() {
        Some(s) if pattern.is_match(s) => (vec![], vec![]),
        Some(s) => (vec![], vec![format!("{key} {s:?}: {message}")]),
        None => not_a("a string", key),
    })
}

/// Apply `validator` to every element of a list value
pub fn each(validator: Validator) -> Validator {
    Validator::new(move |value, key| {
        let Some(items) = value.as_array() else {
            return not_a("a list", key);
        };

        items
            .iter()
            .enumerate()
            .fold((vec![], vec![]), |(mut warnings, mut errors), (i, item)| {
                let (w, e) = validator.call(item, &format!("{key}.{i}"));
                warnings.extend(w);
                errors.extend(e);
                (warnings, errors)
            })
    })
}

/// Resource group names: up to 90 characters of letters, digits, `-_.()`, not ending in `.`
pub fn resource_group_name() -> Validator {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^[-\w._()]{1,90}$").expect("invalid regex"))
        .clone();

    Validator::new(move |value, key| {
        let Some(name) = value.as_str() else {
            return not_a("a string", key);
        };

        let mut errors = vec![];
        if !pattern.is_match(name) {
            errors.push(format!(
                "{key} may only contain alphanumeric characters, dash, underscores, parentheses and periods and must be between 1 and 90 characters"
            ));
        }
        if name.ends_with('.') {
            errors.push(format!("{key} cannot end with a period"));
        }
        (vec![], errors)
    })
}

/// IPv4 CIDR blocks such as `10.0.0.0/16`
pub fn cidr() -> Validator {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| {
            Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})$").expect("invalid regex")
        })
        .clone();

    Validator::new(move |value, key| {
        let Some(block) = value.as_str() else {
            return not_a("a string", key);
        };

        let valid = pattern.captures(block).is_some_and(|captures| {
            let octets_valid = (1..=4).all(|i| captures[i].parse::<u8>().is_ok());
            let prefix_valid = captures[5].parse::<u8>().is_ok_and(|prefix| prefix <= 32);
            octets_valid && prefix_valid
        });

        if valid {
            (vec![], vec![])
        } else {
            (vec![], vec![format!("{key} {block:?} is not a valid CIDR block")])
        }
    })
}
