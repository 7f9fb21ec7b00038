//! Per-operation deadlines and the `30m` / `1h30m` duration syntax used to configure them.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Parse durations such as `45s`, `5m` or `1h30m`
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"(\d+)(ms|h|m|s)").expect("invalid regex"));

    let input = input.trim();
    let mut consumed = 0;
    let mut total = Duration::ZERO;

    for captures in pattern.captures_iter(input) {
        let whole = captures.get(0).expect("capture group 0 always exists");
        if whole.start() != consumed {
            break;
        }
        consumed = whole.end();

        let amount: u64 = captures[1]
            .parse()
            .map_err(|e| format!("invalid duration {input:?}: {e}"))?;
        let part = match &captures[2] {
            "h" => amount.checked_mul(3600).map(Duration::from_secs),
            "m" => amount.checked_mul(60).map(Duration::from_secs),
            "s" => Some(Duration::from_secs(amount)),
            _ => Some(Duration::from_millis(amount)),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| format!("invalid duration {input:?}: out of range"))?;
    }

    if input.is_empty() || consumed != input.len() {
        return Err(format!(
            "invalid duration {input:?}: expected a sequence like \"1h30m\", \"5m\" or \"45s\""
        ));
    }

    Ok(total)
}

/// Render a duration in the syntax accepted by [`parse_duration`]
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.subsec_millis();
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, secs % 3600 / 60, secs % 60);

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 || (out.is_empty() && millis == 0) {
        out.push_str(&format!("{seconds}s"));
    }
    if millis > 0 {
        out.push_str(&format!("{millis}ms"));
    }
    out
}

/// serde adapter for `Duration` fields written as `30m`
pub mod duration_str {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// serde adapter for `Option<Duration>` fields written as `30m`
pub mod option_duration_str {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match duration {
            Some(duration) => serializer.serialize_some(&format_duration(*duration)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// How long each lifecycle operation may take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(with = "duration_str")]
    pub create: Duration,
    #[serde(with = "duration_str")]
    pub read: Duration,
    #[serde(with = "duration_str")]
    pub update: Duration,
    #[serde(with = "duration_str")]
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

/// Per-instance overrides, e.g. a `timeouts` block in a manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutOverrides {
    #[serde(with = "option_duration_str", skip_serializing_if = "Option::is_none")]
    pub create: Option<Duration>,
    #[serde(with = "option_duration_str", skip_serializing_if = "Option::is_none")]
    pub read: Option<Duration>,
    #[serde(with = "option_duration_str", skip_serializing_if = "Option::is_none")]
    pub update: Option<Duration>,
    #[serde(with = "option_duration_str", skip_serializing_if = "Option::is_none")]
    pub delete: Option<Duration>,
}

impl Timeouts {
    pub fn with_overrides(self, overrides: &TimeoutOverrides) -> Self {
        Self {
            create: overrides.create.unwrap_or(self.create),
            read: overrides.read.unwrap_or(self.read),
            update: overrides.update.unwrap_or(self.update),
            delete: overrides.delete.unwrap_or(self.delete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("45s", Duration::from_secs(45))]
    #[case("5m", Duration::from_secs(300))]
    #[case("1h30m", Duration::from_secs(5400))]
    #[case("250ms", Duration::from_millis(250))]
    #[case(" 2h ", Duration::from_secs(7200))]
    fn parses(#[case] input: &str, #[case] expected: Duration) {
        assert_eq!(parse_duration(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("30")]
    #[case("5 minutes")]
    #[case("m5")]
    #[case("1h-2m")]
    fn rejects(#[case] input: &str) {
        assert!(parse_duration(input).is_err());
    }

    #[rstest]
    #[case("6000000000000000h")]
    #[case("400000000000000000m")]
    #[case("18446744073709551615s1s")]
    #[case("99999999999999999999s")]
    fn rejects_out_of_range(#[case] input: &str) {
        let err = parse_duration(input).unwrap_err();
        assert!(err.starts_with("invalid duration"), "{err}");
    }

    #[rstest]
    #[case(Duration::from_secs(5400), "1h30m")]
    #[case(Duration::from_secs(300), "5m")]
    #[case(Duration::ZERO, "0s")]
    #[case(Duration::from_millis(1500), "1s500ms")]
    fn formats(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(format_duration(duration), expected);
    }

    #[test]
    fn overrides_replace_only_what_is_set() {
        let overrides: TimeoutOverrides = serde_json::from_str(r#"{"create": "10m"}"#).unwrap();
        let timeouts = Timeouts::default().with_overrides(&overrides);

        assert_eq!(timeouts.create, Duration::from_secs(600));
        assert_eq!(timeouts.read, Duration::from_secs(300));
    }

    #[test]
    fn unknown_operations_are_rejected() {
        assert!(serde_json::from_str::<TimeoutOverrides>(r#"{"destroy": "10m"}"#).is_err());
    }
}
