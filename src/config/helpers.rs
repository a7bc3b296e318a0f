//! Environment parsing helpers shared by the config sections.
//!
//! Every helper reads through an [`EnvLookup`] so resolution can be driven by
//! a fixed map in tests instead of the process environment.

use std::str::FromStr;

use crate::error::ConfigError;

/// Source of raw configuration values, keyed by variable name.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Trimmed value of `key`, or `None` when unset or blank.
pub(crate) fn optional_env(env: EnvLookup<'_>, key: &str) -> Result<Option<String>, ConfigError> {
    Ok(env(key)
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty()))
}

pub(crate) fn parse_string_env(
    env: EnvLookup<'_>,
    key: &str,
    default: impl Into<String>,
) -> Result<String, ConfigError> {
    Ok(optional_env(env, key)?.unwrap_or_else(|| default.into()))
}

pub(crate) fn parse_bool_env(
    env: EnvLookup<'_>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match optional_env(env, key)? {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got '{other}'"),
            }),
        },
    }
}

pub(crate) fn parse_env<T>(env: EnvLookup<'_>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(env, key)? {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
    }
}

/// Reject values outside `min..=max`.
pub(crate) fn ensure_range<T>(key: &str, value: T, min: T, max: T) -> Result<T, ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be between {min} and {max}, got {value}"),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{ensure_range, optional_env, parse_bool_env, parse_env, parse_string_env};
    use crate::error::ConfigError;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn blank_values_read_as_unset() {
        let env = lookup(&[("A", "   "), ("B", " x ")]);
        assert_eq!(optional_env(&env, "A").expect("ok"), None);
        assert_eq!(optional_env(&env, "B").expect("ok").as_deref(), Some("x"));
        assert_eq!(
            parse_string_env(&env, "A", "fallback").expect("ok"),
            "fallback"
        );
    }

    #[test]
    fn booleans_accept_common_spellings() {
        let env = lookup(&[("ON", "Yes"), ("OFF", "0"), ("BAD", "maybe")]);
        assert!(parse_bool_env(&env, "ON", false).expect("ok"));
        assert!(!parse_bool_env(&env, "OFF", true).expect("ok"));
        assert!(parse_bool_env(&env, "MISSING", true).expect("ok"));

        let err = parse_bool_env(&env, "BAD", true).expect_err("not a boolean");
        let ConfigError::InvalidValue { key, message } = err;
        assert_eq!(key, "BAD");
        assert!(message.contains("maybe"), "unexpected message: {message}");
    }

    #[test]
    fn numbers_are_parsed_and_range_checked() {
        let env = lookup(&[("PORT", "8080"), ("JUNK", "eighty")]);
        assert_eq!(parse_env::<u16>(&env, "PORT", 5000).expect("ok"), 8080);
        assert_eq!(parse_env::<u16>(&env, "MISSING", 5000).expect("ok"), 5000);
        assert!(parse_env::<u16>(&env, "JUNK", 5000).is_err());
        assert!(ensure_range("N", 0, 1, 10).is_err());
        assert_eq!(ensure_range("N", 10, 1, 10).expect("in range"), 10);
    }
}
