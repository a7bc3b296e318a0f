use chrono::{FixedOffset, Offset, Utc};

use crate::config::helpers::{EnvLookup, ensure_range, optional_env, parse_env};
use crate::error::ConfigError;

pub const DEFAULT_UPCOMING_DAYS: i64 = 7;
pub const MAX_UPCOMING_DAYS: i64 = 36_500;
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Practice-wide defaults for deadline windows, listings and local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeConfig {
    /// Window used by the upcoming-deadlines query when none is given.
    pub upcoming_days: i64,
    pub page_size: usize,
    /// Offset in which "today" and calendar dates are evaluated.
    pub utc_offset: FixedOffset,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            upcoming_days: DEFAULT_UPCOMING_DAYS,
            page_size: DEFAULT_PAGE_SIZE,
            utc_offset: Utc.fix(),
        }
    }
}

/// Parse `Z`, `+HH:MM`, `-HH:MM` or `+HHMM`.
fn parse_utc_offset(key: &str, raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected an offset like '-03:00', got '{raw}'"),
    };
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[0..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..4].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

impl PracticeConfig {
    pub(crate) fn resolve(env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let upcoming_days = ensure_range(
            "GRAVATA_UPCOMING_DAYS",
            parse_env(env, "GRAVATA_UPCOMING_DAYS", DEFAULT_UPCOMING_DAYS)?,
            1,
            MAX_UPCOMING_DAYS,
        )?;
        let page_size = ensure_range(
            "GRAVATA_PAGE_SIZE",
            parse_env(env, "GRAVATA_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            1,
            crate::legal::listing::MAX_PAGE_SIZE,
        )?;
        let utc_offset = match optional_env(env, "GRAVATA_UTC_OFFSET")? {
            Some(raw) => parse_utc_offset("GRAVATA_UTC_OFFSET", &raw)?,
            None => Self::default().utc_offset,
        };

        Ok(Self {
            upcoming_days,
            page_size,
            utc_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::parse_utc_offset;

    #[test]
    fn offsets_parse_in_common_forms() {
        let sao_paulo = parse_utc_offset("K", "-03:00").expect("valid");
        assert_eq!(sao_paulo.local_minus_utc(), -3 * 3600);
        assert_eq!(
            parse_utc_offset("K", "+0530")
                .expect("valid")
                .local_minus_utc(),
            5 * 3600 + 30 * 60
        );
        assert_eq!(
            parse_utc_offset("K", "Z").expect("valid").local_minus_utc(),
            0
        );
    }

    #[test]
    fn malformed_offsets_are_rejected() {
        for raw in ["03:00", "+3", "+24:00", "-03:60", "+ab:cd", "+03:00:00"] {
            assert!(parse_utc_offset("K", raw).is_err(), "accepted {raw}");
        }
    }
}
