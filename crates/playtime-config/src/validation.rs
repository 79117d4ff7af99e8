//! Configuration validation

use crate::schema::RawConfig;
use chrono::NaiveDate;
use playtime_util::DATE_FORMAT;
use std::collections::HashSet;
use thiserror::Error;

/// Longest accepted resync timeout, in seconds
pub const MAX_SYNC_TIMEOUT_SECS: u64 = 10;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{field} must be a non-negative number of minutes, got {value}")]
    NegativeLimit { field: &'static str, value: i64 },

    #[error("{field} of {value} minutes does not fit in a day")]
    LimitTooLarge { field: &'static str, value: i64 },

    #[error("Invalid holiday date '{value}': expected YYYY-MM-DD")]
    InvalidHoliday { value: String },

    #[error("Duplicate holiday date: {0}")]
    DuplicateHoliday(String),

    #[error("Activity label #{index} is empty")]
    EmptyActivity { index: usize },

    #[error("Duplicate activity label: {0}")]
    DuplicateActivity(String),

    #[error("time_server cannot be empty")]
    EmptyTimeServer,

    #[error("time_sync_timeout_seconds must be between 1 and {max}, got {value}")]
    InvalidSyncTimeout { value: u64, max: u64 },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_limit(
        "weekday_limit_minutes",
        config.weekday_limit_minutes,
    ));
    errors.extend(validate_limit(
        "weekend_limit_minutes",
        config.weekend_limit_minutes,
    ));

    let mut seen_holidays = HashSet::new();
    for holiday in &config.holidays {
        match parse_date(holiday) {
            Some(date) => {
                if !seen_holidays.insert(date) {
                    errors.push(ValidationError::DuplicateHoliday(holiday.clone()));
                }
            }
            None => errors.push(ValidationError::InvalidHoliday {
                value: holiday.clone(),
            }),
        }
    }

    if let Some(games) = &config.games {
        let mut seen = HashSet::new();
        for (index, game) in games.iter().enumerate() {
            if game.trim().is_empty() {
                errors.push(ValidationError::EmptyActivity { index });
            } else if !seen.insert(game.as_str()) {
                errors.push(ValidationError::DuplicateActivity(game.clone()));
            }
        }
    }

    if let Some(server) = &config.time_server
        && server.trim().is_empty()
    {
        errors.push(ValidationError::EmptyTimeServer);
    }

    if let Some(timeout) = config.time_sync_timeout_seconds
        && !(1..=MAX_SYNC_TIMEOUT_SECS).contains(&timeout)
    {
        errors.push(ValidationError::InvalidSyncTimeout {
            value: timeout,
            max: MAX_SYNC_TIMEOUT_SECS,
        });
    }

    errors
}

fn validate_limit(field: &'static str, value: Option<i64>) -> Option<ValidationError> {
    let value = value?;
    if value < 0 {
        Some(ValidationError::NegativeLimit { field, value })
    } else if value > 24 * 60 {
        Some(ValidationError::LimitTooLarge { field, value })
    } else {
        None
    }
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-12-25").unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()
        );
        assert!(parse_date("2024-02-30").is_none());
        assert!(parse_date("12/25/2024").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&RawConfig::default()).is_empty());
    }

    #[test]
    fn test_negative_limit_rejected() {
        let config = RawConfig {
            weekday_limit_minutes: Some(-5),
            ..Default::default()
        };

        let errors = validate_config(&config);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::NegativeLimit {
                field: "weekday_limit_minutes",
                value: -5
            }]
        ));
    }

    #[test]
    fn test_zero_limit_allowed() {
        let config = RawConfig {
            weekday_limit_minutes: Some(0),
            weekend_limit_minutes: Some(0),
            ..Default::default()
        };
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_holiday_errors() {
        let config = RawConfig {
            holidays: vec![
                "2024-12-25".into(),
                "christmas".into(),
                "2024-12-25".into(),
            ],
            ..Default::default()
        };

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidHoliday { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateHoliday(_))));
    }

    #[test]
    fn test_activity_errors() {
        let config = RawConfig {
            games: Some(vec!["VR".into(), " ".into(), "VR".into()]),
            ..Default::default()
        };

        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyActivity { index: 1 })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateActivity(_))));
    }

    #[test]
    fn test_sync_timeout_bounds() {
        for (value, ok) in [(0, false), (1, true), (10, true), (11, false)] {
            let config = RawConfig {
                time_sync_timeout_seconds: Some(value),
                ..Default::default()
            };
            assert_eq!(validate_config(&config).is_empty(), ok, "timeout {}", value);
        }
    }
}
