/// Expiration calculator
///
/// Converts duration specs like "15m", "1d" or "30d" into absolute expiry
/// instants. Pure and stateless; the per-role, per-kind TTL table lives in
/// configuration and is validated at startup, so an unparsable spec is a
/// fatal configuration error rather than a per-request failure.
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Duration, Utc};

/// Parse a duration spec (`<integer><unit>`, unit in {m, h, d}) into
/// milliseconds.
pub fn resolve_duration_ms(spec: &str) -> ApiResult<i64> {
    let spec = spec.trim();

    let Some(unit) = spec.chars().last() else {
        return Err(ApiError::InvalidDurationSpec("empty spec".to_string()));
    };

    let value: i64 = spec[..spec.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| ApiError::InvalidDurationSpec(spec.to_string()))?;

    if value <= 0 {
        return Err(ApiError::InvalidDurationSpec(spec.to_string()));
    }

    let ms_per_unit = match unit {
        'm' => 60 * 1000,
        'h' => 60 * 60 * 1000,
        'd' => 24 * 60 * 60 * 1000,
        _ => return Err(ApiError::InvalidDurationSpec(spec.to_string())),
    };

    Ok(value * ms_per_unit)
}

/// Absolute expiry instant for a spec relative to `now`
pub fn expiry_from(now: DateTime<Utc>, spec: &str) -> ApiResult<DateTime<Utc>> {
    Ok(now + Duration::milliseconds(resolve_duration_ms(spec)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_minutes_hours_days() {
        assert_eq!(resolve_duration_ms("15m").unwrap(), 15 * 60 * 1000);
        assert_eq!(resolve_duration_ms("2h").unwrap(), 2 * 60 * 60 * 1000);
        assert_eq!(resolve_duration_ms("1d").unwrap(), 24 * 60 * 60 * 1000);
        assert_eq!(resolve_duration_ms("30d").unwrap(), 30 * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn test_resolve_rejects_malformed_specs() {
        for bad in ["", "d", "12", "12w", "-1d", "0m", "1.5h", "one-day"] {
            assert!(
                matches!(resolve_duration_ms(bad), Err(ApiError::InvalidDurationSpec(_))),
                "spec {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_expiry_from_adds_duration() {
        let now = Utc::now();
        let expiry = expiry_from(now, "1d").unwrap();
        assert_eq!(expiry - now, Duration::days(1));
    }
}
