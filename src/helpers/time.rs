use chrono::Utc;

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

/// `true` when `now + buffer` has reached `expires_at`; a missing timestamp counts as expired.
pub fn is_past(expires_at: Option<i64>, now: i64, buffer_seconds: i64) -> bool {
    match expires_at {
        Some(expires_at) => now + buffer_seconds >= expires_at,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::is_past;

    #[test]
    fn boundary_counts_as_expired() {
        assert!(is_past(Some(100), 100, 0));
        assert!(is_past(Some(100), 70, 30));
        assert!(!is_past(Some(100), 69, 30));
        assert!(!is_past(Some(100), 99, 0));
    }

    #[test]
    fn missing_timestamp_is_expired() {
        assert!(is_past(None, 0, 0));
    }
}
