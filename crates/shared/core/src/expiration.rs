//! Expiration time computation for non-OTC option purchases.

/// OTC assets carry an `_otc` suffix and accept a plain duration
pub fn is_otc(asset: &str) -> bool {
    asset.contains("_otc")
}

/// Expiration timestamp for a purchase placed at `server_time` (unix seconds).
///
/// The broker expects expirations on minute boundaries: the current minute is
/// truncated, pushed one minute further when 30 or more seconds have already
/// elapsed in it, then the duration is added in whole minutes.
pub fn expiration_time(server_time: i64, duration_secs: i64) -> i64 {
    let minute_start = server_time - server_time.rem_euclid(60);
    let shift = if server_time.rem_euclid(60) >= 30 { 1 } else { 0 };
    let minutes = duration_secs / 60 + shift;
    minute_start + minutes * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_otc() {
        assert!(is_otc("EURUSD_otc"));
        assert!(!is_otc("EURUSD"));
    }

    #[test]
    fn test_expiration_before_half_minute() {
        let base = 1_700_000_400;
        assert_eq!(expiration_time(base + 10, 60), base + 60);
    }

    #[test]
    fn test_expiration_after_half_minute() {
        let base = 1_700_000_400;
        assert_eq!(expiration_time(base + 45, 60), base + 120);
        assert_eq!(expiration_time(base + 30, 300), base + 360);
    }
}
