//! The fragment of Trend Log semantics the application layer needs: the
//! enable-window computation (ASHRAE 135 clauses 12.25.5 through 12.25.7)
//! and the write gate refusing to re-enable a full stop-when-full log.
//!
//! A full Trend Log object model (log buffer, records, COV sampling) is out
//! of scope; these are the pure decision functions a WriteProperty handler
//! for such an object calls.

use bacnet_proto::services::{ErrorClass, ErrorCode};

/// Enable-time flag bit: the log's start time is a wildcard.
pub const LOG_TIME_START_WILD: u8 = 1;
/// Enable-time flag bit: the log's stop time is a wildcard.
pub const LOG_TIME_STOP_WILD: u8 = 2;

/// Combines a log's enable flag with its start/stop window to decide
/// whether it is recording at `now` (clauses 12.25.5 through 12.25.7).
///
/// `time_flags` carries the wildcard bits ([`LOG_TIME_START_WILD`],
/// [`LOG_TIME_STOP_WILD`]); a set bit means the matching bound places no
/// restriction. Times are seconds on whatever epoch the caller uses —
/// only their ordering matters here.
#[must_use]
pub fn log_is_enabled(enable: bool, time_flags: u8, start_time: i64, stop_time: i64, now: i64) -> bool {
    if !enable {
        return false;
    }
    if time_flags == 0 && stop_time < start_time {
        // Start time after stop time as per 12.25.6 and 12.25.7.
        return false;
    }
    if time_flags & (LOG_TIME_START_WILD | LOG_TIME_STOP_WILD)
        == (LOG_TIME_START_WILD | LOG_TIME_STOP_WILD)
    {
        return true;
    }
    if time_flags & LOG_TIME_START_WILD != 0 {
        now <= stop_time
    } else if time_flags & LOG_TIME_STOP_WILD != 0 {
        now >= start_time
    } else {
        start_time <= now && now <= stop_time
    }
}

/// Gate for writing `Enable` to a log (clause 12.25.5): a disabled,
/// stop-when-full log whose buffer is already full cannot be re-enabled.
///
/// Returns the error pair the WriteProperty handler should report, or
/// `Ok(())` when the write is allowed.
pub fn check_enable_write(
    currently_enabled: bool,
    stop_when_full: bool,
    record_count: u32,
    buffer_size: u32,
    new_value: bool,
) -> Result<(), (ErrorClass, ErrorCode)> {
    if !currently_enabled && stop_when_full && record_count >= buffer_size && new_value {
        return Err((ErrorClass::Object, ErrorCode::LogBufferFull));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bacnet_proto::primitive::{BacnetDate, BacnetTime};

    use super::*;

    const BOTH_WILD: u8 = LOG_TIME_START_WILD | LOG_TIME_STOP_WILD;

    #[test]
    fn disabled_log_is_never_enabled() {
        assert!(!log_is_enabled(false, BOTH_WILD, 0, 0, 50));
    }

    #[test]
    fn both_bounds_wild_means_always_enabled() {
        assert!(log_is_enabled(true, BOTH_WILD, 900, 100, 50));
    }

    #[test]
    fn wild_start_restricts_only_by_stop_time() {
        assert!(log_is_enabled(true, LOG_TIME_START_WILD, 0, 100, 100));
        assert!(!log_is_enabled(true, LOG_TIME_START_WILD, 0, 100, 101));
    }

    #[test]
    fn wild_stop_restricts_only_by_start_time() {
        assert!(log_is_enabled(true, LOG_TIME_STOP_WILD, 100, 0, 100));
        assert!(!log_is_enabled(true, LOG_TIME_STOP_WILD, 100, 0, 99));
    }

    #[test]
    fn concrete_window_requires_now_inside_it() {
        assert!(log_is_enabled(true, 0, 100, 200, 150));
        assert!(!log_is_enabled(true, 0, 100, 200, 99));
        assert!(!log_is_enabled(true, 0, 100, 200, 201));
    }

    #[test]
    fn inverted_concrete_window_disables_the_log() {
        assert!(!log_is_enabled(true, 0, 200, 100, 150));
    }

    #[test]
    fn time_flags_follow_from_wildcard_start_stop_times() {
        // A fully-wild start datetime sets the start-wild bit, the way a
        // device derives the flags when its start/stop times are written.
        let wild_date = BacnetDate::new(0xFF, 0xFF, 0xFF, 0xFF).unwrap();
        let wild_time = BacnetTime::new(0xFF, 0xFF, 0xFF, 0xFF);
        let mut time_flags = 0u8;
        if wild_date.is_wildcard() && wild_time.is_wildcard() {
            time_flags |= LOG_TIME_START_WILD;
        }
        let concrete_date = BacnetDate::new(109, 6, 5, 5).unwrap();
        if concrete_date.is_wildcard() {
            time_flags |= LOG_TIME_STOP_WILD;
        }

        assert_eq!(time_flags, LOG_TIME_START_WILD);
        assert!(log_is_enabled(true, time_flags, 0, 100, 50));
        assert!(!log_is_enabled(true, time_flags, 0, 100, 150));
    }

    #[test]
    fn full_stop_when_full_log_refuses_re_enable() {
        assert_eq!(
            check_enable_write(false, true, 1000, 1000, true),
            Err((ErrorClass::Object, ErrorCode::LogBufferFull))
        );
    }

    #[test]
    fn enable_write_is_allowed_otherwise() {
        // Already enabled, not full, not stop-when-full, or disabling.
        assert_eq!(check_enable_write(true, true, 1000, 1000, true), Ok(()));
        assert_eq!(check_enable_write(false, true, 999, 1000, true), Ok(()));
        assert_eq!(check_enable_write(false, false, 1000, 1000, true), Ok(()));
        assert_eq!(check_enable_write(false, true, 1000, 1000, false), Ok(()));
    }
}
