use anyhow::{anyhow, Result};
use time::PrimitiveDateTime;

use crate::core::time::seconds_between;
use crate::db::models::StudySession;
use crate::db::types::SessionMode;

/// Validates a requested time limit and converts it to seconds.
pub(crate) fn normalize_time_limit(
    mode: SessionMode,
    minutes: Option<u32>,
    max_minutes: u32,
) -> Result<Option<i32>> {
    match (mode, minutes) {
        (_, None) => Ok(None),
        (SessionMode::Study, Some(_)) => {
            Err(anyhow!("time_limit_minutes is only supported for test sessions"))
        }
        (SessionMode::Test, Some(0)) => Err(anyhow!("time_limit_minutes must be positive")),
        (SessionMode::Test, Some(value)) if value > max_minutes => {
            Err(anyhow!("time_limit_minutes must be at most {max_minutes}"))
        }
        (SessionMode::Test, Some(value)) => Ok(Some(value as i32 * 60)),
    }
}

/// Accumulated running time of a session. `last_resumed_at` is set while the
/// clock runs and cleared while paused or finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionClock {
    pub(crate) elapsed_seconds: i32,
    pub(crate) last_resumed_at: Option<PrimitiveDateTime>,
    pub(crate) time_limit_seconds: Option<i32>,
}

impl SessionClock {
    pub(crate) fn of(session: &StudySession) -> Self {
        Self {
            elapsed_seconds: session.elapsed_seconds,
            last_resumed_at: session.last_resumed_at,
            time_limit_seconds: session.time_limit_seconds,
        }
    }

    pub(crate) fn elapsed_at(&self, now: PrimitiveDateTime) -> i64 {
        let running = self.last_resumed_at.map(|since| seconds_between(since, now)).unwrap_or(0);
        i64::from(self.elapsed_seconds) + running
    }

    pub(crate) fn remaining_at(&self, now: PrimitiveDateTime) -> Option<i64> {
        self.time_limit_seconds.map(|limit| (i64::from(limit) - self.elapsed_at(now)).max(0))
    }

    pub(crate) fn is_expired(&self, now: PrimitiveDateTime) -> bool {
        self.remaining_at(now) == Some(0)
    }

    /// Stops the clock, folding the running span into `elapsed_seconds`.
    pub(crate) fn stopped(self, now: PrimitiveDateTime) -> Self {
        let elapsed = self.elapsed_at(now);
        let elapsed = match self.time_limit_seconds {
            Some(limit) => elapsed.min(i64::from(limit)),
            None => elapsed,
        };
        Self {
            elapsed_seconds: i32::try_from(elapsed).unwrap_or(i32::MAX),
            last_resumed_at: None,
            ..self
        }
    }

    pub(crate) fn resumed(self, now: PrimitiveDateTime) -> Self {
        Self { last_resumed_at: Some(now), ..self }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use time::Duration;

    use super::*;

    const START: PrimitiveDateTime = datetime!(2025-03-01 09:00);

    fn running(limit: Option<i32>) -> SessionClock {
        SessionClock { elapsed_seconds: 0, last_resumed_at: Some(START), time_limit_seconds: limit }
    }

    #[test]
    fn time_limit_rules() {
        assert_eq!(normalize_time_limit(SessionMode::Test, Some(30), 300).unwrap(), Some(1800));
        assert_eq!(normalize_time_limit(SessionMode::Study, None, 300).unwrap(), None);
        assert!(normalize_time_limit(SessionMode::Study, Some(10), 300).is_err());
        assert!(normalize_time_limit(SessionMode::Test, Some(0), 300).is_err());
        assert!(normalize_time_limit(SessionMode::Test, Some(301), 300).is_err());
    }

    #[test]
    fn elapsed_and_remaining_while_running() {
        let clock = running(Some(600));
        let now = START + Duration::seconds(90);
        assert_eq!(clock.elapsed_at(now), 90);
        assert_eq!(clock.remaining_at(now), Some(510));
        assert!(!clock.is_expired(now));
        assert!(clock.is_expired(START + Duration::seconds(600)));
    }

    #[test]
    fn pause_freezes_the_clock() {
        let paused = running(Some(600)).stopped(START + Duration::seconds(120));
        assert_eq!(paused.elapsed_seconds, 120);
        assert_eq!(paused.last_resumed_at, None);
        assert_eq!(paused.elapsed_at(START + Duration::hours(5)), 120);

        let resumed = paused.resumed(START + Duration::hours(5));
        assert_eq!(resumed.elapsed_at(START + Duration::hours(5) + Duration::seconds(30)), 150);
    }

    #[test]
    fn stopping_caps_elapsed_at_limit() {
        let stopped = running(Some(60)).stopped(START + Duration::seconds(500));
        assert_eq!(stopped.elapsed_seconds, 60);
    }

    #[test]
    fn untimed_sessions_never_expire() {
        let clock = running(None);
        assert_eq!(clock.remaining_at(START + Duration::days(3)), None);
        assert!(!clock.is_expired(START + Duration::days(3)));
    }
}
