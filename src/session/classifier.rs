use chrono::{DateTime, Datelike, FixedOffset, Offset, TimeZone, Timelike, Utc, Weekday};

use crate::config::WIB_OFFSET_SECS;
use crate::types::{MarketSession, SessionKind, SessionStatus};

/// Fixed UTC+7 offset the exchange schedule is published in.
pub fn wib() -> FixedOffset {
    FixedOffset::east_opt(WIB_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Classify the current wall-clock instant.
pub fn current_session() -> MarketSession {
    classify(&Utc::now())
}

/// Map any instant to exactly one trading session of the Jakarta exchange.
///
/// Windows are half-open on `hour * 100 + minute` in WIB, so every minute
/// of the day lands in one row of the schedule below.
pub fn classify<Tz: TimeZone>(at: &DateTime<Tz>) -> MarketSession {
    let local = at.with_timezone(&wib());

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return session(
            SessionStatus::Closed,
            SessionKind::Weekend,
            "Market closed (weekend)",
            false,
            false,
        );
    }

    let time_val = local.hour() * 100 + local.minute();
    match time_val {
        845..=859 => session(
            SessionStatus::PreOpening,
            SessionKind::PreOpen,
            "Pre-opening (08:45-09:00) - IEP/IEV",
            false,
            true,
        ),
        900..=1129 => session(
            SessionStatus::Open,
            SessionKind::Session1,
            "Session 1 (09:00-11:30)",
            true,
            true,
        ),
        1130..=1329 => session(
            SessionStatus::Break,
            SessionKind::Lunch,
            "Lunch break (11:30-13:30)",
            false,
            false,
        ),
        1330..=1449 => session(
            SessionStatus::Open,
            SessionKind::Session2,
            "Session 2 (13:30-14:50)",
            true,
            true,
        ),
        1450..=1459 => session(
            SessionStatus::PreClosing,
            SessionKind::PreClose,
            "Pre-closing (14:50-15:00) - IEP/IEV",
            false,
            true,
        ),
        1500..=1514 => session(
            SessionStatus::Closing,
            SessionKind::Closing,
            "Random closing (15:00-15:15)",
            true,
            true,
        ),
        _ => session(
            SessionStatus::Closed,
            SessionKind::AfterHours,
            "Market closed",
            false,
            false,
        ),
    }
}

fn session(
    status: SessionStatus,
    kind: SessionKind,
    message: &str,
    can_trade: bool,
    should_update: bool,
) -> MarketSession {
    MarketSession {
        status,
        session: kind,
        message: message.to_string(),
        can_trade,
        should_update,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    /// 2024-06-03 is a Monday.
    fn wib_at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        let naive = NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        wib().from_local_datetime(&naive).unwrap()
    }

    #[test]
    fn monday_morning_is_session_one() {
        let s = classify(&wib_at(3, 9, 15));
        assert_eq!(s.status, SessionStatus::Open);
        assert_eq!(s.session, SessionKind::Session1);
        assert!(s.can_trade);
        assert!(s.should_update);
    }

    #[test]
    fn monday_lunch_is_break() {
        let s = classify(&wib_at(3, 11, 45));
        assert_eq!(s.status, SessionStatus::Break);
        assert_eq!(s.session, SessionKind::Lunch);
        assert!(!s.can_trade);
        assert!(!s.should_update);
    }

    #[test]
    fn saturday_is_weekend_all_day() {
        for hour in [0, 9, 10, 14, 23] {
            let s = classify(&wib_at(8, hour, 0));
            assert_eq!(s.status, SessionStatus::Closed);
            assert_eq!(s.session, SessionKind::Weekend);
            assert!(!s.can_trade);
        }
        assert_eq!(classify(&wib_at(9, 10, 0)).session, SessionKind::Weekend);
    }

    #[test]
    fn window_edges_are_half_open() {
        let cases = [
            ((8, 44), SessionKind::AfterHours),
            ((8, 45), SessionKind::PreOpen),
            ((8, 59), SessionKind::PreOpen),
            ((9, 0), SessionKind::Session1),
            ((11, 29), SessionKind::Session1),
            ((11, 30), SessionKind::Lunch),
            ((13, 29), SessionKind::Lunch),
            ((13, 30), SessionKind::Session2),
            ((14, 49), SessionKind::Session2),
            ((14, 50), SessionKind::PreClose),
            ((14, 59), SessionKind::PreClose),
            ((15, 0), SessionKind::Closing),
            ((15, 14), SessionKind::Closing),
            ((15, 15), SessionKind::AfterHours),
        ];
        for ((h, m), expected) in cases {
            assert_eq!(classify(&wib_at(4, h, m)).session, expected, "{h:02}:{m:02}");
        }
    }

    #[test]
    fn every_minute_of_a_week_maps_to_one_consistent_session() {
        let start = wib_at(3, 0, 0);
        let mut seen_auction = 0;
        for minute in 0..(7 * 24 * 60) {
            let at = start + Duration::minutes(minute);
            let s = classify(&at);
            let weekend = matches!(at.weekday(), Weekday::Sat | Weekday::Sun);
            assert_eq!(s.session == SessionKind::Weekend, weekend);
            let expected_status = match s.session {
                SessionKind::Weekend | SessionKind::AfterHours => SessionStatus::Closed,
                SessionKind::PreOpen => SessionStatus::PreOpening,
                SessionKind::Session1 | SessionKind::Session2 => SessionStatus::Open,
                SessionKind::Lunch => SessionStatus::Break,
                SessionKind::PreClose => SessionStatus::PreClosing,
                SessionKind::Closing => SessionStatus::Closing,
            };
            assert_eq!(s.status, expected_status);
            if s.wants_indicative() {
                seen_auction += 1;
            }
        }
        // 15 pre-open + 10 pre-close minutes on each of five weekdays.
        assert_eq!(seen_auction, 5 * 25);
    }

    #[test]
    fn utc_input_is_shifted_to_jakarta_time() {
        // 02:15 UTC on a Monday is 09:15 WIB.
        let utc = Utc.with_ymd_and_hms(2024, 6, 3, 2, 15, 0).unwrap();
        assert_eq!(classify(&utc).session, SessionKind::Session1);
        // 17:30 UTC Friday is 00:30 WIB Saturday.
        let late = Utc.with_ymd_and_hms(2024, 6, 7, 17, 30, 0).unwrap();
        assert_eq!(classify(&late).session, SessionKind::Weekend);
    }
}
