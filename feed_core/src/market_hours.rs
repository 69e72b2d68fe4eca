//! Per-weekday market-hours schedule, with extended-session support.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct DaySession {
    pub open: Option<NaiveTime>,
    pub close: Option<NaiveTime>,
    pub extended_open: Option<NaiveTime>,
    pub extended_close: Option<NaiveTime>,
}

impl DaySession {
    pub fn closed() -> Self {
        DaySession { open: None, close: None, extended_open: None, extended_close: None }
    }

    fn in_session(time: NaiveTime, open: Option<NaiveTime>, close: Option<NaiveTime>) -> bool {
        match (open, close) {
            (Some(open), Some(close)) if close > open => time >= open && time < close,
            (Some(open), Some(close)) => time >= open || time < close,
            (Some(open), None) => time >= open,
            (None, Some(close)) => time < close,
            (None, None) => false,
        }
    }

    pub fn is_trading_time(&self, time: NaiveTime, extended_hours: bool) -> bool {
        if Self::in_session(time, self.open, self.close) {
            return true;
        }
        extended_hours && Self::in_session(time, self.extended_open, self.extended_close)
    }
}

#[derive(Clone, Debug)]
pub struct TradingHours {
    pub timezone: Tz,
    pub sunday: DaySession,
    pub monday: DaySession,
    pub tuesday: DaySession,
    pub wednesday: DaySession,
    pub thursday: DaySession,
    pub friday: DaySession,
    pub saturday: DaySession,
    /// Day of week the weekly/Day resolution bar boundary starts on.
    pub week_start: Weekday,
}

impl TradingHours {
    fn session_for(&self, weekday: Weekday) -> &DaySession {
        match weekday {
            Weekday::Sun => &self.sunday,
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
        }
    }

    pub fn is_market_open(&self, current_time_utc: DateTime<Utc>, extended_hours: bool) -> bool {
        let local = current_time_utc.with_timezone(&self.timezone);
        self.session_for(local.weekday()).is_trading_time(local.time(), extended_hours)
    }

    pub fn is_tradable_day(&self, day_utc: DateTime<Utc>) -> bool {
        let local = day_utc.with_timezone(&self.timezone);
        let session = self.session_for(local.weekday());
        session.open.is_some() || session.extended_open.is_some()
    }

    /// Seconds remaining until the close of the current session, or `None`
    /// if the market is not currently open.
    pub fn seconds_until_close(&self, current_time_utc: DateTime<Utc>, extended_hours: bool) -> Option<i64> {
        let local = current_time_utc.with_timezone(&self.timezone);
        let now = local.time();
        let session = self.session_for(local.weekday());
        let close = if extended_hours && session.extended_close.is_some() {
            session.extended_close
        } else {
            session.close
        };
        let open = if extended_hours && session.extended_open.is_some() {
            session.extended_open
        } else {
            session.open
        };

        match (open, close) {
            (Some(open), Some(close)) if close > open => {
                if now >= open && now < close {
                    Some(close.num_seconds_from_midnight() as i64 - now.num_seconds_from_midnight() as i64)
                } else {
                    None
                }
            }
            (Some(open), Some(close)) => {
                if now >= open || now < close {
                    let cur = now.num_seconds_from_midnight() as i64;
                    let close_s = close.num_seconds_from_midnight() as i64;
                    Some(if now < close { close_s - cur } else { (86_400 - cur) + close_s })
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
