//! Desired validity window for one apartment on one day.
//!
//! Precedence, highest first:
//!
//! 1. a stay arriving today (wins over a same-day departure, whatever `now` is)
//! 2. a stay spanning today
//! 3. a stay departing today, only while `now` is before check-out
//! 4. otherwise the code is inactive

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

use keysync_core::{ApartmentId, DesiredWindow, Stay};

/// Stays that touch `today`, sorted by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodayStays<'a> {
    pub arriving: Option<&'a Stay>,
    pub departing: Option<&'a Stay>,
    pub ongoing: Option<&'a Stay>,
    /// Duplicates that lost to another stay in the same role.
    pub ignored: Vec<&'a Stay>,
}

/// Sort `stays` into arriving / departing / ongoing for `today`.
///
/// A stay that both arrives and departs today counts as arriving. When a role
/// has several candidates the one with the latest departure is kept (the first
/// one seen on a tie) and the others go to `ignored`.
pub fn partition(stays: &[Stay], today: NaiveDate) -> TodayStays<'_> {
    let mut out = TodayStays::default();
    for stay in stays {
        let slot = if stay.arrival_date == today {
            &mut out.arriving
        } else if stay.departure_date == today {
            &mut out.departing
        } else if stay.arrival_date < today && today < stay.departure_date {
            &mut out.ongoing
        } else {
            continue;
        };
        match *slot {
            Some(kept) if kept.departure_date >= stay.departure_date => out.ignored.push(stay),
            Some(kept) => {
                out.ignored.push(kept);
                *slot = Some(stay);
            }
            None => *slot = Some(stay),
        }
    }
    out
}

impl TodayStays<'_> {
    /// Apply the precedence rules to an already partitioned day.
    pub fn window(
        &self,
        apartment_id: ApartmentId,
        today: NaiveDate,
        now: NaiveDateTime,
        checkin: NaiveTime,
        checkout: NaiveTime,
    ) -> DesiredWindow {
        if let Some(stay) = self.arriving {
            let (from, until) = bounds(today, stay.departure_date, checkin, checkout);
            return DesiredWindow::active(apartment_id, from, until);
        }
        if let Some(stay) = self.ongoing {
            let (from, until) = bounds(stay.arrival_date, stay.departure_date, checkin, checkout);
            return DesiredWindow::active(apartment_id, from, until);
        }
        if let Some(stay) = self.departing {
            let checkout_today = today.and_time(checkout);
            if now < checkout_today {
                let (from, until) = bounds(stay.arrival_date, today, checkin, checkout);
                return DesiredWindow::active(apartment_id, from, until);
            }
        }
        DesiredWindow::inactive(apartment_id)
    }
}

/// Desired window for `apartment_id` given all of its stays.
pub fn plan(
    apartment_id: ApartmentId,
    stays: &[Stay],
    today: NaiveDate,
    now: NaiveDateTime,
    checkin: NaiveTime,
    checkout: NaiveTime,
) -> DesiredWindow {
    partition(stays, today).window(apartment_id, today, now, checkin, checkout)
}

/// Check-in on `from` to check-out on `until`. A window that would end at or
/// before its start runs over midnight instead.
fn bounds(
    from: NaiveDate,
    until: NaiveDate,
    checkin: NaiveTime,
    checkout: NaiveTime,
) -> (NaiveDateTime, NaiveDateTime) {
    let start = from.and_time(checkin);
    let mut end = until.and_time(checkout);
    if end <= start {
        end = end.checked_add_days(Days::new(1)).unwrap_or(end);
    }
    (start, end)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
