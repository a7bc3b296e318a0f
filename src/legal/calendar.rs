use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeDelta, Utc, Weekday};
use serde::Serialize;

use crate::db::{DeadlineRecord, DeadlineStatus};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Where a deadline falls relative to "now", for agenda display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineBucket {
    Completed,
    Overdue,
    Today,
    Tomorrow,
    ThisWeek,
    Upcoming,
}

/// A deadline annotated with its bucket and the time left until it is due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineInfo {
    #[serde(flatten)]
    pub deadline: DeadlineRecord,
    pub bucket: DeadlineBucket,
    pub days_until: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_days_until: Option<i64>,
}

/// Deadlines split into display buckets, each sorted by due date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Agenda {
    pub overdue: Vec<DeadlineInfo>,
    pub today: Vec<DeadlineInfo>,
    pub tomorrow: Vec<DeadlineInfo>,
    pub this_week: Vec<DeadlineInfo>,
    pub upcoming: Vec<DeadlineInfo>,
    pub completed: Vec<DeadlineInfo>,
}

impl Agenda {
    /// Deadlines across every bucket.
    pub fn total(&self) -> usize {
        self.overdue.len()
            + self.today.len()
            + self.tomorrow.len()
            + self.this_week.len()
            + self.upcoming.len()
            + self.completed.len()
    }
}

fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Exactly one bucket per deadline. Checked in order: recorded completion,
/// recorded or elapsed overdue, same local day, next local day, within seven
/// days, later.
pub fn categorize(
    deadline: &DeadlineRecord,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> DeadlineBucket {
    if deadline.status == DeadlineStatus::Completed {
        return DeadlineBucket::Completed;
    }
    if deadline.status == DeadlineStatus::Overdue || deadline.due_date < now {
        return DeadlineBucket::Overdue;
    }

    let today = local_date(now, offset);
    let due_day = local_date(deadline.due_date, offset);
    if due_day == today {
        return DeadlineBucket::Today;
    }
    if today.succ_opt() == Some(due_day) {
        return DeadlineBucket::Tomorrow;
    }
    match TimeDelta::try_days(7).and_then(|week| now.checked_add_signed(week)) {
        Some(week_end) if deadline.due_date < week_end => DeadlineBucket::ThisWeek,
        _ => DeadlineBucket::Upcoming,
    }
}

/// Whole days left until `due`, rounded down. Negative once `due` has passed.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (due - now).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Weekdays (Mon-Fri) after `from` up to and including `to`.
fn weekdays_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let span = (to - from).num_days();
    let full_weeks = span / 7;
    let mut count = full_weeks * 5;
    let mut cursor = from + TimeDelta::days(full_weeks * 7);
    while cursor < to {
        cursor = match cursor.succ_opt() {
            Some(next) => next,
            None => break,
        };
        if !is_weekend(cursor) {
            count += 1;
        }
    }
    count
}

/// Working days between the local dates of `now` and `due`. Negative when
/// the due date lies in the past.
pub fn working_days_until(due: DateTime<Utc>, now: DateTime<Utc>, offset: FixedOffset) -> i64 {
    let today = local_date(now, offset);
    let due_day = local_date(due, offset);
    if due_day >= today {
        weekdays_between(today, due_day)
    } else {
        -weekdays_between(due_day, today)
    }
}

pub fn describe(deadline: DeadlineRecord, now: DateTime<Utc>, offset: FixedOffset) -> DeadlineInfo {
    let bucket = categorize(&deadline, now, offset);
    let days_until = days_until(deadline.due_date, now);
    let working_days_until = deadline
        .is_working_days
        .then(|| working_days_until(deadline.due_date, now, offset));
    DeadlineInfo {
        deadline,
        bucket,
        days_until,
        working_days_until,
    }
}

pub fn build_agenda(
    mut deadlines: Vec<DeadlineRecord>,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Agenda {
    deadlines.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    let mut agenda = Agenda::default();
    for deadline in deadlines {
        let info = describe(deadline, now, offset);
        let slot = match info.bucket {
            DeadlineBucket::Completed => &mut agenda.completed,
            DeadlineBucket::Overdue => &mut agenda.overdue,
            DeadlineBucket::Today => &mut agenda.today,
            DeadlineBucket::Tomorrow => &mut agenda.tomorrow,
            DeadlineBucket::ThisWeek => &mut agenda.this_week,
            DeadlineBucket::Upcoming => &mut agenda.upcoming,
        };
        slot.push(info);
    }
    agenda
}

/// Deadlines whose due date falls on `date` in the practice's local time.
pub fn deadlines_on_date(
    deadlines: Vec<DeadlineRecord>,
    date: NaiveDate,
    offset: FixedOffset,
) -> Vec<DeadlineRecord> {
    let mut matching: Vec<DeadlineRecord> = deadlines
        .into_iter()
        .filter(|deadline| local_date(deadline.due_date, offset) == date)
        .collect();
    matching.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    matching
}
