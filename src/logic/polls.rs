//! Opening polls and finding the one currently taking votes.

use chrono::{DateTime, Datelike, Duration, NaiveDate, SubsecRound, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};
use crate::model::{
    api::CreatePollRequest,
    db::{NewPoll, Poll},
};
use crate::store::Store;

/// Hour of the default voting deadline, local time on the match day.
pub const DEFAULT_DEADLINE_HOUR: u32 = 10;

/// Open a new poll. Missing dates default to the next Saturday in `zone`, and
/// a missing deadline to 10:00 on the poll date in `zone`.
pub async fn create(
    store: &dyn Store,
    request: &CreatePollRequest,
    zone: &Tz,
    now: DateTime<Utc>,
) -> Result<Poll> {
    let poll_date = match present(&request.poll_date) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| Error::bad_request("invalid pollDate, use YYYY-MM-DD"))?,
        None => next_saturday(now.with_timezone(zone).date_naive()),
    };
    let ends_at = match present(&request.ends_at) {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|_| Error::bad_request("invalid endsAt, use RFC 3339"))?
            .with_timezone(&Utc),
        None => default_deadline(poll_date, zone),
    };

    let now = now.trunc_subsecs(3);
    let poll = store.insert_poll(&NewPoll::new(poll_date, ends_at, now)).await?;
    info!("Opened poll {} for {}", poll.id, poll.poll_date);
    Ok(poll)
}

/// The poll that is OPEN and whose deadline has not passed.
pub async fn current(store: &dyn Store, now: DateTime<Utc>) -> Result<Poll> {
    store
        .current_poll(now)
        .await?
        .ok_or_else(|| Error::not_found("open poll"))
}

/// The first Saturday strictly after `today`.
pub fn next_saturday(today: NaiveDate) -> NaiveDate {
    let saturday = 6;
    let days = match (saturday + 7 - today.weekday().num_days_from_sunday()) % 7 {
        0 => 7,
        days => days,
    };
    today + Duration::days(days.into())
}

/// 10:00 on `date` in `zone`, following daylight saving time.
pub fn default_deadline(date: NaiveDate, zone: &Tz) -> DateTime<Utc> {
    let local = date
        .and_hms_opt(DEFAULT_DEADLINE_HOUR, 0, 0)
        .expect("10:00:00 is a valid time");
    // A local time skipped by a clock change resolves to the hour after.
    zone.from_local_datetime(&local)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map_or_else(|| Utc.from_utc_datetime(&local), |deadline| deadline.with_timezone(&Utc))
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
