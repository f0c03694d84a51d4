use std::cell::Cell;

use anyhow::anyhow;
use chrono::{
  DateTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;

/// Source of "now" for task timestamps.
pub trait Clock {
  fn now(&self) -> DateTime<Utc>;

  fn now_millis(&self) -> i64 {
    self.now().timestamp_millis()
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Manually driven clock for tests and
/// replays.
#[derive(Debug, Clone)]
pub struct FixedClock {
  millis: Cell<i64>
}

impl FixedClock {
  pub fn at_millis(millis: i64) -> Self {
    Self {
      millis: Cell::new(millis)
    }
  }

  pub fn advance_millis(
    &self,
    delta: i64
  ) {
    self
      .millis
      .set(self.millis.get() + delta);
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    Utc
      .timestamp_millis_opt(
        self.millis.get()
      )
      .single()
      .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
  }

  fn now_millis(&self) -> i64 {
    self.millis.get()
  }
}

impl<C: Clock + ?Sized> Clock for &C {
  fn now(&self) -> DateTime<Utc> {
    (**self).now()
  }

  fn now_millis(&self) -> i64 {
    (**self).now_millis()
  }
}

/// Parses an IANA zone name such as
/// `Europe/Paris` for the `Created`
/// column.
pub fn parse_timezone(
  raw: &str
) -> anyhow::Result<Tz> {
  let trimmed = raw.trim();
  trimmed.parse::<Tz>().map_err(|err| {
    anyhow!(
      "invalid display.timezone \
       {trimmed:?}: {err}"
    )
  })
}

#[must_use]
pub fn format_created(
  millis: i64,
  tz: &Tz
) -> String {
  match Utc
    .timestamp_millis_opt(millis)
    .single()
  {
    | Some(dt) => dt
      .with_timezone(tz)
      .format("%Y-%m-%d %H:%M")
      .to_string(),
    | None => "-".to_string()
  }
}
