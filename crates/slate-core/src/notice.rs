use std::fmt;
use std::time::{
  Duration,
  Instant
};

/// Non-fatal problems surfaced to the user
/// as short-lived messages.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Warning {
  StorageUnavailable,
  StorageCorrupted,
  SaveFailed,
  EmptyText,
  TextTooLong
}

impl Warning {
  pub fn message(self) -> &'static str {
    match self {
      | Self::StorageUnavailable => {
        "Storage is unavailable; changes \
         will not be saved."
      }
      | Self::StorageCorrupted => {
        "Saved data was corrupted and has \
         been reset."
      }
      | Self::SaveFailed => {
        "Failed to save tasks; check \
         available storage."
      }
      | Self::EmptyText => {
        "Cannot add an empty task."
      }
      | Self::TextTooLong => {
        "Tasks must be 200 characters or \
         fewer."
      }
    }
  }

  /// How long the message stays on screen.
  pub fn duration(self) -> Duration {
    let ms = match self {
      | Self::StorageUnavailable => 5_000,
      | Self::StorageCorrupted
      | Self::SaveFailed => 4_000,
      | Self::EmptyText
      | Self::TextTooLong => 2_500
    };
    Duration::from_millis(ms)
  }
}

impl fmt::Display for Warning {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.message())
  }
}

/// Holds the single warning currently on
/// display and expires it after its
/// duration.
///
/// Posting a new warning replaces the old
/// one and restarts the clock, so an older
/// expiry never clears a newer message.
#[derive(Debug, Default)]
pub struct NoticeBoard {
  current: Option<(Warning, Instant)>
}

impl NoticeBoard {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn post(
    &mut self,
    warning: Warning,
    now: Instant
  ) {
    self.current = Some((warning, now));
  }

  pub fn visible(
    &mut self,
    now: Instant
  ) -> Option<Warning> {
    let (warning, posted) =
      self.current?;
    if now.saturating_duration_since(
      posted
    ) >= warning.duration()
    {
      self.current = None;
      return None;
    }
    Some(warning)
  }
}

#[cfg(test)]
mod tests {
  use std::time::{
    Duration,
    Instant
  };

  use super::{
    NoticeBoard,
    Warning
  };

  #[test]
  fn warning_expires_after_its_duration()
  {
    let start = Instant::now();
    let mut board = NoticeBoard::new();
    board.post(
      Warning::EmptyText,
      start
    );

    assert_eq!(
      board.visible(
        start
          + Duration::from_millis(
            2_499
          )
      ),
      Some(Warning::EmptyText)
    );
    assert_eq!(
      board.visible(
        start
          + Duration::from_millis(
            2_500
          )
      ),
      None
    );
  }

  #[test]
  fn newer_warning_restarts_expiry() {
    let start = Instant::now();
    let mut board = NoticeBoard::new();
    board.post(
      Warning::EmptyText,
      start
    );
    board.post(
      Warning::SaveFailed,
      start + Duration::from_secs(2)
    );

    assert_eq!(
      board.visible(
        start + Duration::from_secs(5)
      ),
      Some(Warning::SaveFailed)
    );
    assert_eq!(
      board.visible(
        start + Duration::from_secs(6)
      ),
      None
    );
  }
}
