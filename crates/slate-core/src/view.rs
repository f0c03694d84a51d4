use std::fmt;

use anyhow::anyhow;
use clap::ValueEnum;
use tracing::trace;

use crate::task::{
  Priority,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  ValueEnum,
)]
pub enum StatusFilter {
  #[default]
  All,
  Active,
  Completed
}

impl StatusFilter {
  pub fn matches(self, task: &Task) -> bool {
    match self {
      | Self::All => true,
      | Self::Active => !task.completed,
      | Self::Completed => task.completed
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  ValueEnum,
)]
pub enum PriorityFilter {
  #[default]
  All,
  High,
  Medium,
  Low
}

impl PriorityFilter {
  pub fn matches(
    self,
    priority: Priority
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::High => {
        priority == Priority::High
      }
      | Self::Medium => {
        priority == Priority::Medium
      }
      | Self::Low => {
        priority == Priority::Low
      }
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  ValueEnum,
)]
pub enum SortMode {
  /// Newest first.
  #[default]
  #[value(alias = "createdAt")]
  Created,
  /// High before medium before low,
  /// newest first within a rank.
  Priority
}

/// What the user has chosen to look at.
/// Never persisted.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct Selection {
  pub filter:          StatusFilter,
  pub priority_filter: PriorityFilter,
  pub sort:            SortMode
}

/// Derives the displayed list from the
/// collection without touching it.
///
/// The sort is stable, so tasks with equal
/// keys keep collection order.
pub fn project<'a>(
  tasks: &'a [Task],
  selection: &Selection
) -> Vec<&'a Task> {
  let mut out: Vec<&Task> = tasks
    .iter()
    .filter(|task| {
      selection.filter.matches(task)
    })
    .filter(|task| {
      selection
        .priority_filter
        .matches(task.priority)
    })
    .collect();

  match selection.sort {
    | SortMode::Created => {
      out.sort_by(|a, b| {
        b.created_at.cmp(&a.created_at)
      })
    }
    | SortMode::Priority => {
      out.sort_by(|a, b| {
        a.priority
          .rank()
          .cmp(&b.priority.rank())
          .then(
            b.created_at
              .cmp(&a.created_at)
          )
      })
    }
  }

  trace!(
    total = tasks.len(),
    shown = out.len(),
    ?selection,
    "projected tasks"
  );
  out
}

/// Parses a selection value the way the
/// CLI does, ignoring case.
pub fn parse_choice<T: ValueEnum>(
  raw: &str
) -> anyhow::Result<T> {
  T::from_str(raw.trim(), true).map_err(
    |_| {
      let allowed = T::value_variants()
        .iter()
        .filter_map(|v| {
          v.to_possible_value()
        })
        .map(|v| v.get_name().to_string())
        .collect::<Vec<_>>()
        .join(", ");
      anyhow!(
        "invalid value {raw:?}; expected \
         one of: {allowed}"
      )
    }
  )
}

macro_rules! display_as_value {
  ($($ty:ty),*) => {
    $(
      impl fmt::Display for $ty {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
          match self.to_possible_value() {
            | Some(value) => f.write_str(value.get_name()),
            | None => write!(f, "{self:?}")
          }
        }
      }
    )*
  };
}

display_as_value!(
  StatusFilter,
  PriorityFilter,
  SortMode
);
