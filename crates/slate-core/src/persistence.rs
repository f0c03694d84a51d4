use std::collections::HashSet;

use serde_json::Value;
use tracing::{
  debug,
  info,
  warn
};

use crate::notice::Warning;
use crate::storage::SlotStorage;
use crate::task::{
  Task,
  generate_id
};

pub const DEFAULT_STORAGE_KEY: &str =
  "todo-app-tasks";
const PROBE_KEY: &str =
  "__slate_probe__";

/// Best-effort storage of the whole task
/// collection under one key.
///
/// Failures never escape as errors: each
/// operation reports a [`Warning`] and the
/// caller keeps its in-memory state.
#[derive(Debug)]
pub struct Persistence<S> {
  storage:   S,
  key:       String,
  available: bool
}

impl<S: SlotStorage> Persistence<S> {
  /// Probes the backend by writing and
  /// removing a throwaway key. A failed
  /// probe disables the adapter for its
  /// whole lifetime.
  #[tracing::instrument(skip(storage, key))]
  pub fn open(
    mut storage: S,
    key: impl Into<String>
  ) -> Self {
    let key = key.into();
    let available =
      match probe(&mut storage, &key) {
        | Ok(()) => true,
        | Err(err) => {
          warn!(
            key = %key,
            error = %format!("{err:#}"),
            "storage probe failed; persistence disabled"
          );
          false
        }
      };

    info!(
      key = %key,
      available,
      "opened persistence"
    );
    Self {
      storage,
      key,
      available
    }
  }

  pub fn is_available(&self) -> bool {
    self.available
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  pub fn storage_mut(&mut self) -> &mut S {
    &mut self.storage
  }

  /// Reads and sanitizes the stored
  /// collection.
  ///
  /// `Err` carries the warning to surface;
  /// the caller then starts from an empty
  /// collection. A corrupted payload is
  /// erased before returning.
  #[tracing::instrument(skip(self), fields(key = %self.key))]
  pub fn load(
    &mut self,
    now_ms: i64
  ) -> Result<Vec<Task>, Warning> {
    if !self.available {
      return Err(
        Warning::StorageUnavailable
      );
    }

    let raw = match self
      .storage
      .get_item(&self.key)
    {
      | Ok(Some(raw)) => raw,
      | Ok(None) => return Ok(vec![]),
      | Err(err) => {
        warn!(error = %format!("{err:#}"), "failed reading stored tasks");
        return Err(self.reset());
      }
    };

    if raw.is_empty() {
      return Ok(vec![]);
    }

    let records = match serde_json::from_str::<Value>(&raw) {
      | Ok(Value::Array(records)) => {
        records
      }
      | Ok(other) => {
        warn!(
          kind = json_kind(&other),
          "stored tasks are not an array"
        );
        return Err(self.reset());
      }
      | Err(err) => {
        warn!(error = %err, "stored tasks are not valid json");
        return Err(self.reset());
      }
    };

    let total = records.len();
    let tasks = sanitize_records(
      &records, now_ms
    );
    debug!(
      total,
      kept = tasks.len(),
      "loaded stored tasks"
    );
    Ok(tasks)
  }

  /// Overwrites the stored collection.
  /// A no-op while storage is
  /// unavailable.
  #[tracing::instrument(skip(self, tasks), fields(key = %self.key, count = tasks.len()))]
  pub fn save(
    &mut self,
    tasks: &[Task]
  ) -> Result<(), Warning> {
    if !self.available {
      debug!(
        "storage unavailable; skipping \
         save"
      );
      return Ok(());
    }

    let payload =
      serde_json::to_string(tasks)
        .map_err(|err| {
          warn!(error = %err, "failed serializing tasks");
          Warning::SaveFailed
        })?;

    self
      .storage
      .set_item(&self.key, &payload)
      .map_err(|err| {
        warn!(error = %format!("{err:#}"), "failed writing tasks");
        Warning::SaveFailed
      })?;

    debug!(
      bytes = payload.len(),
      "saved tasks"
    );
    Ok(())
  }

  fn reset(&mut self) -> Warning {
    if let Err(err) =
      self.storage.remove_item(&self.key)
    {
      warn!(error = %format!("{err:#}"), "failed erasing corrupted tasks");
    }
    Warning::StorageCorrupted
  }
}

fn probe<S: SlotStorage>(
  storage: &mut S,
  key: &str
) -> anyhow::Result<()> {
  storage.check_key(key)?;
  storage.set_item(PROBE_KEY, "ok")?;
  storage.remove_item(PROBE_KEY)?;
  Ok(())
}

/// Drops records the sanitizer rejects
/// and re-issues ids that repeat an
/// earlier record's id.
fn sanitize_records(
  records: &[Value],
  now_ms: i64
) -> Vec<Task> {
  let mut seen = HashSet::new();
  let mut tasks =
    Vec::with_capacity(records.len());

  for (idx, record) in
    records.iter().enumerate()
  {
    let mut task =
      match Task::from_value(
        record, now_ms
      ) {
        | Ok(task) => task,
        | Err(reason) => {
          debug!(index = idx, %reason, "discarding stored record");
          continue;
        }
      };

    while seen.contains(&task.id) {
      let fresh = generate_id(now_ms);
      warn!(
        index = idx,
        old = %task.id,
        new = %fresh,
        "duplicate task id; assigning a new one"
      );
      task.id = fresh;
    }

    seen.insert(task.id.clone());
    tasks.push(task);
  }

  tasks
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    | Value::Null => "null",
    | Value::Bool(_) => "bool",
    | Value::Number(_) => "number",
    | Value::String(_) => "string",
    | Value::Array(_) => "array",
    | Value::Object(_) => "object"
  }
}
