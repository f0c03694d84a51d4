use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::clock::Clock;
use crate::notice::Warning;
use crate::persistence::Persistence;
use crate::storage::SlotStorage;
use crate::task::{
  Rejection,
  Task,
  generate_id
};
use crate::view::{
  PriorityFilter,
  Selection,
  SortMode,
  StatusFilter,
  project
};

/// Owns the task collection and the
/// current view selection.
///
/// Every mutating method returns `true`
/// when the view must be redrawn.
/// Successful task mutations are written
/// through to persistence immediately;
/// selection changes are not.
#[derive(Debug)]
pub struct TaskStore<S, C> {
  persistence: Persistence<S>,
  clock:       C,
  tasks:       Vec<Task>,
  selection:   Selection,
  notices:     Vec<Warning>,
  revision:    u64
}

impl<S: SlotStorage, C: Clock>
  TaskStore<S, C>
{
  /// Loads the stored collection. Load
  /// problems are queued as notices and
  /// leave the store empty.
  #[instrument(skip_all)]
  pub fn open(
    mut persistence: Persistence<S>,
    clock: C
  ) -> Self {
    let mut notices = Vec::new();
    let tasks = match persistence
      .load(clock.now_millis())
    {
      | Ok(tasks) => tasks,
      | Err(warning) => {
        notices.push(warning);
        vec![]
      }
    };

    info!(
      count = tasks.len(),
      storage_available =
        persistence.is_available(),
      "opened task store"
    );

    Self {
      persistence,
      clock,
      tasks,
      selection: Selection::default(),
      notices,
      revision: 0
    }
  }

  /// Starts from a different selection
  /// without signalling a refresh.
  pub fn with_selection(
    mut self,
    selection: Selection
  ) -> Self {
    self.selection = selection;
    self
  }

  #[instrument(skip(self, text), fields(len = text.len()))]
  pub fn add(
    &mut self,
    text: &str,
    priority: &str
  ) -> bool {
    let mut task = match Task::new_pending(
      text,
      priority,
      self.clock.now_millis()
    ) {
      | Ok(task) => task,
      | Err(reason) => {
        debug!(%reason, "rejected new task");
        self.notices.push(match reason {
          | Rejection::TextTooLong => {
            Warning::TextTooLong
          }
          | _ => Warning::EmptyText
        });
        return false;
      }
    };

    while self.get(&task.id).is_some() {
      task.id =
        generate_id(task.created_at);
    }

    info!(id = %task.id, priority = %task.priority, "task added");
    self.tasks.insert(0, task);
    self.save();
    self.refresh()
  }

  #[instrument(skip(self))]
  pub fn toggle(
    &mut self,
    id: &str
  ) -> bool {
    let Some(task) = self
      .tasks
      .iter_mut()
      .find(|task| task.id == id)
    else {
      debug!("toggle of unknown id");
      return false;
    };

    task.completed = !task.completed;
    info!(
      completed = task.completed,
      "task toggled"
    );
    self.save();
    self.refresh()
  }

  #[instrument(skip(self))]
  pub fn delete(
    &mut self,
    id: &str
  ) -> bool {
    let before = self.tasks.len();
    self.tasks.retain(|task| task.id != id);
    if self.tasks.len() == before {
      debug!("delete of unknown id");
      return false;
    }

    info!(
      remaining = self.tasks.len(),
      "task deleted"
    );
    self.save();
    self.refresh()
  }

  pub fn set_filter(
    &mut self,
    filter: StatusFilter
  ) -> bool {
    if self.selection.filter == filter {
      return false;
    }
    debug!(%filter, "status filter changed");
    self.selection.filter = filter;
    self.refresh()
  }

  pub fn set_priority_filter(
    &mut self,
    priority_filter: PriorityFilter
  ) -> bool {
    if self.selection.priority_filter
      == priority_filter
    {
      return false;
    }
    debug!(%priority_filter, "priority filter changed");
    self.selection.priority_filter =
      priority_filter;
    self.refresh()
  }

  pub fn set_sort(
    &mut self,
    sort: SortMode
  ) -> bool {
    if self.selection.sort == sort {
      return false;
    }
    debug!(%sort, "sort mode changed");
    self.selection.sort = sort;
    self.refresh()
  }

  pub fn projected_tasks(
    &self
  ) -> Vec<&Task> {
    project(&self.tasks, &self.selection)
  }

  /// Incomplete tasks across the whole
  /// collection, ignoring the selection.
  pub fn active_count(&self) -> usize {
    self
      .tasks
      .iter()
      .filter(|task| !task.completed)
      .count()
  }

  pub fn selection(&self) -> Selection {
    self.selection
  }

  /// Collection in storage order, newest
  /// first.
  pub fn tasks(&self) -> &[Task] {
    &self.tasks
  }

  pub fn get(
    &self,
    id: &str
  ) -> Option<&Task> {
    self.tasks.iter().find(|task| task.id == id)
  }

  pub fn storage_available(&self) -> bool {
    self.persistence.is_available()
  }

  /// Bumped on every refresh signal.
  pub fn revision(&self) -> u64 {
    self.revision
  }

  /// Drains queued warnings, oldest first.
  pub fn take_notices(
    &mut self
  ) -> Vec<Warning> {
    std::mem::take(&mut self.notices)
  }

  pub fn persistence(
    &self
  ) -> &Persistence<S> {
    &self.persistence
  }

  pub fn persistence_mut(
    &mut self
  ) -> &mut Persistence<S> {
    &mut self.persistence
  }

  fn save(&mut self) {
    if let Err(warning) =
      self.persistence.save(&self.tasks)
    {
      warn!(%warning, "save failed; keeping in-memory state");
      self.notices.push(warning);
    }
  }

  fn refresh(&mut self) -> bool {
    self.revision += 1;
    true
  }
}
