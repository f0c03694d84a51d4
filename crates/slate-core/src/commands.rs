use std::io::{
  self,
  BufRead,
  Write
};
use std::time::Instant;

use anyhow::anyhow;
use tracing::{
  debug,
  info,
  instrument
};

use crate::cli::Command;
use crate::clock::Clock;
use crate::notice::NoticeBoard;
use crate::render::Renderer;
use crate::storage::SlotStorage;
use crate::store::TaskStore;
use crate::task::Priority;
use crate::view::{
  PriorityFilter,
  SortMode,
  StatusFilter,
  parse_choice
};

const SHELL_HELP: &str = "\
commands:
  add [high|medium|low] TEXT   add a task
  toggle ID                    complete or reopen a task
  delete ID                    remove a task
  filter all|active|completed  choose which tasks to show
  priority all|high|medium|low show only one priority
  sort created|priority        choose the order
  list                         redraw the list
  help                         show this help
  quit                         leave the shell";

/// Resolves a full id or a unique prefix
/// of one.
pub fn resolve_id<S, C>(
  store: &TaskStore<S, C>,
  token: &str
) -> anyhow::Result<String>
where
  S: SlotStorage,
  C: Clock
{
  let token = token.trim();
  if token.is_empty() {
    return Err(anyhow!(
      "task id cannot be empty"
    ));
  }
  if store.get(token).is_some() {
    return Ok(token.to_string());
  }

  let mut matches = store
    .tasks()
    .iter()
    .filter(|task| task.id.starts_with(token));
  let first = matches
    .next()
    .ok_or_else(|| anyhow!("no task matches id {token}"))?;
  if matches.next().is_some() {
    return Err(anyhow!(
      "id prefix {token} is ambiguous"
    ));
  }
  Ok(first.id.clone())
}

#[instrument(skip(store, renderer, command))]
pub fn dispatch<S, C>(
  store: &mut TaskStore<S, C>,
  renderer: &Renderer,
  command: Option<Command>
) -> anyhow::Result<()>
where
  S: SlotStorage,
  C: Clock
{
  let mut out = io::stdout().lock();
  let command =
    command.unwrap_or(Command::List {
      filter:   None,
      priority: None,
      sort:     None
    });

  let result = match command {
    | Command::Add {
      priority,
      text
    } => cmd_add(
      store,
      &mut out,
      &text.join(" "),
      &priority
    ),
    | Command::Toggle {
      id
    } => cmd_toggle(store, &mut out, &id),
    | Command::Delete {
      id
    } => cmd_delete(store, &mut out, &id),
    | Command::List {
      filter,
      priority,
      sort
    } => cmd_list(
      store, renderer, &mut out, filter,
      priority, sort
    ),
    | Command::Count => {
      writeln!(
        out,
        "{}",
        store.active_count()
      )
      .map_err(Into::into)
    }
    | Command::Shell => {
      let stdin = io::stdin().lock();
      run_shell(
        store, renderer, stdin, &mut out
      )
    }
  };

  let mut err_out = io::stderr().lock();
  for warning in store.take_notices() {
    renderer
      .write_warning(&mut err_out, warning)?;
  }
  result
}

#[instrument(skip(store, out, text))]
fn cmd_add<S, C, W>(
  store: &mut TaskStore<S, C>,
  out: &mut W,
  text: &str,
  priority: &str
) -> anyhow::Result<()>
where
  S: SlotStorage,
  C: Clock,
  W: Write
{
  info!("command add");
  if priority.parse::<Priority>().is_err()
  {
    debug!(
      priority,
      "unknown priority; using medium"
    );
  }

  if store.add(text, priority)
    && let Some(task) = store.tasks().first()
  {
    writeln!(out, "Created task {}.", task.id)?;
  }
  Ok(())
}

#[instrument(skip(store, out))]
fn cmd_toggle<S, C, W>(
  store: &mut TaskStore<S, C>,
  out: &mut W,
  token: &str
) -> anyhow::Result<()>
where
  S: SlotStorage,
  C: Clock,
  W: Write
{
  info!("command toggle");
  let id = resolve_id(store, token)?;
  store.toggle(&id);
  if let Some(task) = store.get(&id) {
    let verb = if task.completed {
      "Completed"
    } else {
      "Reopened"
    };
    writeln!(out, "{verb} task {id}.")?;
  }
  Ok(())
}

#[instrument(skip(store, out))]
fn cmd_delete<S, C, W>(
  store: &mut TaskStore<S, C>,
  out: &mut W,
  token: &str
) -> anyhow::Result<()>
where
  S: SlotStorage,
  C: Clock,
  W: Write
{
  info!("command delete");
  let id = resolve_id(store, token)?;
  if store.delete(&id) {
    writeln!(out, "Deleted task {id}.")?;
  }
  Ok(())
}

#[instrument(skip(store, renderer, out))]
fn cmd_list<S, C, W>(
  store: &mut TaskStore<S, C>,
  renderer: &Renderer,
  out: &mut W,
  filter: Option<StatusFilter>,
  priority: Option<PriorityFilter>,
  sort: Option<SortMode>
) -> anyhow::Result<()>
where
  S: SlotStorage,
  C: Clock,
  W: Write
{
  info!("command list");
  if let Some(filter) = filter {
    store.set_filter(filter);
  }
  if let Some(priority) = priority {
    store.set_priority_filter(priority);
  }
  if let Some(sort) = sort {
    store.set_sort(sort);
  }
  render_view(store, renderer, out)
}

fn render_view<S, C, W>(
  store: &TaskStore<S, C>,
  renderer: &Renderer,
  out: &mut W
) -> anyhow::Result<()>
where
  S: SlotStorage,
  C: Clock,
  W: Write
{
  renderer.write_task_table(
    out,
    &store.projected_tasks()
  )?;
  renderer.write_active_count(
    out,
    store.active_count()
  )
}

/// Runs an interactive session until
/// `quit` or end of input.
///
/// Selection state lives only as long as
/// the session. Warnings go through a
/// [`NoticeBoard`] and are shown until
/// they expire or a newer one replaces
/// them.
#[instrument(skip_all)]
pub fn run_shell<S, C, R, W>(
  store: &mut TaskStore<S, C>,
  renderer: &Renderer,
  input: R,
  out: &mut W
) -> anyhow::Result<()>
where
  S: SlotStorage,
  C: Clock,
  R: BufRead,
  W: Write
{
  let mut board = NoticeBoard::new();
  post_notices(store, &mut board);
  draw(store, renderer, &mut board, out)?;
  prompt(out)?;

  for line in input.lines() {
    let line = line?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
      prompt(out)?;
      continue;
    }

    let (word, rest) = trimmed
      .split_once(char::is_whitespace)
      .map(|(w, r)| (w, r.trim()))
      .unwrap_or((trimmed, ""));
    debug!(command = word, "shell command");

    let refresh = match word {
      | "quit" | "exit" => break,
      | "help" => {
        writeln!(out, "{SHELL_HELP}")?;
        false
      }
      | "list" => true,
      | _ => match apply_shell_command(
        store, word, rest
      ) {
        | Ok(refresh) => refresh,
        | Err(err) => {
          writeln!(out, "error: {err:#}")?;
          false
        }
      }
    };

    post_notices(store, &mut board);
    if refresh {
      draw(store, renderer, &mut board, out)?;
    } else if let Some(warning) =
      board.visible(Instant::now())
    {
      renderer.write_warning(out, warning)?;
    }
    prompt(out)?;
  }

  writeln!(out)?;
  Ok(())
}

fn apply_shell_command<S, C>(
  store: &mut TaskStore<S, C>,
  word: &str,
  rest: &str
) -> anyhow::Result<bool>
where
  S: SlotStorage,
  C: Clock
{
  match word {
    | "add" => {
      let (priority, text) =
        split_priority(rest);
      Ok(store.add(text, priority))
    }
    | "toggle" => {
      let id = resolve_id(store, rest)?;
      Ok(store.toggle(&id))
    }
    | "delete" | "rm" => {
      let id = resolve_id(store, rest)?;
      Ok(store.delete(&id))
    }
    | "filter" => {
      Ok(store.set_filter(parse_choice(rest)?))
    }
    | "priority" => {
      Ok(store.set_priority_filter(
        parse_choice(rest)?
      ))
    }
    | "sort" => {
      Ok(store.set_sort(parse_choice(rest)?))
    }
    | other => Err(anyhow!(
      "unknown command {other:?}; try help"
    ))
  }
}

/// `high Buy milk` → (`high`, `Buy milk`);
/// text without a leading priority word
/// gets medium.
fn split_priority(rest: &str) -> (&str, &str) {
  if let Some((first, text)) =
    rest.split_once(char::is_whitespace)
    && first.parse::<Priority>().is_ok()
  {
    return (first, text);
  }
  (Priority::Medium.as_str(), rest)
}

fn post_notices<S, C>(
  store: &mut TaskStore<S, C>,
  board: &mut NoticeBoard
) where
  S: SlotStorage,
  C: Clock
{
  let now = Instant::now();
  for warning in store.take_notices() {
    board.post(warning, now);
  }
}

fn draw<S, C, W>(
  store: &TaskStore<S, C>,
  renderer: &Renderer,
  board: &mut NoticeBoard,
  out: &mut W
) -> anyhow::Result<()>
where
  S: SlotStorage,
  C: Clock,
  W: Write
{
  renderer
    .write_selection(out, &store.selection())?;
  render_view(store, renderer, out)?;
  if let Some(warning) =
    board.visible(Instant::now())
  {
    renderer.write_warning(out, warning)?;
  }
  Ok(())
}

fn prompt<W: Write>(
  out: &mut W
) -> anyhow::Result<()> {
  write!(out, "> ")?;
  out.flush()?;
  Ok(())
}
