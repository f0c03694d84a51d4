use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::clock::{format_created, parse_timezone};
use crate::config::Config;
use crate::notice::Warning;
use crate::task::{Priority, Task};
use crate::view::Selection;

pub const EMPTY_PLACEHOLDER: &str = "No tasks.";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    tz: Tz,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => io::stdout().is_terminal(),
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        let tz = match cfg.get("display.timezone") {
            Some(raw) => parse_timezone(&raw)?,
            None => chrono_tz::UTC,
        };

        Ok(Self { color, tz })
    }

    pub fn plain() -> Self {
        Self {
            color: false,
            tz: chrono_tz::UTC,
        }
    }

    #[tracing::instrument(skip(self, out, tasks), fields(count = tasks.len()))]
    pub fn write_task_table<W: Write>(&self, out: &mut W, tasks: &[&Task]) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "{EMPTY_PLACEHOLDER}")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Priority".to_string(),
            "Created".to_string(),
            "Text".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = self.paint(&task.id, "33");
            let done = if task.completed { "[x]" } else { "[ ]" }.to_string();
            let priority = self.paint_priority(task.priority);
            let created = format_created(task.created_at, &self.tz);
            let text = if task.completed {
                self.paint(&task.text, "9")
            } else {
                task.text.clone()
            };

            rows.push(vec![id, done, priority, created, text]);
        }

        write_table(out, headers, rows)?;
        Ok(())
    }

    pub fn write_active_count<W: Write>(&self, out: &mut W, count: usize) -> anyhow::Result<()> {
        let noun = if count == 1 { "task" } else { "tasks" };
        writeln!(out, "{count} active {noun}")?;
        Ok(())
    }

    pub fn write_selection<W: Write>(&self, out: &mut W, selection: &Selection) -> anyhow::Result<()> {
        writeln!(
            out,
            "filter: {}  priority: {}  sort: {}",
            selection.filter, selection.priority_filter, selection.sort
        )?;
        Ok(())
    }

    pub fn write_warning<W: Write>(&self, out: &mut W, warning: Warning) -> anyhow::Result<()> {
        writeln!(out, "{} {}", self.paint("warning:", "33"), warning.message())?;
        Ok(())
    }

    fn paint_priority(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::High => "31",
            Priority::Medium => "36",
            Priority::Low => "2",
        };
        self.paint(priority.as_str(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let last = column_count.saturating_sub(1);

    for (idx, header) in headers.iter().enumerate() {
        if idx == last {
            write!(writer, "{header}")?;
        } else {
            write!(writer, "{:width$} ", header, width = widths[idx])?;
        }
    }
    writeln!(writer)?;

    for (idx, width) in widths.iter().enumerate() {
        let sep = if idx == last { "" } else { " " };
        write!(writer, "{:-<width$}{sep}", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if idx == last {
                write!(writer, "{cell}")?;
                continue;
            }
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
