use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use time::{Date, Time};
use timegrid_app::{ColorPort, Planner, TaskPersistence};
use timegrid_core::clock::{self, format_hhmm};
use timegrid_core::{Billing, Category, Task, TaskId, TaskKind, TaskQuery};
use tracing::info;

use crate::{CategoryArg, Command, LsFormat};

/// Execute a parsed command against the planner, writing human output to `out`.
pub fn run<P, C, W>(command: Command, planner: &mut Planner<P>, colors: &C, out: &mut W) -> Result<()>
where
    P: TaskPersistence,
    C: ColorPort,
    W: Write,
{
    match command {
        Command::New {
            date,
            start,
            end,
            client,
            project,
            quote,
            billed,
            work_type,
            description,
        } => {
            let kind = match (client, work_type) {
                (Some(client), _) => TaskKind::Billable(Billing {
                    client,
                    project: non_blank(project),
                    quote_ref: non_blank(quote),
                    billed,
                }),
                (None, Some(kind)) => TaskKind::non_billable(kind),
                (None, None) => return Err(anyhow!("either --client or --type is required")),
            };
            let mut task = Task::new(parse_date(&date)?, parse_time(&start)?, parse_time(&end)?, kind);
            task.description = non_blank(description);

            let created = planner.create(task).context("Task was not scheduled")?;
            writeln!(
                out,
                "created task: {} ({} {}-{})",
                created.id,
                created.date,
                format_hhmm(created.start),
                format_hhmm(created.end)
            )?;
        }
        Command::Ls {
            week,
            clients,
            types,
            category,
            format,
        } => {
            let query = build_query(week.as_deref(), clients, types, category)?;
            let tasks: Vec<&Task> = planner.store().query(&query).collect();

            if tasks.is_empty() {
                if query.is_empty() {
                    writeln!(out, "No tasks found")?;
                } else {
                    writeln!(out, "No tasks matched the provided filters")?;
                }
                return Ok(());
            }

            match format {
                LsFormat::Table => render_task_table(&tasks, out)?,
                LsFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&tasks)?)?,
            }
        }
        Command::Rm { task } => {
            let id = parse_task_id(&task)?;
            match planner.delete(id) {
                Some(removed) => writeln!(out, "deleted task: {}", removed.id)?,
                None => writeln!(out, "no task with id {id}")?,
            }
        }
        Command::Import { file } => {
            let text = read_text(&file)?;
            let count = planner
                .import_text(&text)
                .with_context(|| format!("Nothing imported from {}", file.display()))?;
            writeln!(out, "imported {count} task(s) from {}", file.display())?;
        }
        Command::Export { file } => {
            let text = planner.export_text()?;
            match file {
                Some(path) => {
                    fs::write(&path, &text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), count = planner.store().len(), "exported tasks");
                    writeln!(out, "exported {} task(s) to {}", planner.store().len(), path.display())?;
                }
                None => writeln!(out, "{text}")?,
            }
        }
        Command::Options => render_options(planner, out)?,
        Command::Colors => render_colors(planner, colors, out)?,
    }

    Ok(())
}

fn build_query(
    week: Option<&str>,
    clients: Vec<String>,
    types: Vec<String>,
    category: Option<CategoryArg>,
) -> Result<TaskQuery> {
    let mut query = match week {
        Some(raw) => TaskQuery::week_of(parse_date(raw)?),
        None => TaskQuery::all(),
    };
    if let Some(category) = category {
        query = query.with_category(match category {
            CategoryArg::Billable => Category::Billable,
            CategoryArg::NonBillable => Category::NonBillable,
        });
    }
    Ok(query.with_clients(clients).with_types(types))
}

fn render_task_table<W: Write>(tasks: &[&Task], out: &mut W) -> Result<()> {
    writeln!(out, "ID | Date | Time | Category | Client/Type | Hours | Description")?;
    writeln!(out, "-- | ---- | ---- | -------- | ----------- | ----- | -----------")?;

    for task in tasks {
        let party = match &task.kind {
            TaskKind::Billable(billing) => billing.project.as_deref().map_or_else(
                || billing.client.clone(),
                |project| format!("{} / {project}", billing.client),
            ),
            TaskKind::NonBillable { kind } => kind.clone(),
        };
        let description = task
            .description
            .as_deref()
            .map_or_else(|| "-".to_owned(), |text| text.replace('\n', " "));

        writeln!(
            out,
            "{} | {} | {}-{} | {} | {} | {} | {}",
            task.id,
            task.date,
            format_hhmm(task.start),
            format_hhmm(task.end),
            task.category(),
            party,
            task.duration_hours(),
            description
        )?;
    }
    Ok(())
}

fn render_options<P: TaskPersistence, W: Write>(planner: &Planner<P>, out: &mut W) -> Result<()> {
    let options = planner.options();
    render_option_list(out, "Clients", &options.clients)?;
    render_option_list(out, "Types", &options.types)?;
    render_option_list(out, "Projects", &options.projects)?;
    render_option_list(out, "Quotes", &options.quotes)
}

fn render_colors<P, C, W>(planner: &Planner<P>, colors: &C, out: &mut W) -> Result<()>
where
    P: TaskPersistence,
    C: ColorPort,
    W: Write,
{
    let clients = planner.options().clients;
    if clients.is_empty() {
        writeln!(out, "No clients found")?;
        return Ok(());
    }
    writeln!(out, "Client | Background | Border | Text")?;
    writeln!(out, "------ | ---------- | ------ | ----")?;
    for client in &clients {
        let card = colors.color_for(client);
        writeln!(out, "{client} | {} | {} | {}", card.background, card.border, card.text)?;
    }
    Ok(())
}

fn render_option_list<'a, W: Write>(
    out: &mut W,
    title: &str,
    values: impl IntoIterator<Item = &'a String>,
) -> Result<()> {
    let values: Vec<&str> = values.into_iter().map(String::as_str).collect();
    let joined = if values.is_empty() {
        "-".to_owned()
    } else {
        values.join(", ")
    };
    writeln!(out, "{title}: {joined}")?;
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn parse_date(raw: &str) -> Result<Date> {
    clock::parse_iso_date(raw).with_context(|| format!("Invalid date (expected YYYY-MM-DD): {raw}"))
}

fn parse_time(raw: &str) -> Result<Time> {
    clock::parse_hhmm(raw).with_context(|| format!("Invalid time (expected HH:MM): {raw}"))
}

fn parse_task_id(raw: &str) -> Result<TaskId> {
    TaskId::from_str(raw).with_context(|| format!("Invalid task id: {raw}"))
}
