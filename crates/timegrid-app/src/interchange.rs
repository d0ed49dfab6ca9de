//! Semicolon-separated text format for bulk import and export.
//!
//! One header line followed by one record per task. Fields are quoted only
//! when they contain the delimiter, a quote or a line break; an embedded quote
//! is doubled.

use csv::{Position, QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use thiserror::Error;
use time::Time;
use timegrid_core::clock::{self, format_hhmm};
use timegrid_core::{Billing, Category, Task, TaskKind, ValidationError};
use tracing::info;

/// Exact header line of the format.
pub const HEADER: &str =
    "date;start_time;end_time;category;client;project;quote;type;description;duration_h;billed";

/// Number of fields in every record.
pub const FIELD_COUNT: usize = 11;

const DELIMITER: u8 = b';';

/// Failure to render the export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The csv writer failed.
    #[error("failed to write record: {0}")]
    Csv(#[from] csv::Error),
    /// The writer buffer could not be recovered.
    #[error("failed to flush export buffer: {0}")]
    Buffer(String),
    /// Rendered bytes were not UTF-8.
    #[error("export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Why a single record was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineErrorKind {
    /// The record does not have [`FIELD_COUNT`] fields.
    #[error("expected {FIELD_COUNT} fields, found {found}")]
    FieldCount {
        /// Fields actually present.
        found: usize,
    },
    /// The record could not be split into fields.
    #[error("malformed record: {0}")]
    Malformed(String),
    /// `date` is not `YYYY-MM-DD`.
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    Date(String),
    /// A time field is not `HH:MM` on the half hour.
    #[error("invalid {field} {value:?}, expected HH:MM on :00 or :30")]
    Time {
        /// Column name.
        field: &'static str,
        /// Raw value.
        value: String,
    },
    /// `start_time` is not before `end_time`.
    #[error("start_time {start} must be before end_time {end}")]
    Order {
        /// Raw start.
        start: String,
        /// Raw end.
        end: String,
    },
    /// `category` is not a known literal.
    #[error("unknown category {0:?}, expected BILLABLE or NON_BILLABLE")]
    Category(String),
    /// `billed` is neither `yes` nor `no`.
    #[error("invalid billed value {0:?}, expected yes or no")]
    Billed(String),
    /// A required field is missing or a task invariant does not hold.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A rejected record and its physical line number (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct LineError {
    /// Line on which the record starts.
    pub line: u64,
    /// First rule the record violated.
    pub reason: LineErrorKind,
}

/// Import failure. Nothing from the input is applied when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The first non-blank line is not [`HEADER`].
    #[error("unexpected header {found:?}")]
    Header {
        /// The line found instead.
        found: String,
    },
    /// One or more records were rejected.
    #[error("{} line(s) rejected: {}", .0.len(), summarize(.0))]
    Lines(Vec<LineError>),
    /// The input had no data records.
    #[error("nothing to import")]
    Empty,
}

fn summarize(errors: &[LineError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A decoded task with the line its record started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTask {
    /// Physical line number (1-based).
    pub line: u64,
    /// Decoded task with a fresh id.
    pub task: Task,
}

/// Render tasks in `(date, start)` order, header first, without a trailing newline.
///
/// # Errors
/// Only fails if the underlying writer fails, which an in-memory buffer does not.
pub fn export<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Result<String, ExportError> {
    let mut ordered: Vec<&Task> = tasks.into_iter().collect();
    ordered.sort_by_key(|task| (task.date, task.start));

    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(HEADER.split(';'))?;
    for task in &ordered {
        writer.write_record(&encode(task))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Buffer(err.error().to_string()))?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    info!(count = ordered.len(), "exported tasks");
    Ok(text)
}

fn encode(task: &Task) -> [String; FIELD_COUNT] {
    let (client, project, quote, kind, billed) = match &task.kind {
        TaskKind::Billable(billing) => (
            billing.client.clone(),
            billing.project.clone().unwrap_or_default(),
            billing.quote_ref.clone().unwrap_or_default(),
            String::new(),
            if billing.billed { "yes" } else { "no" }.to_owned(),
        ),
        TaskKind::NonBillable { kind } => (
            String::new(),
            String::new(),
            String::new(),
            kind.clone(),
            String::new(),
        ),
    };
    [
        task.date.to_string(),
        format_hhmm(task.start),
        format_hhmm(task.end),
        task.category().as_str().to_owned(),
        client,
        project,
        quote,
        kind,
        task.description.clone().unwrap_or_default(),
        task.duration_hours().to_string(),
        billed,
    ]
}

/// Decode every record, keeping line numbers.
///
/// # Errors
/// - [`ParseError::Header`] when the first non-blank line is not [`HEADER`].
/// - [`ParseError::Lines`] with every rejected record when any record fails.
/// - [`ParseError::Empty`] when there are no records at all.
pub fn parse_records(input: &str) -> Result<Vec<ParsedTask>, ParseError> {
    let (header_line, body) = split_header(input)?;

    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut parsed = Vec::new();
    let mut errors = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => {
                if is_blank(&record) {
                    continue;
                }
                let line = physical_line(header_line, body, record.position());
                match decode(&record) {
                    Ok(task) => parsed.push(ParsedTask { line, task }),
                    Err(reason) => errors.push(LineError { line, reason }),
                }
            }
            Err(err) => {
                let line = physical_line(header_line, body, err.position());
                errors.push(LineError {
                    line,
                    reason: LineErrorKind::Malformed(err.to_string()),
                });
            }
        }
    }

    if !errors.is_empty() {
        return Err(ParseError::Lines(errors));
    }
    if parsed.is_empty() {
        return Err(ParseError::Empty);
    }
    info!(count = parsed.len(), "parsed import");
    Ok(parsed)
}

/// Decode every record into tasks with fresh ids.
///
/// # Errors
/// See [`parse_records`].
pub fn parse(input: &str) -> Result<Vec<Task>, ParseError> {
    Ok(parse_records(input)?
        .into_iter()
        .map(|parsed| parsed.task)
        .collect())
}

/// Locate the header: returns its 1-based line number and the text after it.
fn split_header(input: &str) -> Result<(u64, &str), ParseError> {
    let mut offset = 0;
    for (idx, line) in (1u64..).zip(input.split_inclusive('\n')) {
        offset += line.len();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed != HEADER {
            return Err(ParseError::Header {
                found: trimmed.to_owned(),
            });
        }
        return Ok((idx, input.get(offset..).unwrap_or_default()));
    }
    Err(ParseError::Empty)
}

/// 1-based input line on which a record starts, counted from its byte offset
/// in `body` past any line breaks the reader skipped.
fn physical_line(header_line: u64, body: &str, position: Option<&Position>) -> u64 {
    let offset = position
        .and_then(|pos| usize::try_from(pos.byte()).ok())
        .map_or(0, |byte| byte.min(body.len()));
    let rest = body.get(offset..).unwrap_or_default();
    let start = offset + (rest.len() - rest.trim_start_matches(['\r', '\n']).len());
    let breaks = body
        .as_bytes()
        .get(..start)
        .map_or(0, |bytes| bytes.iter().filter(|&&byte| byte == b'\n').count());
    header_line
        .saturating_add(1)
        .saturating_add(u64::try_from(breaks).unwrap_or(u64::MAX))
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty()) && record.len() <= 1
}

fn decode(record: &StringRecord) -> Result<Task, LineErrorKind> {
    if record.len() != FIELD_COUNT {
        return Err(LineErrorKind::FieldCount { found: record.len() });
    }
    let field = |idx| column(record, idx);

    let date_text = field(0);
    let date = clock::parse_iso_date(date_text).ok_or_else(|| LineErrorKind::Date(date_text.to_owned()))?;

    let start = parse_slot_time("start_time", field(1))?;
    let end = parse_slot_time("end_time", field(2))?;
    if start >= end {
        return Err(LineErrorKind::Order {
            start: field(1).to_owned(),
            end: field(2).to_owned(),
        });
    }

    let category: Category = field(3)
        .parse()
        .map_err(|_| LineErrorKind::Category(field(3).to_owned()))?;

    let kind = match category {
        Category::Billable => {
            let billed = match field(10) {
                "" | "no" => false,
                "yes" => true,
                other => return Err(LineErrorKind::Billed(other.to_owned())),
            };
            if field(4).trim().is_empty() {
                return Err(ValidationError::MissingClient.into());
            }
            TaskKind::Billable(Billing {
                client: field(4).to_owned(),
                project: non_empty(field(5)),
                quote_ref: non_empty(field(6)),
                billed,
            })
        }
        Category::NonBillable => {
            if field(7).trim().is_empty() {
                return Err(ValidationError::MissingType.into());
            }
            TaskKind::non_billable(field(7))
        }
    };

    let task = Task {
        description: non_empty(field(8)),
        ..Task::new(date, start, end, kind)
    };
    task.validate()?;
    Ok(task)
}

/// Field `idx`; the record's outer whitespace is trimmed.
fn column(record: &StringRecord, idx: usize) -> &str {
    let raw = record.get(idx).unwrap_or_default();
    if idx == 0 {
        raw.trim_start()
    } else if idx == FIELD_COUNT - 1 {
        raw.trim_end()
    } else {
        raw
    }
}

fn parse_slot_time(name: &'static str, value: &str) -> Result<Time, LineErrorKind> {
    clock::parse_hhmm(value)
        .filter(|time| clock::is_slot_aligned(*time))
        .ok_or_else(|| LineErrorKind::Time {
            field: name,
            value: value.to_owned(),
        })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_owned())
}
