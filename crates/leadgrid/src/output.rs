//! Output formatting for the CLI.
//!
//! [`OutputMode`] picks between a terminal table and structured data. Text
//! modes render an aligned, width-aware table; structured modes serialize the
//! rows directly.

use std::collections::BTreeSet;

use clap::ValueEnum;
use console::Style;
use leadgrid_seeker::{
    pipeline_progress, FieldKey, Lead, Milestone, Seekable, ViewRow,
};
use serde::Serialize;
use thiserror::Error;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// How command output is rendered. Value of the `--output` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// Styled table on a terminal, plain table otherwise
    #[default]
    Auto,
    /// Always style the table
    Term,
    /// Never style the table
    Text,
    Json,
    Yaml,
    Csv,
}

impl OutputMode {
    /// Returns true for JSON, YAML and CSV.
    pub fn is_structured(self) -> bool {
        matches!(self, OutputMode::Json | OutputMode::Yaml | OutputMode::Csv)
    }

    /// Resolves `Auto` to `Term` or `Text` by checking stdout.
    pub fn resolve_auto(self) -> OutputMode {
        match self {
            OutputMode::Auto if console::Term::stdout().features().is_attended() => {
                OutputMode::Term
            }
            OutputMode::Auto => OutputMode::Text,
            other => other,
        }
    }

    fn styled(self) -> bool {
        self.resolve_auto() == OutputMode::Term
    }
}

// ============================================================================
// Structured output
// ============================================================================

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(String),

    #[error("not a structured output mode")]
    NotStructured,
}

/// Serializes data to the given structured format.
pub fn serialize_structured<T: Serialize>(
    data: &T,
    mode: OutputMode,
) -> Result<String, SerializeError> {
    match mode {
        OutputMode::Json => Ok(serde_json::to_string_pretty(data)? + "\n"),
        OutputMode::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputMode::Csv => flatten_json_to_csv(&serde_json::to_value(data)?),
        _ => Err(SerializeError::NotStructured),
    }
}

/// Flattens JSON data to CSV.
///
/// An array of objects becomes one row per object, with a header built from
/// every key seen, in first-seen order. A single object becomes `key,value`
/// pairs.
fn flatten_json_to_csv(value: &serde_json::Value) -> Result<String, SerializeError> {
    use serde_json::Value;

    let csv_err = |e: csv::Error| SerializeError::Csv(e.to_string());
    let mut wtr = csv::Writer::from_writer(vec![]);

    match value {
        Value::Array(arr) if arr.iter().all(Value::is_object) => {
            let mut seen = BTreeSet::new();
            let mut headers: Vec<&str> = Vec::new();
            for key in arr.iter().filter_map(Value::as_object).flat_map(|o| o.keys()) {
                if seen.insert(key.as_str()) {
                    headers.push(key);
                }
            }
            if !headers.is_empty() {
                wtr.write_record(&headers).map_err(csv_err)?;
            }
            for obj in arr.iter().filter_map(Value::as_object) {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| obj.get(*h).map(value_to_string).unwrap_or_default())
                    .collect();
                wtr.write_record(&row).map_err(csv_err)?;
            }
        }
        Value::Array(arr) => {
            wtr.write_record(["value"]).map_err(csv_err)?;
            for item in arr {
                wtr.write_record([value_to_string(item)]).map_err(csv_err)?;
            }
        }
        Value::Object(obj) => {
            wtr.write_record(["key", "value"]).map_err(csv_err)?;
            for (k, v) in obj {
                wtr.write_record([k.as_str(), &value_to_string(v)])
                    .map_err(csv_err)?;
            }
        }
        scalar => {
            wtr.write_record(["value"]).map_err(csv_err)?;
            wtr.write_record([value_to_string(scalar)]).map_err(csv_err)?;
        }
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| SerializeError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| SerializeError::Csv(e.to_string()))
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

// ============================================================================
// Text helpers
// ============================================================================

/// Truncates `s` to at most `max_width` terminal columns, ending in `…` when
/// anything was cut.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let limit = max_width.saturating_sub(1);
    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > limit {
            break;
        }
        out.push(c);
        width += w;
    }
    if max_width > 0 {
        out.push('…');
    }
    out
}

/// Pads `s` with spaces to `width` columns.
fn pad_to_width(s: &str, width: usize) -> String {
    let mut out = s.to_string();
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(s.width())));
    out
}

/// One milestone marker per funnel stage: `●` complete, `·` not.
pub fn pipeline_bar<T: Seekable>(item: &T) -> String {
    pipeline_progress(item)
        .iter()
        .map(|stage| if stage.completed { '●' } else { '·' })
        .collect()
}

/// Date part of a stored timestamp, or `-`.
fn short_date(raw: Option<&str>) -> String {
    match raw {
        Some(raw) if !raw.is_empty() => raw.chars().take(10).collect(),
        _ => "-".to_string(),
    }
}

struct Column {
    header: &'static str,
    max_width: usize,
}

const COLUMNS: [Column; 8] = [
    Column { header: "ID", max_width: 36 },
    Column { header: "NAME", max_width: 24 },
    Column { header: "COMPANY", max_width: 24 },
    Column { header: "STAGE", max_width: 12 },
    Column { header: "PIPELINE", max_width: 8 },
    Column { header: "DEEPEST", max_width: 16 },
    Column { header: "SCORE", max_width: 6 },
    Column { header: "UPDATED", max_width: 10 },
];

fn table_cells(row: &ViewRow<'_, Lead>) -> [String; 8] {
    let lead = row.record;
    [
        lead.id.clone(),
        lead.display_name().into_owned(),
        lead.company.clone().unwrap_or_default(),
        lead.stage.clone().unwrap_or_default(),
        pipeline_bar(lead),
        row.deepest_stage
            .map(Milestone::label)
            .unwrap_or("-")
            .to_string(),
        lead.lead_score.map(|s| s.to_string()).unwrap_or_default(),
        short_date(lead.updated_at.as_deref()),
    ]
}

// ============================================================================
// Renderers
// ============================================================================

/// Renders view rows as a table or structured data.
pub fn render_rows(rows: &[ViewRow<'_, Lead>], mode: OutputMode) -> Result<String, SerializeError> {
    if mode.is_structured() {
        return serialize_structured(&rows, mode);
    }

    let header_style = Style::new().bold().force_styling(mode.styled());
    let bar_style = Style::new().green().force_styling(mode.styled());

    let cells: Vec<[String; 8]> = rows
        .iter()
        .map(|row| {
            let mut cells = table_cells(row);
            for (cell, column) in cells.iter_mut().zip(&COLUMNS) {
                *cell = truncate_to_width(cell, column.max_width);
            }
            cells
        })
        .collect();
    let widths: Vec<usize> = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|row| row[i].width())
                .chain([column.header.width()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = COLUMNS
        .iter()
        .zip(&widths)
        .map(|(column, &w)| header_style.apply_to(pad_to_width(column.header, w)).to_string())
        .collect();
    out.push_str(header.join("  ").trim_end());
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, &w))| {
                let padded = pad_to_width(cell, w);
                if COLUMNS[i].header == "PIPELINE" {
                    bar_style.apply_to(padded).to_string()
                } else {
                    padded
                }
            })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }

    let noun = if rows.len() == 1 { "lead" } else { "leads" };
    out.push_str(&format!("{} {noun}\n", rows.len()));
    Ok(out)
}

/// Renders one lead with every filled-in field and its pipeline progress.
pub fn render_lead(lead: &Lead, mode: OutputMode) -> Result<String, SerializeError> {
    if mode.is_structured() {
        return serialize_structured(&ViewRow::new(lead), mode);
    }

    let label_style = Style::new().bold().force_styling(mode.styled());
    let done_style = Style::new().green().force_styling(mode.styled());

    let fields: Vec<(FieldKey, String)> = FieldKey::all()
        .into_iter()
        .filter(|key| !matches!(key, FieldKey::Milestone(_) | FieldKey::MilestoneAt(_)))
        .map(|key| (key, key.value(lead).to_text().into_owned()))
        .filter(|(_, text)| !text.is_empty())
        .collect();
    let label_width = fields
        .iter()
        .map(|(key, _)| key.as_str().width())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (key, text) in &fields {
        let label = pad_to_width(key.as_str(), label_width);
        out.push_str(&format!("{}  {text}\n", label_style.apply_to(label)));
    }

    out.push('\n');
    out.push_str(&format!("{}\n", label_style.apply_to("pipeline")));
    for stage in pipeline_progress(lead) {
        let marker = if stage.completed {
            done_style.apply_to("●").to_string()
        } else {
            "·".to_string()
        };
        let when = stage
            .completed_at
            .map(|ts| short_date(Some(&ts.to_rfc3339())))
            .unwrap_or_default();
        let line = format!("  {marker} {} {when}", pad_to_width(stage.milestone.label(), 14));
        out.push_str(line.trim_end());
        out.push('\n');
    }
    Ok(out)
}

/// A filterable field and the operators it offers.
#[derive(Debug, Serialize)]
pub struct FieldInfo {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub operators: Vec<&'static str>,
    pub default_operator: &'static str,
}

impl FieldInfo {
    fn of(key: FieldKey) -> Self {
        let field_type = key.field_type();
        FieldInfo {
            name: key.as_str(),
            field_type: field_type.as_str(),
            operators: field_type.operators().iter().map(|op| op.as_str()).collect(),
            default_operator: field_type.default_operator().as_str(),
        }
    }
}

/// Lists every field with its type and operators. The default operator is
/// marked with `*` in text mode.
pub fn render_fields(mode: OutputMode) -> Result<String, SerializeError> {
    let fields: Vec<FieldInfo> = FieldKey::all().into_iter().map(FieldInfo::of).collect();
    if mode.is_structured() {
        return serialize_structured(&fields, mode);
    }

    let header_style = Style::new().bold().force_styling(mode.styled());
    let name_width = fields.iter().map(|f| f.name.width()).max().unwrap_or(0);
    let mut out = String::new();
    for field in &fields {
        let operators: Vec<String> = field
            .operators
            .iter()
            .map(|&op| {
                if op == field.default_operator {
                    format!("{op}*")
                } else {
                    op.to_string()
                }
            })
            .collect();
        out.push_str(&format!(
            "{}  {:<7}  {}\n",
            header_style.apply_to(pad_to_width(field.name, name_width)),
            field.field_type,
            operators.join(" "),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lead(id: &str, name: &str, company: &str) -> Lead {
        Lead {
            full_name: Some(name.into()),
            company: Some(company.into()),
            ..Lead::new(id, format!("{id}@example.test"))
        }
    }

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate_to_width("Hello", 10), "Hello");
        assert_eq!(truncate_to_width("Hello World", 6), "Hello…");
        // CJK characters are two columns wide
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn table_aligns_columns() {
        let leads = vec![lead("1", "Alice", "Acme"), lead("22", "Bob", "Initech")];
        let rows: Vec<_> = leads.iter().map(ViewRow::new).collect();
        let out = render_rows(&rows, OutputMode::Text).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert!(lines[0].starts_with("ID  NAME   COMPANY"));
        assert!(lines[1].starts_with("1   Alice  Acme   "));
        assert!(lines[2].starts_with("22  Bob    Initech"));
        assert_eq!(lines[3], "2 leads");
    }

    #[test]
    fn table_truncates_long_cells() {
        let leads = vec![lead("1", &"x".repeat(40), "Acme")];
        let rows: Vec<_> = leads.iter().map(ViewRow::new).collect();
        let out = render_rows(&rows, OutputMode::Text).unwrap();
        assert!(out.contains(&format!("{}…", "x".repeat(23))));
    }

    #[test]
    fn pipeline_bar_marks_completed_stages() {
        let lead = Lead {
            email_sent: true,
            meeting_booked: true,
            ..Lead::new("1", "x@example.test")
        };
        assert_eq!(pipeline_bar(&lead), "●·●····");
    }

    #[test]
    fn json_rows_carry_deepest_stage() {
        let lead = Lead {
            replied: true,
            ..lead("1", "Alice", "Acme")
        };
        let rows = vec![ViewRow::new(&lead)];
        let out = render_rows(&rows, OutputMode::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["deepest_stage"], json!("replied"));
        assert_eq!(parsed[0]["company"], json!("Acme"));
    }

    #[test]
    fn csv_header_is_union_of_keys() {
        let out = flatten_json_to_csv(&json!([
            {"a": 1, "b": "x"},
            {"a": 2, "c": ["p", "q"]}
        ]))
        .unwrap();
        assert_eq!(out, "a,b,c\n1,x,\n2,,\"p, q\"\n");
    }

    #[test]
    fn csv_single_object_is_key_value() {
        let out = flatten_json_to_csv(&json!({"name": "Ada", "score": null})).unwrap();
        assert_eq!(out, "key,value\nname,Ada\nscore,\n");
    }

    #[test]
    fn show_lists_filled_fields_and_progress() {
        let lead = Lead {
            closed_won: true,
            closed_won_at: Some("2024-06-01T10:00:00Z".into()),
            ..lead("1", "Alice", "Acme")
        };
        let out = render_lead(&lead, OutputMode::Text).unwrap();
        assert!(out.contains("company"));
        assert!(out.contains("Acme"));
        assert!(!out.contains("industry"));
        assert!(out.contains("● Closed won"));
        assert!(out.contains("2024-06-01"));
    }

    #[test]
    fn fields_list_every_key() {
        let out = render_fields(OutputMode::Json).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), FieldKey::all().len());
        let stage = parsed.iter().find(|f| f["name"] == "stage").unwrap();
        assert_eq!(stage["type"], json!("select"));
        assert_eq!(stage["default_operator"], json!("is"));
    }

    #[test]
    fn text_mode_is_not_structured() {
        assert!(matches!(
            serialize_structured(&1, OutputMode::Text),
            Err(SerializeError::NotStructured)
        ));
        assert_eq!(OutputMode::Csv.resolve_auto(), OutputMode::Csv);
    }
}
