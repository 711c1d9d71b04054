//! Row parser for delimited upload payloads.
//!
//! Tokenizes raw text into ordered rows with no domain knowledge
//! beyond the recognized column set. Quoting follows the usual CSV
//! rules: fields may be double-quoted, a doubled quote inside a quoted
//! field is a literal quote, and commas inside quotes do not separate
//! fields.

use super::RowInput;

/// Header cell for the user email column.
pub(super) const USER_EMAIL_COLUMN: &str = "user_email";
/// Header cell for the system name column.
pub(super) const SYSTEM_NAME_COLUMN: &str = "system_name";
/// Header cell for the optional instance name column.
pub(super) const INSTANCE_NAME_COLUMN: &str = "instance_name";
/// Header cell for the access tier name column.
pub(super) const ACCESS_TIER_COLUMN: &str = "access_tier_name";
/// Header cell for the optional notes column.
pub(super) const NOTES_COLUMN: &str = "notes";

const REQUIRED_COLUMNS: &[&str] = &[USER_EMAIL_COLUMN, SYSTEM_NAME_COLUMN, ACCESS_TIER_COLUMN];
const KNOWN_COLUMNS: &[&str] = &[
    USER_EMAIL_COLUMN,
    SYSTEM_NAME_COLUMN,
    INSTANCE_NAME_COLUMN,
    ACCESS_TIER_COLUMN,
    NOTES_COLUMN,
];

/// A parsed data row with its position in the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct NumberedRow {
    /// 1-indexed physical line number in the payload.
    pub row_number: usize,
    /// Recognized columns, trimmed.
    pub input: RowInput,
}

/// A structural defect local to one data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RowError {
    /// 1-indexed physical line number in the payload.
    pub row_number: usize,
    /// Recognized columns as far as the defective row supplied them,
    /// kept so the uploader sees their own text next to the defect.
    pub input: RowInput,
    /// Human-readable description of the defect.
    pub message: String,
}

/// Result of tokenizing one payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(super) struct ParseOutcome {
    /// Parsed data rows in input order.
    pub rows: Vec<NumberedRow>,
    /// Global-fatal defects; non-empty implies zero rows.
    pub batch_errors: Vec<String>,
    /// Row-local defects; the affected rows are excluded from `rows`.
    pub row_errors: Vec<RowError>,
    /// Non-blocking notices such as unrecognized columns.
    pub warnings: Vec<String>,
}

/// Parses raw delimited text into ordered rows.
///
/// Line terminators are normalized, blank lines dropped, and the first
/// remaining line is treated as the header. Rows are numbered by their
/// physical line in the payload so blank lines never shift the numbers
/// the uploader sees. A header missing any required column fails the
/// whole payload with a single error; a data row whose field count
/// does not match the header is excluded with a row-numbered error
/// while parsing continues. Parsing is pure: the same text always
/// yields the same outcome.
pub(super) fn parse(raw_text: &str) -> ParseOutcome {
    let normalized = raw_text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<(usize, &str)> = normalized
        .split('\n')
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();

    let mut outcome = ParseOutcome::default();

    let Some(((_, header_line), data_lines)) = lines.split_first() else {
        return outcome;
    };

    let header: Vec<String> = split_record(header_line)
        .iter()
        .map(|cell| cell.trim().to_lowercase())
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !header.iter().any(|cell| cell == required))
        .collect();
    if !missing.is_empty() {
        outcome.batch_errors.push(format!(
            "missing required column(s): {}",
            missing.join(", ")
        ));
        return outcome;
    }

    for cell in &header {
        if !KNOWN_COLUMNS.contains(&cell.as_str()) {
            outcome
                .warnings
                .push(format!("unknown column '{cell}' ignored"));
        }
    }

    let column_position = |name: &str| header.iter().position(|cell| cell == name);
    let user_position = column_position(USER_EMAIL_COLUMN);
    let system_position = column_position(SYSTEM_NAME_COLUMN);
    let instance_position = column_position(INSTANCE_NAME_COLUMN);
    let tier_position = column_position(ACCESS_TIER_COLUMN);
    let notes_position = column_position(NOTES_COLUMN);

    for &(row_number, line) in data_lines {
        let fields = split_record(line);

        let required_field = |position: Option<usize>| {
            position
                .and_then(|index| fields.get(index))
                .map(|value| value.trim().to_owned())
                .unwrap_or_default()
        };
        let optional_field = |position: Option<usize>| {
            position
                .and_then(|index| fields.get(index))
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };

        let input = RowInput {
            user_email: required_field(user_position),
            system_name: required_field(system_position),
            instance_name: optional_field(instance_position),
            access_tier_name: required_field(tier_position),
            notes: optional_field(notes_position),
        };

        if fields.len() != header.len() {
            outcome.row_errors.push(RowError {
                row_number,
                input,
                message: format!(
                    "row {row_number}: expected {} field(s), found {}",
                    header.len(),
                    fields.len()
                ),
            });
            continue;
        }

        outcome.rows.push(NumberedRow { row_number, input });
    }

    outcome
}

/// Splits one line into fields honoring double-quote escaping.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut characters = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(character) = characters.next() {
        if in_quotes {
            if character == '"' {
                if characters.peek() == Some(&'"') {
                    current.push('"');
                    characters.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(character);
            }
        } else {
            match character {
                '"' => in_quotes = true,
                ',' => {
                    fields.push(std::mem::take(&mut current));
                }
                _ => current.push(character),
            }
        }
    }

    fields.push(current);
    fields
}
