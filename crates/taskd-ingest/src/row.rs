use taskd_types::{NewTask, ValidationError};

/// Field delimiter for CSV sources.
pub const DEFAULT_DELIMITER: char = ',';

/// Split one record into fields.
///
/// A field that starts with `"` is quoted: it may contain the delimiter or
/// line breaks, and `""` inside it is a literal quote. Text after a closing
/// quote is kept as-is, and an unterminated quote runs to the end of the
/// record.
pub fn split_fields(record: &str, delimiter: char) -> Vec<String> {
    scan(record, delimiter).0
}

/// Whether `record` ends inside a quoted field, i.e. the next physical
/// line belongs to the same record.
pub fn is_open_record(record: &str, delimiter: char) -> bool {
    scan(record, delimiter).1
}

fn scan(record: &str, delimiter: char) -> (Vec<String>, bool) {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = record.chars().peekable();
    let mut in_quotes = false;
    let mut at_field_start = true;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        if c == delimiter {
            fields.push(std::mem::take(&mut field));
            at_field_start = true;
            continue;
        }

        if c == '"' && at_field_start {
            in_quotes = true;
        } else {
            field.push(c);
        }
        at_field_start = false;
    }

    fields.push(field);
    (fields, in_quotes)
}

/// Turn a data row into a task draft.
///
/// The first two fields are the title and description; extra columns are
/// ignored and a missing column counts as empty.
pub fn parse_row(record: &str, delimiter: char) -> Result<NewTask, ValidationError> {
    let mut fields = split_fields(record, delimiter).into_iter();
    let title = fields.next().unwrap_or_default();
    let description = fields.next().unwrap_or_default();
    let draft = NewTask::new(title, description);
    draft.validate()?;
    Ok(draft)
}
