use std::borrow::Cow;

use chrono::NaiveDate;

use crate::bail;
use crate::error::{ErrorKind, PipelineResult};

/// Marker used by IMDb-style dumps for an absent value.
pub(crate) const NULL_MARKER: &str = "\\N";

/// Date layout accepted by [`FieldRule::Date`], month and day may omit their leading zero.
const DATE_FORMAT: &str = "%m/%d/%Y";

/// Validation or normalization applied to a single field before it is assigned.
///
/// Rules run in declaration order. Apart from [`FieldRule::Required`], rules accept an empty
/// value or the `\N` marker, so optional fields can be left blank or null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// The value must not be empty or blank. The `\N` marker counts as a value.
    Required,
    /// A four digit year.
    Year,
    /// A calendar date in `M/D/YYYY` form.
    Date,
    /// A signed integer.
    Integer,
    /// A finite decimal amount.
    Amount,
    /// Strips double quotes and tabs, then trims surrounding whitespace.
    Sanitize,
}

impl FieldRule {
    /// Applies the rule to `value`, returning the possibly rewritten value.
    pub(crate) fn apply<'a>(
        &self,
        value: Cow<'a, str>,
        field: &str,
        line: u64,
    ) -> PipelineResult<Cow<'a, str>> {
        if let FieldRule::Sanitize = self {
            return Ok(sanitize(value));
        }

        if let FieldRule::Required = self {
            if value.trim().is_empty() {
                bail!(
                    ErrorKind::RequiredFieldMissing,
                    "Required field is empty",
                    format!("field `{field}` at line {line}")
                );
            }
            return Ok(value);
        }

        if is_absent(&value) {
            return Ok(value);
        }

        let valid = match self {
            FieldRule::Required | FieldRule::Sanitize => true,
            FieldRule::Year => value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()),
            FieldRule::Date => NaiveDate::parse_from_str(&value, DATE_FORMAT).is_ok(),
            FieldRule::Integer => value.parse::<i64>().is_ok(),
            FieldRule::Amount => value.parse::<f64>().is_ok_and(f64::is_finite),
        };

        if !valid {
            bail!(
                ErrorKind::InvalidFieldValue,
                "Field value does not match its rule",
                format!("field `{field}` at line {line}: {value:?} is not a valid {self:?}")
            );
        }

        Ok(value)
    }
}

fn is_absent(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == NULL_MARKER
}

fn sanitize(value: Cow<'_, str>) -> Cow<'_, str> {
    if value.contains(['"', '\t']) {
        let stripped: String = value.chars().filter(|c| !matches!(c, '"' | '\t')).collect();
        return Cow::Owned(stripped.trim().to_owned());
    }

    match value {
        Cow::Borrowed(value) => Cow::Borrowed(value.trim()),
        Cow::Owned(value) if value.trim().len() == value.len() => Cow::Owned(value),
        Cow::Owned(value) => Cow::Owned(value.trim().to_owned()),
    }
}
