/// One row of the source stream as an ordered sequence of string fields.
///
/// A [`Record`] is owned by exactly one stage at a time and is never mutated once it has been
/// handed to a receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: u64,
    fields: Vec<String>,
}

impl Record {
    /// Creates a record read at the 1-based `line` of the source.
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Self { line, fields }
    }

    /// Returns the 1-based line of the source where the record starts.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Returns all fields in source order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns the field at `position`, if present.
    pub fn field(&self, position: usize) -> Option<&str> {
        self.fields.get(position).map(String::as_str)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when the record holds no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the record, returning its fields.
    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }
}
