use crate::error::PipelineResult;
use crate::source::RecordSource;
use crate::types::Record;

/// Source yielding rows from any iterator, numbering them from line 1.
///
/// Rows are produced lazily, so very large inputs can be generated on the fly. An `Err` row is
/// surfaced as is, which makes it possible to inject malformed rows or read failures.
#[derive(Debug)]
pub struct MemorySource<I> {
    rows: I,
    line: u64,
}

impl<I> MemorySource<I>
where
    I: Iterator<Item = PipelineResult<Vec<String>>>,
{
    pub fn new(rows: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            rows: rows.into_iter(),
            line: 0,
        }
    }
}

impl MemorySource<std::vec::IntoIter<PipelineResult<Vec<String>>>> {
    /// Creates a source over well-formed rows.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self::new(rows.into_iter().map(Ok).collect::<Vec<_>>())
    }
}

impl<I> RecordSource for MemorySource<I>
where
    I: Iterator<Item = PipelineResult<Vec<String>>> + Send + 'static,
{
    fn next_record(&mut self) -> PipelineResult<Option<Record>> {
        let Some(row) = self.rows.next() else {
            return Ok(None);
        };

        self.line += 1;
        Ok(Some(Record::new(self.line, row?)))
    }
}
