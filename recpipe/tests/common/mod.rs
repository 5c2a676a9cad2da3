#![allow(dead_code)]

use std::io::Write;
use std::time::Duration;

use recpipe::error::PipelineResult;
use recpipe::schema::Title;
use recpipe::source::MemorySource;
use tempfile::NamedTempFile;

/// Upper bound for a whole run in tests, so a deadlock fails instead of hanging.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(30);

/// Rows generated lazily, for inputs too large to materialize.
pub type LazyRows = Box<dyn Iterator<Item = PipelineResult<Vec<String>>> + Send>;

/// Returns the fields of the `index`-th generated title.
pub fn title_fields(index: usize) -> Vec<String> {
    vec![
        format!("tt{index:07}"),
        "movie".to_string(),
        format!("Title {index}"),
        format!("Original {index}"),
        "0".to_string(),
        (1900 + index % 100).to_string(),
        "\\N".to_string(),
        (60 + index % 90).to_string(),
        "Drama,Comedy".to_string(),
    ]
}

/// Writes a TSV dump with a header and `rows` titles.
///
/// Rows listed in `malformed` (1-based, header excluded) are written with a wrong field count.
pub fn write_titles(rows: usize, malformed: &[usize]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", Title::COLUMNS.join("\t")).unwrap();

    for index in 1..=rows {
        if malformed.contains(&index) {
            writeln!(file, "tt{index:07}\tbroken\trow").unwrap();
        } else {
            writeln!(file, "{}", title_fields(index).join("\t")).unwrap();
        }
    }

    file.flush().unwrap();
    file
}

/// Returns an opener of `count` lazily generated titles.
pub fn lazy_titles(count: usize) -> impl Fn() -> PipelineResult<MemorySource<LazyRows>> {
    move || {
        let rows: LazyRows = Box::new((1..=count).map(|index| Ok(title_fields(index))));
        Ok(MemorySource::new(rows))
    }
}
