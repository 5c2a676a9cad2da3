use serde::Serialize;

use crate::decode::{FieldMapping, FieldRule, Predicate};
use crate::schema::assign;

/// One row of an IMDb `title.basics` dump.
///
/// Values are kept as the raw, validated strings of the dump, `\N` markers included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Title {
    pub tconst: String,
    pub title_type: String,
    pub primary_title: String,
    pub original_title: String,
    pub is_adult: String,
    pub start_year: String,
    pub end_year: String,
    pub runtime_minutes: String,
    pub genres: String,
}

impl Title {
    /// Column names of the dump in positional order.
    pub const COLUMNS: [&'static str; 9] = [
        "tconst",
        "titleType",
        "primaryTitle",
        "originalTitle",
        "isAdult",
        "startYear",
        "endYear",
        "runtimeMinutes",
        "genres",
    ];

    /// Returns the positional mapping of the dump onto [`Title`].
    pub fn mapping() -> FieldMapping<Title> {
        use FieldRule::{Required, Year};

        let [
            tconst,
            title_type,
            primary_title,
            original_title,
            is_adult,
            start_year,
            end_year,
            runtime_minutes,
            genres,
        ] = Self::COLUMNS;

        FieldMapping::<Title>::builder()
            .field(tconst, &[], |t, v| assign(&mut t.tconst, v))
            .field(title_type, &[Required], |t, v| assign(&mut t.title_type, v))
            .field(primary_title, &[Required], |t, v| {
                assign(&mut t.primary_title, v)
            })
            .field(original_title, &[Required], |t, v| {
                assign(&mut t.original_title, v)
            })
            .field(is_adult, &[Required], |t, v| assign(&mut t.is_adult, v))
            .field(start_year, &[Required, Year], |t, v| {
                assign(&mut t.start_year, v)
            })
            .field(end_year, &[Year], |t, v| assign(&mut t.end_year, v))
            .field(runtime_minutes, &[Required], |t, v| {
                assign(&mut t.runtime_minutes, v)
            })
            .field(genres, &[Required], |t, v| assign(&mut t.genres, v))
            .build()
    }
}

/// Predicate matching titles whose primary title equals a given value exactly.
#[derive(Debug, Clone)]
pub struct PrimaryTitleEquals {
    title: String,
}

impl Predicate<Title> for PrimaryTitleEquals {
    fn matches(&self, entity: &Title) -> bool {
        entity.primary_title == self.title
    }
}

/// Returns a predicate matching titles whose primary title is exactly `title`.
pub fn primary_title_equals(title: impl Into<String>) -> PrimaryTitleEquals {
    PrimaryTitleEquals {
        title: title.into(),
    }
}
