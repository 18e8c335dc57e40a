use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Largest magnitude at which every whole `f64` is an exact integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// One (country, indicator, year) observation.
///
/// The descriptive columns are written by the population routine when the
/// source provides them. They are omitted from JSON output when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[sqlx(default)]
    pub country_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[sqlx(default)]
    pub capital_city: Option<String>,
    pub indicator_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[sqlx(default)]
    pub indicator_name: Option<String>,
    #[serde(deserialize_with = "deserialize_year")]
    pub year: i32,
    #[serde(serialize_with = "serialize_value")]
    pub value: Option<f64>,
}

impl Record {
    /// Build a record carrying only the four core fields.
    pub fn new(
        country_code: impl Into<String>,
        indicator_code: impl Into<String>,
        year: i32,
        value: Option<f64>,
    ) -> Self {
        Self {
            country_code: country_code.into(),
            country_name: None,
            capital_city: None,
            indicator_code: indicator_code.into(),
            indicator_name: None,
            year,
            value,
        }
    }

    /// Whether this record satisfies every equality in `filter`.
    pub fn matches(&self, filter: &RecordFilter) -> bool {
        filter.conditions().all(|(field, value)| match field {
            RecordField::CountryCode => self.country_code == value,
            RecordField::IndicatorCode => self.indicator_code == value,
        })
    }
}

// Whole numbers are written without a fractional part.
fn serialize_value<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match *value {
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_EXACT_INTEGER => {
            serializer.serialize_i64(v as i64)
        }
        Some(v) => serializer.serialize_f64(v),
        None => serializer.serialize_none(),
    }
}

// Document stores may hold the year as a double.
fn deserialize_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    struct YearVisitor;

    impl Visitor<'_> for YearVisitor {
        type Value = i32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a whole-number year")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i32, E> {
            i32::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i32, E> {
            i32::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i32, E> {
            if v.fract() == 0.0 && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) {
                Ok(v as i32)
            } else {
                Err(E::invalid_value(de::Unexpected::Float(v), &self))
            }
        }
    }

    deserializer.deserialize_any(YearVisitor)
}

/// A field that can appear in a [`RecordFilter`].
///
/// Column names are fixed here and never taken from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    CountryCode,
    IndicatorCode,
}

impl RecordField {
    /// Column (or document key) holding this field.
    pub fn column(self) -> &'static str {
        match self {
            RecordField::CountryCode => "country_code",
            RecordField::IndicatorCode => "indicator_code",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Equality predicate over zero, one or two record fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub country_code: Option<String>,
    pub indicator_code: Option<String>,
}

impl RecordFilter {
    /// A filter that matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn country(code: impl Into<String>) -> Self {
        Self {
            country_code: Some(code.into()),
            indicator_code: None,
        }
    }

    pub fn indicator(code: impl Into<String>) -> Self {
        Self {
            country_code: None,
            indicator_code: Some(code.into()),
        }
    }

    pub fn country_and_indicator(country: impl Into<String>, indicator: impl Into<String>) -> Self {
        Self {
            country_code: Some(country.into()),
            indicator_code: Some(indicator.into()),
        }
    }

    /// True when no field is constrained.
    pub fn is_empty(&self) -> bool {
        self.country_code.is_none() && self.indicator_code.is_none()
    }

    /// Constrained fields in a stable order (country before indicator).
    pub fn conditions(&self) -> impl Iterator<Item = (RecordField, &str)> {
        [
            (RecordField::CountryCode, self.country_code.as_deref()),
            (RecordField::IndicatorCode, self.indicator_code.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_record_serializes_without_optional_columns() {
        let record = Record::new("US", "NY.GDP", 2020, Some(21_000_000.0));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "country_code": "US",
                "indicator_code": "NY.GDP",
                "year": 2020,
                "value": 21_000_000
            })
        );
        assert!(serde_json::to_string(&record)
            .unwrap()
            .contains("\"value\":21000000}"));
    }

    #[test]
    fn fractional_value_stays_a_float() {
        let record = Record::new("US", "SP.POP.GROW", 2020, Some(0.35));
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"value\":0.35"));
    }

    #[test]
    fn whole_number_year_as_float_is_accepted() {
        let record: Record = serde_json::from_str(
            r#"{"country_code":"US","indicator_code":"NY.GDP","year":2020.0,"value":1.5}"#,
        )
        .unwrap();
        assert_eq!(record.year, 2020);

        let err = serde_json::from_str::<Record>(
            r#"{"country_code":"US","indicator_code":"NY.GDP","year":2020.5,"value":1.5}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn null_value_is_kept() {
        let record = Record::new("FR", "SP.POP", 2019, None);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"value\":null"));
    }

    #[test]
    fn conditions_are_ordered() {
        let filter = RecordFilter::country_and_indicator("US", "NY.GDP");
        let fields: Vec<_> = filter.conditions().collect();
        assert_eq!(
            fields,
            vec![
                (RecordField::CountryCode, "US"),
                (RecordField::IndicatorCode, "NY.GDP")
            ]
        );
    }

    #[test]
    fn empty_filter_matches_everything() {
        let record = Record::new("US", "NY.GDP", 2020, None);
        assert!(RecordFilter::all().is_empty());
        assert!(record.matches(&RecordFilter::all()));
        assert!(record.matches(&RecordFilter::country("US")));
        assert!(!record.matches(&RecordFilter::country("FR")));
        assert!(!record.matches(&RecordFilter::country_and_indicator("US", "SP.POP")));
    }
}
