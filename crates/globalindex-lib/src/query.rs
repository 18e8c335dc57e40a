//! Route-to-query resolution.
//!
//! Every records endpoint maps to one [`RecordQuery`]. [`resolve`] runs it
//! against the store and decides the outcome:
//!
//! | Query | Empty result | Store failure |
//! |---|---|---|
//! | `All` | `Found([])` | `Failed` |
//! | any filtered query | `NotFound` | `Failed` |
//!
//! The unfiltered listing never reports "not found"; an empty dataset is a
//! valid, empty answer.

use std::time::Duration;

use tracing::{debug, error};

use crate::error::StoreError;
use crate::record::{Record, RecordFilter};
use crate::store::RecordStore;

/// Message returned when a country (or country + indicator) lookup is empty.
pub const RECORD_NOT_FOUND: &str = "Record not found";
/// Message returned when an indicator lookup is empty.
pub const INDICATOR_NOT_FOUND: &str = "Indicator not found";

/// A records lookup, one variant per route shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordQuery {
    All,
    ByCountry(String),
    ByIndicator(String),
    ByCountryAndIndicator { country: String, indicator: String },
}

impl RecordQuery {
    /// The store filter for this query.
    pub fn filter(&self) -> RecordFilter {
        match self {
            RecordQuery::All => RecordFilter::all(),
            RecordQuery::ByCountry(country) => RecordFilter::country(country.as_str()),
            RecordQuery::ByIndicator(indicator) => RecordFilter::indicator(indicator.as_str()),
            RecordQuery::ByCountryAndIndicator { country, indicator } => {
                RecordFilter::country_and_indicator(country.as_str(), indicator.as_str())
            }
        }
    }

    /// Whether the query constrains any field.
    pub fn is_filtered(&self) -> bool {
        !matches!(self, RecordQuery::All)
    }

    /// Body message for an empty filtered result.
    pub fn not_found_message(&self) -> &'static str {
        match self {
            RecordQuery::ByIndicator(_) => INDICATOR_NOT_FOUND,
            _ => RECORD_NOT_FOUND,
        }
    }

    /// Body message for a store failure.
    pub fn error_message(&self) -> &'static str {
        match self {
            RecordQuery::All => "Error fetching records",
            RecordQuery::ByIndicator(_) => "Error fetching indicator",
            RecordQuery::ByCountry(_) | RecordQuery::ByCountryAndIndicator { .. } => {
                "Error fetching record"
            }
        }
    }

    /// Short label for logs and metrics.
    pub fn operation(&self) -> &'static str {
        match self {
            RecordQuery::All => "list_records",
            RecordQuery::ByCountry(_) => "records_by_country",
            RecordQuery::ByIndicator(_) => "records_by_indicator",
            RecordQuery::ByCountryAndIndicator { .. } => "records_by_country_indicator",
        }
    }
}

/// Result of resolving a [`RecordQuery`].
#[derive(Debug)]
pub enum QueryOutcome {
    /// Rows to return with 200.
    Found(Vec<Record>),
    /// A filtered query matched nothing.
    NotFound { message: &'static str },
    /// The store failed; `message` is the client-facing text.
    Failed {
        message: &'static str,
        source: StoreError,
    },
}

impl QueryOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, QueryOutcome::Found(_))
    }
}

/// Run `query` against `store`, bounding the call by `timeout` when given.
///
/// Store errors are logged here with the operation label and never retried.
pub async fn resolve(
    store: &dyn RecordStore,
    query: &RecordQuery,
    timeout: Option<Duration>,
) -> QueryOutcome {
    let filter = query.filter();
    let call = async {
        if filter.is_empty() {
            store.query_all().await
        } else {
            store.query_by_filter(&filter).await
        }
    };

    let result = match timeout {
        Some(after) => match tokio::time::timeout(after, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout { after }),
        },
        None => call.await,
    };

    match result {
        Ok(records) if records.is_empty() && query.is_filtered() => {
            debug!(operation = query.operation(), "no records matched filter");
            QueryOutcome::NotFound {
                message: query.not_found_message(),
            }
        }
        Ok(records) => {
            debug!(
                operation = query.operation(),
                count = records.len(),
                "records resolved"
            );
            QueryOutcome::Found(records)
        }
        Err(source) => {
            error!(
                operation = query.operation(),
                backend = %store.backend(),
                error = %source,
                "{}",
                query.error_message()
            );
            QueryOutcome::Failed {
                message: query.error_message(),
                source,
            }
        }
    }
}
