//! S&P credit rating feeds.
//!
//! Two feeds are combined:
//!
//! - the supervisor feed (`companyid`, `rating_date`, `rating`), mapped to
//!   tickers through the company reference;
//! - the Bloomberg "Rating Changes" feed, restricted to long-term foreign
//!   issuer ratings, whose `Curr Rtg` cell holds the rating and an optional
//!   outlook.
//!
//! [`merge_ratings`] concatenates the feeds, sorts them, drops repeated
//! actions and encodes every symbol.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use panel_core::{
    BatchReport, EntityId, EntityObservation, EntityProfile, FieldValue, RatingScale, Result,
    fields, rating::rating_symbol, source::sort_observations,
};

use crate::sheet::RawSheet;
use crate::transform::Transform;

/// Rating type kept from the Bloomberg feed.
pub const LT_FOREIGN_ISSUER: &str = "LT Foreign Issuer Credit";

/// Normalizes a company id written as text or as a float (`1234.0`).
fn company_key(raw: &str) -> String {
    let raw = raw.trim();
    raw.strip_suffix(".0").unwrap_or(raw).to_string()
}

/// The supervisor rating feed.
#[derive(Clone, Debug)]
pub struct SupervisorRatings {
    tickers: HashMap<String, EntityId>,
}

impl SupervisorRatings {
    /// Creates the transform with the company id to ticker map of the company reference.
    #[must_use]
    pub fn new(profiles: &[EntityProfile]) -> Self {
        let tickers = profiles
            .iter()
            .filter_map(|p| {
                p.company_id
                    .as_deref()
                    .map(|id| (company_key(id), p.entity.clone()))
            })
            .collect();
        Self { tickers }
    }
}

impl Transform for SupervisorRatings {
    fn name(&self) -> &str {
        "supervisor"
    }

    fn transform(&self, sheet: &RawSheet) -> Result<Vec<EntityObservation>> {
        let columns = sheet.header_positions(&["companyid", "rating_date", "rating"])?;
        let (id_col, date_col, rating_col) = (columns[0], columns[1], columns[2]);

        let mut observations = Vec::new();
        for (row, _) in sheet.rows_from(1) {
            let (Some(id), Some(raw_date), Some(rating)) = (
                sheet.cell(row, id_col),
                sheet.cell(row, date_col),
                sheet.cell(row, rating_col),
            ) else {
                continue;
            };
            let Some(ticker) = self.tickers.get(&company_key(id)) else {
                continue;
            };
            let Some(date) = sheet.row_date(row, ticker.as_str(), raw_date) else {
                continue;
            };
            observations.push(
                EntityObservation::new(ticker.clone(), date)
                    .with_field(fields::RATING, rating_symbol(rating)),
            );
        }
        debug!(observations = observations.len(), "Read supervisor ratings");
        Ok(observations)
    }
}

/// The Bloomberg "Rating Changes" feed.
#[derive(Clone, Copy, Debug, Default)]
pub struct BloombergRatingChanges;

impl BloombergRatingChanges {
    /// Creates the transform.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Splits `Curr Rtg` into the rating symbol and the outlook, if any.
#[must_use]
pub fn split_current_rating(raw: &str) -> (String, Option<String>) {
    let raw = raw.trim();
    match raw.split_once(char::is_whitespace) {
        Some((rating, outlook)) if !outlook.trim().is_empty() => {
            (rating_symbol(rating), Some(outlook.trim().to_string()))
        }
        _ => (rating_symbol(raw), None),
    }
}

impl Transform for BloombergRatingChanges {
    fn name(&self) -> &str {
        "bloomberg_rating_changes"
    }

    fn transform(&self, sheet: &RawSheet) -> Result<Vec<EntityObservation>> {
        let columns = sheet.header_positions(&["Date", "Curr Rtg", "Security Name", "Rating Type"])?;
        let (date_col, rating_col, name_col, type_col) =
            (columns[0], columns[1], columns[2], columns[3]);

        let mut observations = Vec::new();
        for (row, _) in sheet.rows_from(1) {
            if sheet.cell(row, type_col) != Some(LT_FOREIGN_ISSUER) {
                continue;
            }
            let (Some(raw_date), Some(current), Some(security)) = (
                sheet.cell(row, date_col),
                sheet.cell(row, rating_col),
                sheet.cell(row, name_col),
            ) else {
                continue;
            };
            let Some(date) = sheet.row_date(row, security, raw_date) else {
                continue;
            };
            let (rating, outlook) = split_current_rating(current);
            let mut observation = EntityObservation::new(EntityId::new(security), date)
                .with_field(fields::RATING, rating);
            if let Some(outlook) = outlook {
                observation = observation.with_field(fields::OUTLOOK, outlook);
            }
            observations.push(observation);
        }
        debug!(observations = observations.len(), "Read Bloomberg rating changes");
        Ok(observations)
    }
}

/// Merges rating feeds and encodes the symbols.
///
/// Feeds are concatenated in order and sorted by (entity, date). Actions
/// repeating the same (entity, date, rating) are merged into the first one,
/// which also picks up fields it lacks (the outlook). Every kept row gains
/// [`fields::ORDINAL_RATING`] and, when graded, [`fields::GRADE`]. A symbol
/// outside the scale drops its row and is recorded as a failure of the entity.
#[must_use]
pub fn merge_ratings(
    feeds: Vec<Vec<EntityObservation>>,
    scale: RatingScale,
) -> (Vec<EntityObservation>, BatchReport) {
    let mut all: Vec<EntityObservation> = feeds.into_iter().flatten().collect();
    sort_observations(&mut all);

    let mut merged: Vec<EntityObservation> = Vec::with_capacity(all.len());
    for observation in all {
        if let Some(last) = merged.last_mut() {
            if last.entity == observation.entity
                && last.date == observation.date
                && last.get(fields::RATING) == observation.get(fields::RATING)
            {
                for (name, value) in observation.fields {
                    last.fields.entry(name).or_insert(value);
                }
                continue;
            }
        }
        merged.push(observation);
    }

    let mut report = BatchReport::new();
    let mut encoded = Vec::with_capacity(merged.len());
    let mut failed = BTreeSet::new();
    for mut observation in merged {
        let Some(symbol) = observation.get(fields::RATING).and_then(FieldValue::as_text) else {
            continue;
        };
        match scale.classify(symbol) {
            Ok((ordinal, grade)) => {
                observation
                    .fields
                    .insert(fields::ORDINAL_RATING.to_string(), f64::from(ordinal.value()).into());
                if let Some(grade) = grade {
                    observation
                        .fields
                        .insert(fields::GRADE.to_string(), grade.as_str().into());
                }
                encoded.push(observation);
            }
            Err(e) => {
                failed.insert(observation.entity.clone());
                report.record_failure(observation.entity, e);
            }
        }
    }

    let processed: BTreeSet<&EntityId> = encoded.iter().map(|o| &o.entity).collect();
    for entity in processed {
        if !failed.contains(entity) {
            report.record_processed(entity.clone());
        }
    }
    info!(
        ratings = encoded.len(),
        failed = report.failed.len(),
        "Merged rating feeds"
    );
    (encoded, report)
}
