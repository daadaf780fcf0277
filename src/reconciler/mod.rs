//! Unified per-SKU record set, merged from extraction outcomes in any order

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::models::{ExtractionOutcome, Price, PriceEntry, ProductRecord, UnifiedRow};

/// Owns every [`ProductRecord`] for a run, keyed by SKU and kept in first-seen order
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    competitors: Vec<String>,
    records: Vec<ProductRecord>,
    index: HashMap<String, usize>,
}

impl Reconciler {
    /// `competitors` fixes the column and row order of every export
    pub fn new(competitors: Vec<String>) -> Self {
        Self {
            competitors,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn competitors(&self) -> &[String] {
        &self.competitors
    }

    /// Make sure a record exists for `sku`, without touching any competitor entry
    pub fn seed(&mut self, sku: &str, my_price: Option<Price>) {
        self.record_mut(sku, my_price);
    }

    /// Insert or replace one competitor's entry for `sku`
    pub fn upsert(
        &mut self,
        sku: &str,
        my_price: Option<Price>,
        competitor: &str,
        entry: PriceEntry,
    ) {
        let record = self.record_mut(sku, my_price);
        if let Some(previous) = record.competitor_prices.insert(competitor.to_string(), entry) {
            debug!(
                "{} - {}: replaced previous {} entry",
                competitor,
                sku,
                previous.status.as_str()
            );
        }
    }

    /// Merge a finished extraction into the record set
    pub fn record(&mut self, outcome: ExtractionOutcome, my_price: Option<Price>) {
        let sku = outcome.sku.clone();
        let competitor = outcome.competitor.clone();
        self.upsert(&sku, my_price, &competitor, outcome.into_entry());
    }

    pub fn get(&self, sku: &str) -> Option<&ProductRecord> {
        self.index.get(sku).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flatten to (SKU × competitor) rows: every SKU for the first competitor, then the next
    pub fn rows(&self) -> Vec<UnifiedRow> {
        self.competitors
            .iter()
            .flat_map(|competitor| {
                self.records
                    .iter()
                    .map(move |record| unified_row(record, competitor))
            })
            .collect()
    }

    fn record_mut(&mut self, sku: &str, my_price: Option<Price>) -> &mut ProductRecord {
        let i = match self.index.get(sku) {
            Some(&i) => i,
            None => {
                self.records.push(ProductRecord::new(sku, my_price));
                self.index.insert(sku.to_string(), self.records.len() - 1);
                self.records.len() - 1
            }
        };

        let record = &mut self.records[i];
        match (record.my_price, my_price) {
            (None, Some(price)) => record.my_price = Some(price),
            (Some(existing), Some(price)) if existing != price => {
                warn!(
                    "{}: ignoring conflicting baseline {} (keeping {})",
                    sku, price, existing
                );
            }
            _ => {}
        }

        record
    }
}

fn unified_row(record: &ProductRecord, competitor: &str) -> UnifiedRow {
    let entry = record.competitor_prices.get(competitor);

    UnifiedRow {
        sku: record.sku.clone(),
        my_price: record.my_price.map(|p| p.to_string()).unwrap_or_default(),
        competitor: competitor.to_string(),
        competitor_price: entry.map(PriceEntry::display_value).unwrap_or_default(),
        competitor_link: entry.map(|e| e.source_link.clone()).unwrap_or_default(),
        comparison: record.comparison(competitor).marker().to_string(),
        status: entry.map(|e| e.status),
    }
}
