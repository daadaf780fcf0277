//! CSV input binding and CSV exports

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Writer};
use tracing::{debug, info, warn};

use crate::models::{InputRow, Price, UnifiedRow};
use crate::reconciler::Reconciler;
use crate::sites::SiteRegistry;

/// Read the link list from `path`
pub fn read_input(path: impl AsRef<Path>, registry: &SiteRegistry) -> Result<Vec<InputRow>> {
    let path = path.as_ref();
    info!("Reading input links from {}", path.display());

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_rows(file, registry)
}

/// Column 0 is the SKU, column 1 our price, the rest are competitor links.
///
/// A link column is bound to a competitor by its header when the header names a
/// registered site, otherwise each cell is routed by its link's domain. Cells
/// matching no site are ignored.
pub fn read_rows<R: Read>(reader: R, registry: &SiteRegistry) -> Result<Vec<InputRow>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let bound: Vec<Option<String>> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            if i < 2 {
                return None;
            }
            registry.by_name(header).map(|adapter| adapter.name().to_string())
        })
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading input row {}", line + 2))?;

        let sku = record.get(0).unwrap_or_default();
        if sku.is_empty() {
            debug!("Skipping row {} without SKU", line + 2);
            continue;
        }

        rows.push(InputRow {
            sku: sku.to_string(),
            my_price: baseline(sku, record.get(1).unwrap_or_default()),
            links: links(&record, &bound, registry),
        });
    }

    info!("Loaded {} products", rows.len());
    Ok(rows)
}

fn baseline(sku: &str, raw: &str) -> Option<Price> {
    if raw.is_empty() {
        return None;
    }

    let price = Price::parse_amount(raw);
    if price.is_none() {
        warn!("{}: unreadable own price {:?}, treating as missing", sku, raw);
    }
    price
}

fn links(
    record: &StringRecord,
    bound: &[Option<String>],
    registry: &SiteRegistry,
) -> BTreeMap<String, String> {
    record
        .iter()
        .enumerate()
        .skip(2)
        .filter(|(_, cell)| !cell.is_empty())
        .filter_map(|(i, cell)| {
            let competitor = match bound.get(i).cloned().flatten() {
                Some(name) => name,
                None => registry.for_url(cell)?.name().to_string(),
            };
            Some((competitor, cell.to_string()))
        })
        .collect()
}

/// One row per SKU: `SKU, my_price, <C>_price, <C>_link …`
pub fn write_wide_csv(path: impl AsRef<Path>, reconciler: &Reconciler) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_wide(file, reconciler)?;

    info!("Saved {} products to {}", reconciler.len(), path.display());
    Ok(())
}

pub fn write_wide<W: Write>(writer: W, reconciler: &Reconciler) -> Result<()> {
    let mut writer = Writer::from_writer(writer);

    let mut header = vec!["SKU".to_string(), "my_price".to_string()];
    for competitor in reconciler.competitors() {
        header.push(format!("{competitor}_price"));
        header.push(format!("{competitor}_link"));
    }
    writer.write_record(&header)?;

    for record in reconciler.records() {
        let mut row = vec![
            record.sku.clone(),
            record.my_price.map(|p| p.to_string()).unwrap_or_default(),
        ];
        for competitor in reconciler.competitors() {
            match record.competitor_prices.get(competitor) {
                Some(entry) => {
                    row.push(entry.display_value());
                    row.push(entry.source_link.clone());
                }
                None => row.extend([String::new(), String::new()]),
            }
        }
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Flattened (SKU × competitor) rows with the comparison marker
pub fn write_comparison_csv(path: impl AsRef<Path>, rows: &[UnifiedRow]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_comparison(file, rows)?;

    info!("Saved {} comparison rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_comparison<W: Write>(writer: W, rows: &[UnifiedRow]) -> Result<()> {
    let mut writer = Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
