//! Locates per-product blocks in a month sheet.
//!
//! A product occupies a block of rows: the first carries the product name
//! in the `funil` column, and each row's `periodo` label says whether it is
//! a historical week ("Semana 1") or the month projection ("Tendência").
//! The standard sheet uses five rows per product, four weeks plus a trend.

use crate::columns::{ColumnSchema, Field};
use crate::decoder::{cell, decode_row, RawRow};
use crate::schema::{ProductDataset, WeeklyMetrics};
use log::debug;
use serde::{Deserialize, Serialize};

/// Rows per product block in the standard sheet.
pub const BLOCK_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Week,
    Trend,
    Ignored,
}

/// Classifies a period label. Trend labels win over week labels.
pub fn classify_period(label: Option<&str>) -> RowKind {
    let Some(label) = label else {
        return RowKind::Ignored;
    };

    let label = label.to_lowercase();
    if label.contains("tendência") || label.contains("tendencia") {
        RowKind::Trend
    } else if label.contains("semana") {
        RowKind::Week
    } else {
        RowKind::Ignored
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// Always advance exactly [`BLOCK_ROWS`] rows after a product name.
    /// A product with fewer rows pulls the next product's rows into its block.
    #[default]
    FixedStride,
    /// End a block at its trend row, at the next product name, or after
    /// [`BLOCK_ROWS`] rows, whichever comes first.
    Delimited,
}

/// A block as seen by the scanner, before the zero-week filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedBlock {
    pub name: String,
    /// Index of the block's first row in the input.
    pub start_row: usize,
    /// Classification of every row in the block, in input order.
    pub kinds: Vec<RowKind>,
    /// `None` when the block held no week rows.
    pub dataset: Option<ProductDataset>,
}

pub struct BlockScanner<'a> {
    schema: &'a ColumnSchema,
    strategy: ScanStrategy,
}

impl<'a> BlockScanner<'a> {
    pub fn new(schema: &'a ColumnSchema) -> Self {
        Self {
            schema,
            strategy: ScanStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: ScanStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Turns the whole sheet (header included) into product datasets.
    /// Blocks without a week row are dropped; the scan itself never fails.
    pub fn scan(&self, rows: &[RawRow]) -> Vec<ProductDataset> {
        self.scan_blocks(rows)
            .into_iter()
            .filter_map(|block| block.dataset)
            .collect()
    }

    pub fn scan_blocks(&self, rows: &[RawRow]) -> Vec<ScannedBlock> {
        let mut blocks = Vec::new();
        // Row 0 is the header.
        let mut i = 1;

        while i < rows.len() {
            let Some(name) = self.product_name(&rows[i]) else {
                i += 1;
                continue;
            };

            let end = match self.strategy {
                ScanStrategy::FixedStride => (i + BLOCK_ROWS).min(rows.len()),
                ScanStrategy::Delimited => self.delimited_end(rows, i),
            };

            let block = self.collect_block(name, i, &rows[i..end]);
            if block.dataset.is_none() {
                debug!(
                    "Discarding block '{}' at row {}: no week rows among {:?}",
                    block.name, block.start_row, block.kinds
                );
            }
            blocks.push(block);

            i = match self.strategy {
                ScanStrategy::FixedStride => i + BLOCK_ROWS,
                ScanStrategy::Delimited => end,
            };
        }

        blocks
    }

    fn product_name(&self, row: &[String]) -> Option<String> {
        cell(row, self.schema, Field::Funil)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    fn period_kind(&self, row: &[String]) -> RowKind {
        classify_period(cell(row, self.schema, Field::Periodo))
    }

    fn delimited_end(&self, rows: &[RawRow], start: usize) -> usize {
        let mut j = start;
        while j < rows.len() && j - start < BLOCK_ROWS {
            if j > start && self.product_name(&rows[j]).is_some() {
                break;
            }
            let kind = self.period_kind(&rows[j]);
            j += 1;
            if kind == RowKind::Trend {
                break;
            }
        }
        j
    }

    fn collect_block(&self, name: String, start_row: usize, rows: &[RawRow]) -> ScannedBlock {
        let mut kinds = Vec::with_capacity(rows.len());
        let mut weeks: Vec<WeeklyMetrics> = Vec::new();
        let mut tendencia = None;

        for row in rows {
            let kind = self.period_kind(row);
            match kind {
                RowKind::Week => weeks.push(decode_row(row, self.schema)),
                // A repeated trend row replaces the earlier one.
                RowKind::Trend => tendencia = Some(decode_row(row, self.schema)),
                RowKind::Ignored => {}
            }
            kinds.push(kind);
        }

        let dataset = if weeks.is_empty() {
            None
        } else {
            Some(ProductDataset::new(name.clone(), weeks, tendencia))
        };

        ScannedBlock {
            name,
            start_row,
            kinds,
            dataset,
        }
    }
}

/// Scans with the standard layout and fixed stride.
pub fn scan(rows: &[RawRow]) -> Vec<ProductDataset> {
    let schema = ColumnSchema::standard();
    BlockScanner::new(&schema).scan(rows)
}
