use rust_xlsxwriter::Workbook;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ReportError;
use crate::model::{ItemGroup, Recommendation};

/// Thresholds an item must clear to be printed as a trade candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterCriteria {
    pub min_roi: f64,
    pub max_roi: f64,
    pub min_real_roi_7d: f64,
    pub min_avg_volume: f64,
    pub min_avg_isk_traded: f64,
    pub max_buy_competition: usize,
    pub max_sell_competition: usize,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        FilterCriteria {
            min_roi: 70.0,
            max_roi: 400.0,
            min_real_roi_7d: 30.0,
            min_avg_volume: 10.0,
            min_avg_isk_traded: 100_000_000.0,
            max_buy_competition: 5,
            max_sell_competition: 5,
        }
    }
}

impl FilterCriteria {
    /// All bounds are exclusive.
    pub fn matches(&self, r: &Recommendation) -> bool {
        r.roi > self.min_roi
            && r.roi < self.max_roi
            && r.real_roi_7d > self.min_real_roi_7d
            && r.avg_volume > self.min_avg_volume
            && r.avg_isk_traded > self.min_avg_isk_traded
            && r.buy_competition < self.max_buy_competition
            && r.sell_competition < self.max_sell_competition
    }
}

/// Names every surviving item. Items missing from the name table are dropped.
pub fn build_recommendations(
    groups: &BTreeMap<i32, ItemGroup>,
    names: &HashMap<String, String>,
) -> Vec<Recommendation> {
    let mut rows = Vec::with_capacity(groups.len());

    for group in groups.values() {
        let name = match names.get(&group.type_id.to_string()) {
            Some(n) => n.clone(),
            None => {
                debug!(type_id = group.type_id, "no name for item, leaving it out");
                continue;
            }
        };

        rows.push(Recommendation::from_group(name, group));
    }

    rows
}

pub fn candidates<'a>(rows: &'a [Recommendation], criteria: &FilterCriteria) -> Vec<&'a Recommendation> {
    rows.iter().filter(|r| criteria.matches(r)).collect()
}

pub fn write_report_to<W: Write>(writer: W, rows: &[Recommendation]) -> Result<(), ReportError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    wtr.write_record(COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    Ok(())
}

pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// One report row in column order.
pub fn row_cells(r: &Recommendation) -> [Cell<'_>; 10] {
    [
        Cell::Text(&r.item),
        Cell::Number(r.buy_price),
        Cell::Number(r.sell_price),
        Cell::Number(r.margin),
        Cell::Number(r.roi),
        Cell::Number(r.real_roi_7d),
        Cell::Number(r.avg_volume),
        Cell::Number(r.avg_isk_traded),
        Cell::Number(r.buy_competition as f64),
        Cell::Number(r.sell_competition as f64),
    ]
}

pub fn build_workbook(rows: &[Recommendation]) -> Result<Workbook, ReportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1")?;

    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }

    for (i, r) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        for (col, cell) in row_cells(r).into_iter().enumerate() {
            match cell {
                Cell::Text(t) => sheet.write_string(row, col as u16, t)?,
                Cell::Number(n) => sheet.write_number(row, col as u16, n)?,
            };
        }
    }

    Ok(workbook)
}

/// Writes a spreadsheet, or CSV when the path ends in `.csv`.
pub fn write_report(path: &Path, rows: &[Recommendation]) -> Result<(), ReportError> {
    let is_csv = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let file = std::fs::File::create(path)?;
        write_report_to(file, rows)?;
    } else {
        build_workbook(rows)?.save(path)?;
    }

    info!(rows = rows.len(), path = %path.display(), "wrote report");
    Ok(())
}

// Written explicitly so an empty report still carries the header row.
const COLUMNS: [&str; 10] = [
    "Item",
    "Buy Price",
    "Sell Price",
    "Margin",
    "ROI",
    "7d Real ROI",
    "Avg. Volume",
    "Avg. ISK traded",
    "Buy Competition",
    "Sell Competition",
];
