use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::RecordError;

const ISSUED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub type_id: i32,
    pub price: f64,
    pub is_buy_order: bool,
    pub issued: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    type_id: Option<i32>,
    price: Option<f64>,
    is_buy_order: Option<bool>,
    issued: Option<String>,
}

impl TryFrom<Value> for Order {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let raw: RawOrder = serde_json::from_value(value)?;

        let type_id = raw.type_id.ok_or(RecordError::MissingField("type_id"))?;
        let price = raw.price.ok_or(RecordError::MissingField("price"))?;
        let is_buy_order = raw.is_buy_order.ok_or(RecordError::MissingField("is_buy_order"))?;
        let issued = raw.issued.ok_or(RecordError::MissingField("issued"))?;

        // A zero price would make ROI undefined further down.
        if !price.is_finite() || price <= 0.0 {
            return Err(RecordError::InvalidPrice(price));
        }

        let issued = NaiveDateTime::parse_from_str(&issued, ISSUED_FORMAT)
            .map_err(|_| RecordError::InvalidTimestamp(issued.clone()))?
            .and_utc();

        Ok(Order {
            type_id,
            price,
            is_buy_order,
            issued,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub average: f64,
    pub highest: f64,
    pub lowest: f64,
    pub volume: i64,
}

#[derive(Debug, Deserialize)]
struct RawHistoryPoint {
    date: Option<String>,
    average: Option<f64>,
    highest: Option<f64>,
    lowest: Option<f64>,
    volume: Option<i64>,
}

impl TryFrom<Value> for HistoryPoint {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let raw: RawHistoryPoint = serde_json::from_value(value)?;

        let date = raw.date.ok_or(RecordError::MissingField("date"))?;
        let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .map_err(|_| RecordError::InvalidDate(date.clone()))?;

        let average = finite("average", raw.average)?;
        let highest = finite("highest", raw.highest)?;
        let lowest = finite("lowest", raw.lowest)?;

        let volume = raw.volume.ok_or(RecordError::MissingField("volume"))?;
        if volume < 0 {
            return Err(RecordError::NegativeVolume(volume));
        }

        Ok(HistoryPoint {
            date,
            average,
            highest,
            lowest,
            volume,
        })
    }
}

fn finite(field: &'static str, value: Option<f64>) -> Result<f64, RecordError> {
    let value = value.ok_or(RecordError::MissingField(field))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RecordError::InvalidNumber { field, value })
    }
}

/// Validates every record, keeping the good ones. Returns them with the
/// number of records that were skipped.
pub fn parse_records<T>(records: Vec<Value>) -> (Vec<T>, usize)
where
    T: TryFrom<Value, Error = RecordError>,
{
    let mut parsed = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for record in records {
        match T::try_from(record) {
            Ok(r) => parsed.push(r),
            Err(e) => {
                debug!(error = %e, "skipping malformed record");
                skipped += 1;
            }
        }
    }

    (parsed, skipped)
}

#[derive(Debug, Clone, Default)]
pub struct ItemGroup {
    pub type_id: i32,
    pub buy_orders: Vec<Order>,
    pub sell_orders: Vec<Order>,

    pub buy_price: f64,
    pub sell_price: f64,
    pub cost: f64,
    pub margin: f64,
    pub roi: f64,

    pub buy_competition: usize,
    pub sell_competition: usize,

    // Filled in from market history
    pub avg_volume: f64,
    pub avg_isk_traded: f64,
    pub real_roi_7d: f64,
}

impl ItemGroup {
    pub fn new(type_id: i32) -> Self {
        ItemGroup {
            type_id,
            ..Default::default()
        }
    }
}

/// One report row. Field order is the column order of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(rename = "Item")]
    pub item: String,
    #[serde(rename = "Buy Price")]
    pub buy_price: f64,
    #[serde(rename = "Sell Price")]
    pub sell_price: f64,
    #[serde(rename = "Margin")]
    pub margin: f64,
    #[serde(rename = "ROI")]
    pub roi: f64,
    #[serde(rename = "7d Real ROI")]
    pub real_roi_7d: f64,
    #[serde(rename = "Avg. Volume")]
    pub avg_volume: f64,
    #[serde(rename = "Avg. ISK traded")]
    pub avg_isk_traded: f64,
    #[serde(rename = "Buy Competition")]
    pub buy_competition: usize,
    #[serde(rename = "Sell Competition")]
    pub sell_competition: usize,
}

impl Recommendation {
    pub fn from_group(name: String, group: &ItemGroup) -> Self {
        Recommendation {
            item: name,
            buy_price: group.buy_price,
            sell_price: group.sell_price,
            margin: group.margin,
            roi: group.roi,
            real_roi_7d: group.real_roi_7d,
            avg_volume: group.avg_volume,
            avg_isk_traded: group.avg_isk_traded,
            buy_competition: group.buy_competition,
            sell_competition: group.sell_competition,
        }
    }
}
