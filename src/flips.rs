use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::config::FeeSchedule;
use crate::model::{ItemGroup, Order};

pub fn group_orders(orders: Vec<Order>) -> HashMap<i32, ItemGroup> {
    let mut map: HashMap<i32, ItemGroup> = HashMap::new();

    for order in orders {
        let group = map
            .entry(order.type_id)
            .or_insert_with(|| ItemGroup::new(order.type_id));

        if order.is_buy_order {
            group.buy_orders.push(order);
        } else {
            group.sell_orders.push(order);
        }
    }

    map
}

/// Groups orders by item and keeps the items that can be bought from the
/// best buy order and resold under the best sell order at a profit.
pub fn aggregate(orders: Vec<Order>, fees: &FeeSchedule, now: DateTime<Utc>) -> BTreeMap<i32, ItemGroup> {
    let grouped = group_orders(orders);
    let total = grouped.len();

    let mut results = BTreeMap::new();

    for (id, mut group) in grouped {
        if analyze(&mut group, fees, now) {
            results.insert(id, group);
        }
    }

    info!(items = total, profitable = results.len(), "aggregated orders");

    results
}

/// Fills in prices, margin and competition. Returns false when the item is
/// one-sided or not profitable.
pub fn analyze(group: &mut ItemGroup, fees: &FeeSchedule, now: DateTime<Utc>) -> bool {
    if group.buy_orders.is_empty() || group.sell_orders.is_empty() {
        return false;
    }

    let buy_price = group
        .buy_orders
        .iter()
        .map(|o| o.price)
        .fold(f64::NEG_INFINITY, f64::max);
    let sell_price = group
        .sell_orders
        .iter()
        .map(|o| o.price)
        .fold(f64::INFINITY, f64::min);

    let cost = fees.cost(buy_price, sell_price);
    let margin = sell_price - buy_price - cost;

    if margin <= 0.0 {
        return false;
    }

    let yesterday = now - Duration::days(1);

    group.buy_price = buy_price;
    group.sell_price = sell_price;
    group.cost = cost;
    group.margin = margin;
    group.roi = round_tenth(margin / buy_price * 100.0);
    group.buy_competition = competition(&group.buy_orders, yesterday);
    group.sell_competition = competition(&group.sell_orders, yesterday);

    true
}

fn competition(orders: &[Order], since: DateTime<Utc>) -> usize {
    orders.iter().filter(|o| o.issued > since).count()
}

/// Rounds on the exact decimal value, so 70.05 (stored as 70.0499...) goes down.
fn round_tenth(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}
