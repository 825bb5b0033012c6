use std::collections::{BTreeMap, BTreeSet};

use formats::records::TransactionRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionStats {
    pub total_transactions: usize,
    pub total_order_qty: f64,
    pub total_actual_qty: f64,
    /// Sum of `order_value_sell`.
    pub total_order_value: f64,
    /// Sum of `actual_value_sell`.
    pub total_actual_value: f64,
    pub categories: Vec<String>,
    pub products: Vec<String>,
    pub flow_ids: Vec<String>,
    pub company_ids: Vec<String>,
}

fn flows(t: &TransactionRecord) -> impl Iterator<Item = &str> {
    [
        t.flow_id_supplier.as_str(),
        t.flow_id_internal.as_str(),
        t.flow_id_customer.as_str(),
    ]
    .into_iter()
    .filter(|f| !f.is_empty())
}

/// Totals plus sorted unique categories, products, flows and company ids.
pub fn transaction_stats(transactions: &[TransactionRecord]) -> TransactionStats {
    let mut stats = TransactionStats {
        total_transactions: transactions.len(),
        ..TransactionStats::default()
    };
    let mut categories = BTreeSet::new();
    let mut products = BTreeSet::new();
    let mut flow_ids = BTreeSet::new();
    let mut company_ids = BTreeSet::new();

    for t in transactions {
        stats.total_order_qty += t.order_qty;
        stats.total_actual_qty += t.actual_qty;
        stats.total_order_value += t.order_value_sell;
        stats.total_actual_value += t.actual_value_sell;
        categories.insert(t.category.clone());
        products.insert(t.product_name.clone());
        for flow in flows(t) {
            flow_ids.insert(flow.to_string());
            let mut parts = flow.split('-');
            if let (Some(from), Some(to)) = (parts.next(), parts.next()) {
                company_ids.insert(from.to_string());
                company_ids.insert(to.to_string());
            }
        }
    }

    stats.categories = categories.into_iter().collect();
    stats.products = products.into_iter().collect();
    stats.flow_ids = flow_ids.into_iter().collect();
    stats.company_ids = company_ids.into_iter().collect();
    stats
}

/// Actual quantity routed through each flow, summed over every transaction
/// that uses it.
pub fn flow_amounts(transactions: &[TransactionRecord]) -> BTreeMap<String, f64> {
    let mut amounts: BTreeMap<String, f64> = BTreeMap::new();
    for t in transactions {
        for flow in flows(t) {
            *amounts.entry(flow.to_string()).or_insert(0.0) += t.actual_qty;
        }
    }
    amounts
}
