//! Filter state for the supply-chain data set and the filtered view of it.
//!
//! All reducers are pure: they take the current value and return the next
//! one, leaving the input untouched.

use std::collections::{BTreeMap, BTreeSet};

use formats::records::{ConnectionRecord, EntityRecord, TransactionRecord, flow_endpoints};
use tracing::debug;

/// Entities, connections and transactions as loaded, or a filtered subset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplyData {
    pub entities: Vec<EntityRecord>,
    pub connections: Vec<ConnectionRecord>,
    pub transactions: Vec<TransactionRecord>,
}

impl SupplyData {
    pub fn is_complete(&self) -> bool {
        !self.entities.is_empty() && !self.connections.is_empty() && !self.transactions.is_empty()
    }
}

/// On/off switches keyed by label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toggles {
    enabled: BTreeMap<String, bool>,
}

impl Toggles {
    pub fn all_enabled<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: labels.into_iter().map(|l| (l.into(), true)).collect(),
        }
    }

    /// Unknown labels count as disabled.
    pub fn is_enabled(&self, label: &str) -> bool {
        self.enabled.get(label).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.enabled.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn enabled_labels(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, on)| *on).map(|(k, _)| k)
    }

    /// With everything enabled, keeps only `label`; otherwise flips it.
    pub fn toggle(&self, label: &str) -> Self {
        let all_on = self.enabled.values().all(|on| *on);
        let mut next = self.clone();
        if all_on {
            for on in next.enabled.values_mut() {
                *on = false;
            }
            next.enabled.insert(label.to_string(), true);
        } else {
            let flipped = !self.is_enabled(label);
            next.enabled.insert(label.to_string(), flipped);
        }
        next
    }

    pub fn enable_all(&self) -> Self {
        self.set_all(true)
    }

    pub fn disable_all(&self) -> Self {
        self.set_all(false)
    }

    fn set_all(&self, value: bool) -> Self {
        Self {
            enabled: self.enabled.keys().map(|k| (k.clone(), value)).collect(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterField {
    EntityType,
    EntityName,
    Category,
    SenderRegion,
    ReceiverRegion,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub entity_types: Toggles,
    pub entity_names: Toggles,
    pub categories: Toggles,
    pub sender_regions: Toggles,
    pub receiver_regions: Toggles,
}

impl FilterState {
    /// Everything present in `data` starts enabled.
    pub fn from_data(data: &SupplyData) -> Self {
        let regions = || data.entities.iter().map(|e| e.country.clone());
        Self {
            entity_types: Toggles::all_enabled(data.entities.iter().map(|e| e.kind.clone())),
            entity_names: Toggles::all_enabled(data.entities.iter().map(|e| e.name.clone())),
            categories: Toggles::all_enabled(data.transactions.iter().map(|t| t.category.clone())),
            sender_regions: Toggles::all_enabled(regions()),
            receiver_regions: Toggles::all_enabled(regions()),
        }
    }

    pub fn field(&self, field: FilterField) -> &Toggles {
        match field {
            FilterField::EntityType => &self.entity_types,
            FilterField::EntityName => &self.entity_names,
            FilterField::Category => &self.categories,
            FilterField::SenderRegion => &self.sender_regions,
            FilterField::ReceiverRegion => &self.receiver_regions,
        }
    }

    fn with_field(&self, field: FilterField, toggles: Toggles) -> Self {
        let mut next = self.clone();
        match field {
            FilterField::EntityType => next.entity_types = toggles,
            FilterField::EntityName => next.entity_names = toggles,
            FilterField::Category => next.categories = toggles,
            FilterField::SenderRegion => next.sender_regions = toggles,
            FilterField::ReceiverRegion => next.receiver_regions = toggles,
        }
        next
    }

    pub fn toggle(&self, field: FilterField, label: &str) -> Self {
        self.with_field(field, self.field(field).toggle(label))
    }

    pub fn enable_all(&self, field: FilterField) -> Self {
        self.with_field(field, self.field(field).enable_all())
    }

    pub fn disable_all(&self, field: FilterField) -> Self {
        self.with_field(field, self.field(field).disable_all())
    }
}

/// Applies `state` to `data`.
///
/// Entities survive by type and name. A transaction survives when its
/// category is enabled and both the sender of its supplier flow and the
/// receiver of its customer flow are surviving entities in enabled regions.
/// A connection survives when either endpoint survives and a surviving
/// transaction routes through its flow. Data with any empty table passes
/// through unfiltered.
pub fn compute_filtered(data: &SupplyData, state: &FilterState) -> SupplyData {
    if !data.is_complete() {
        return data.clone();
    }

    let entities: Vec<EntityRecord> = data
        .entities
        .iter()
        .filter(|e| {
            state.entity_types.is_enabled(&e.kind) && state.entity_names.is_enabled(&e.name)
        })
        .cloned()
        .collect();
    let by_id: BTreeMap<&str, &EntityRecord> = entities
        .iter()
        .rev()
        .map(|e| (e.id.as_str(), e))
        .collect();

    let transactions: Vec<TransactionRecord> = data
        .transactions
        .iter()
        .filter(|t| {
            if !state.categories.is_enabled(&t.category) {
                return false;
            }
            let (sender, _) = flow_endpoints(&t.flow_id_supplier);
            let receiver = flow_endpoints(&t.flow_id_customer).1;
            let (Some(supplier), Some(customer)) =
                (by_id.get(sender), receiver.and_then(|r| by_id.get(r)))
            else {
                return false;
            };
            state.sender_regions.is_enabled(&supplier.country)
                && state.receiver_regions.is_enabled(&customer.country)
        })
        .cloned()
        .collect();

    let used_flows: BTreeSet<&str> = transactions
        .iter()
        .flat_map(|t| {
            [
                t.flow_id_supplier.as_str(),
                t.flow_id_internal.as_str(),
                t.flow_id_customer.as_str(),
            ]
        })
        .collect();

    let connections: Vec<ConnectionRecord> = data
        .connections
        .iter()
        .filter(|c| {
            let endpoint_kept =
                by_id.contains_key(c.id_from.as_str()) || by_id.contains_key(c.id_to.as_str());
            endpoint_kept && used_flows.contains(c.flow_id.as_str())
        })
        .cloned()
        .collect();

    debug!(
        entities = entities.len(),
        connections = connections.len(),
        transactions = transactions.len(),
        "filters applied"
    );

    SupplyData {
        entities,
        connections,
        transactions,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::SupplyData;
    use formats::records::{ConnectionRecord, EntityRecord, TransactionRecord};

    pub fn entity(id: &str, kind: &str, country: &str) -> EntityRecord {
        EntityRecord {
            id: id.to_string(),
            kind: kind.to_string(),
            name: format!("{id} name"),
            country: country.to_string(),
            lat: "0".to_string(),
            lon: "0".to_string(),
            color: None,
            size: None,
        }
    }

    pub fn connection(flow: &str) -> ConnectionRecord {
        let (from, to) = flow.split_once('-').unwrap_or((flow, ""));
        ConnectionRecord {
            flow_id: flow.to_string(),
            id_from: from.to_string(),
            id_to: to.to_string(),
            step_type: "supplier".to_string(),
            amount: None,
        }
    }

    pub fn transaction(category: &str, flows: [&str; 3], qty: f64) -> TransactionRecord {
        TransactionRecord {
            product_key: format!("{category}-key"),
            product_name: format!("{category} product"),
            global_business_function: String::new(),
            category: category.to_string(),
            packaging: String::new(),
            nart_packaging: String::new(),
            flow_id_supplier: flows[0].to_string(),
            flow_id_internal: flows[1].to_string(),
            flow_id_customer: flows[2].to_string(),
            order_qty: qty * 2.0,
            actual_qty: qty,
            order_value_com: 0.0,
            actual_value_com: 0.0,
            order_value_sell: qty * 10.0,
            actual_value_sell: qty * 9.0,
        }
    }

    /// S (DE) supplies P (FR), which ships via W (FR) to C (US).
    pub fn chain() -> SupplyData {
        SupplyData {
            entities: vec![
                entity("S", "supplier", "DE"),
                entity("P", "plant", "FR"),
                entity("W", "warehouse", "FR"),
                entity("C", "customer", "US"),
                entity("X", "customer", "JP"),
            ],
            connections: vec![
                connection("S-P"),
                connection("P-W"),
                connection("W-C"),
                connection("W-X"),
            ],
            transactions: vec![
                transaction("cream", ["S-P", "P-W", "W-C"], 5.0),
                transaction("soap", ["S-P", "P-W", "W-X"], 3.0),
            ],
        }
    }
}
