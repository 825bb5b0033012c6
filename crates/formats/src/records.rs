//! Rows of the entity, connection and transaction CSV files.
//!
//! Field names follow the column headers of the source files. Numeric columns
//! in the transaction file are read leniently: empty or unparsable cells
//! become `0.0` instead of rejecting the row.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    /// Kept as text; coordinates are validated during conversion.
    pub lat: String,
    pub lon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    #[serde(rename = "Flow_Id")]
    pub flow_id: String,
    #[serde(rename = "Id_From")]
    pub id_from: String,
    #[serde(rename = "Id_To")]
    pub id_to: String,
    #[serde(default)]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "Product_Key", default)]
    pub product_key: String,
    #[serde(rename = "Product_Name", default)]
    pub product_name: String,
    #[serde(rename = "Global_Business_Function", default)]
    pub global_business_function: String,
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Packaging", default)]
    pub packaging: String,
    #[serde(rename = "NART_Packaging", default)]
    pub nart_packaging: String,
    #[serde(rename = "Flow_Id_Supplier", default)]
    pub flow_id_supplier: String,
    #[serde(rename = "Flow_Id_internal", default)]
    pub flow_id_internal: String,
    #[serde(rename = "Flow_Id_Customer", default)]
    pub flow_id_customer: String,
    #[serde(rename = "Order_qty", default, deserialize_with = "lenient_f64")]
    pub order_qty: f64,
    #[serde(rename = "Actual_qty", default, deserialize_with = "lenient_f64")]
    pub actual_qty: f64,
    #[serde(rename = "Order_value_COM", default, deserialize_with = "lenient_f64")]
    pub order_value_com: f64,
    #[serde(rename = "Actual_value_COM", default, deserialize_with = "lenient_f64")]
    pub actual_value_com: f64,
    #[serde(rename = "Order_value_Sell", default, deserialize_with = "lenient_f64")]
    pub order_value_sell: f64,
    #[serde(rename = "Actual_value_Sell", default, deserialize_with = "lenient_f64")]
    pub actual_value_sell: f64,
}

/// Parses a numeric cell, falling back to `0.0`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0))
}

/// Splits a `"<sender>-<receiver>"` flow id at the first `-`.
pub fn flow_endpoints(flow_id: &str) -> (&str, Option<&str>) {
    match flow_id.split_once('-') {
        Some((from, rest)) => (from, Some(rest.split('-').next().unwrap_or(rest))),
        None => (flow_id, None),
    }
}

#[cfg(test)]
mod tests {
    use super::flow_endpoints;

    #[test]
    fn flow_endpoints_split_on_first_dash() {
        assert_eq!(flow_endpoints("S1-C2"), ("S1", Some("C2")));
        assert_eq!(flow_endpoints("S1-C2-x"), ("S1", Some("C2")));
        assert_eq!(flow_endpoints("S1"), ("S1", None));
        assert_eq!(flow_endpoints(""), ("", None));
    }
}
