//! Source records to scene inputs.

use std::collections::BTreeMap;

use foundation::color::Rgb;
use foundation::math::GeoPoint;
use scene::arcs::ConnectionEdge;
use scene::markers::MarkerEntity;
use tracing::warn;

use crate::palette::{TypeLegend, step_color};
use crate::records::{ConnectionRecord, EntityRecord};

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Converts one entity row. Rows with unparsable or out-of-range coordinates
/// are rejected.
pub fn marker_entity(record: &EntityRecord, legend: &TypeLegend) -> Option<MarkerEntity> {
    let (Some(lat), Some(lon)) = (parse_coordinate(&record.lat), parse_coordinate(&record.lon))
    else {
        warn!(
            id = %record.id,
            lat = %record.lat,
            lon = %record.lon,
            "dropping entity with bad coordinates"
        );
        return None;
    };
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        warn!(id = %record.id, lat, lon, "dropping entity outside the lat/lon range");
        return None;
    }

    let color = match record.color.as_deref().map(Rgb::from_hex) {
        Some(Ok(c)) => c,
        Some(Err(e)) => {
            warn!(id = %record.id, error = %e, "ignoring entity color");
            legend.color(&record.kind)
        }
        None => legend.color(&record.kind),
    };

    let mut entity = MarkerEntity::new(record.id.clone(), GeoPoint::new(lat, lon))
        .with_kind(record.kind.clone())
        .with_name(record.name.clone())
        .with_color(color);
    if !record.country.is_empty() {
        entity.country = Some(record.country.clone());
    }
    if let Some(size) = record.size {
        entity = entity.with_size(size);
    }
    Some(entity)
}

pub fn marker_entities(records: &[EntityRecord], legend: &TypeLegend) -> Vec<MarkerEntity> {
    records
        .iter()
        .filter_map(|r| marker_entity(r, legend))
        .collect()
}

/// Converts connection rows. The amount comes from `flow_amounts` when the
/// flow is listed there, else from the row, else `1.0`.
pub fn connection_edges(
    records: &[ConnectionRecord],
    flow_amounts: Option<&BTreeMap<String, f64>>,
) -> Vec<ConnectionEdge> {
    records
        .iter()
        .map(|r| {
            let amount = flow_amounts
                .and_then(|m| m.get(&r.flow_id).copied())
                .or(r.amount)
                .unwrap_or(1.0);
            ConnectionEdge::new(r.flow_id.clone(), r.id_from.clone(), r.id_to.clone())
                .with_step_type(r.step_type.clone())
                .with_color(step_color(&r.step_type))
                .with_amount(amount)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{connection_edges, marker_entities};
    use crate::palette::{STEP_DEFAULT_COLOR, TypeLegend, step_color};
    use crate::records::{ConnectionRecord, EntityRecord};
    use std::collections::BTreeMap;

    fn entity(id: &str, lat: &str, lon: &str) -> EntityRecord {
        EntityRecord {
            id: id.to_string(),
            kind: "plant".to_string(),
            name: format!("{id} works"),
            country: "DE".to_string(),
            lat: lat.to_string(),
            lon: lon.to_string(),
            color: None,
            size: None,
        }
    }

    fn connection(flow: &str, step: &str, amount: Option<f64>) -> ConnectionRecord {
        ConnectionRecord {
            flow_id: flow.to_string(),
            id_from: "A".to_string(),
            id_to: "B".to_string(),
            step_type: step.to_string(),
            amount,
        }
    }

    #[test]
    fn drops_rows_with_bad_coordinates() {
        let legend = TypeLegend::build(["plant"], None);
        let rows = vec![
            entity("A", "53.55", "9.99"),
            entity("B", "north", "9.99"),
            entity("C", "95", "0"),
            entity("D", "", "1"),
        ];
        let out = marker_entities(&rows, &legend);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "A");
        assert_eq!(out[0].country.as_deref(), Some("DE"));
        assert_eq!(out[0].kind.as_deref(), Some("plant"));
        assert_eq!(out[0].color, legend.color("plant"));
    }

    #[test]
    fn explicit_color_and_size_win() {
        let legend = TypeLegend::build(["plant"], None);
        let mut row = entity("A", "0", "0");
        row.color = Some("#ff0000".to_string());
        row.size = Some(2.5);
        let out = marker_entities(&[row], &legend);
        assert_eq!(out[0].color.to_bytes(), [255, 0, 0]);
        assert_eq!(out[0].size, 2.5);
    }

    #[test]
    fn edge_amounts_prefer_flow_totals() {
        let mut totals = BTreeMap::new();
        totals.insert("f1".to_string(), 40.0);
        let rows = vec![
            connection("f1", "supplier", Some(3.0)),
            connection("f2", "internal_9", Some(3.0)),
            connection("f3", "internal_1", None),
        ];
        let edges = connection_edges(&rows, Some(&totals));
        assert_eq!(edges[0].amount, 40.0);
        assert_eq!(edges[0].color, step_color("supplier"));
        assert_eq!(edges[1].amount, 3.0);
        assert_eq!(edges[1].color, STEP_DEFAULT_COLOR);
        assert_eq!(edges[2].amount, 1.0);
        assert_eq!(edges[2].step_type, "internal_1");
    }
}
