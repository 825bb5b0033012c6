//! Legend colors for entity types and connection step types.

use std::collections::BTreeMap;

use foundation::color::{Rgb, gradient};
use tracing::warn;

/// Used for step types and entity types without a legend entry.
pub const FALLBACK_COLOR: Rgb = Rgb::WHITE;

pub const STEP_DEFAULT_COLOR: Rgb = Rgb::new(0.1, 0.1, 0.1);

const STEP_COLORS: [(&str, Rgb); 5] = [
    ("supplier", Rgb::new(0.0, 0.159, 0.306)),
    ("internal_1", Rgb::new(0.0, 0.333, 0.392)),
    ("internal_2", Rgb::new(0.2, 0.3, 0.4)),
    ("internal_3", Rgb::new(0.468, 0.304, 0.0)),
    ("internal_4", Rgb::new(0.0, 0.251, 0.239)),
];

const TYPE_GRADIENT_START: &str = "#33D6FF";
const TYPE_GRADIENT_END: &str = "#FF33A3";

pub fn step_color(step_type: &str) -> Rgb {
    STEP_COLORS
        .iter()
        .find(|(label, _)| *label == step_type)
        .map(|(_, color)| *color)
        .unwrap_or(STEP_DEFAULT_COLOR)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendItem {
    pub key: String,
    pub label: String,
    pub color: Rgb,
}

/// `internal_1` -> `Internal 1`.
fn display_label(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn step_legend() -> Vec<LegendItem> {
    STEP_COLORS
        .iter()
        .map(|(key, color)| LegendItem {
            key: key.to_string(),
            label: display_label(key),
            color: *color,
        })
        .collect()
}

/// Colors for entity types, keyed by type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeLegend {
    colors: BTreeMap<String, Rgb>,
    order: Vec<String>,
}

impl TypeLegend {
    /// One gradient color per distinct type in first-seen order. Valid hex
    /// overrides replace the generated color for their type.
    pub fn build<'a>(
        types: impl IntoIterator<Item = &'a str>,
        overrides: Option<&BTreeMap<String, String>>,
    ) -> Self {
        let mut order: Vec<String> = Vec::new();
        for t in types {
            if !order.iter().any(|seen| seen == t) {
                order.push(t.to_string());
            }
        }

        let (start, end) = match (
            Rgb::from_hex(TYPE_GRADIENT_START),
            Rgb::from_hex(TYPE_GRADIENT_END),
        ) {
            (Ok(s), Ok(e)) => (s, e),
            _ => (FALLBACK_COLOR, FALLBACK_COLOR),
        };
        let ramp = gradient(order.len(), start, end);

        let mut colors: BTreeMap<String, Rgb> = order
            .iter()
            .zip(ramp)
            .map(|(t, c)| (t.clone(), c))
            .collect();

        for (t, hex) in overrides.into_iter().flatten() {
            match Rgb::from_hex(hex) {
                Ok(c) => {
                    colors.insert(t.clone(), c);
                }
                Err(e) => warn!(entity_type = %t, error = %e, "ignoring legend override"),
            }
        }

        Self { colors, order }
    }

    pub fn color(&self, entity_type: &str) -> Rgb {
        self.colors
            .get(entity_type)
            .copied()
            .unwrap_or(FALLBACK_COLOR)
    }

    pub fn items(&self) -> Vec<LegendItem> {
        self.order
            .iter()
            .map(|key| LegendItem {
                key: key.clone(),
                label: display_label(key),
                color: self.color(key),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{STEP_DEFAULT_COLOR, TypeLegend, step_color, step_legend};
    use foundation::color::Rgb;
    use std::collections::BTreeMap;

    #[test]
    fn known_and_unknown_steps() {
        assert_eq!(step_color("supplier"), Rgb::new(0.0, 0.159, 0.306));
        assert_eq!(step_color("courier"), STEP_DEFAULT_COLOR);
        let labels: Vec<String> = step_legend().into_iter().map(|i| i.label).collect();
        assert_eq!(labels[0], "Supplier");
        assert_eq!(labels[1], "Internal 1");
    }

    #[test]
    fn type_legend_spans_the_gradient() {
        let legend = TypeLegend::build(["plant", "warehouse", "plant", "customer"], None);
        let items = legend.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].color.to_hex(), "#33d6ff");
        assert_eq!(items[2].color.to_hex(), "#ff33a3");
        assert_eq!(legend.color("nobody"), Rgb::WHITE);
    }

    #[test]
    fn single_type_gets_the_start_color() {
        let legend = TypeLegend::build(["plant"], None);
        assert_eq!(legend.color("plant").to_hex(), "#33d6ff");
    }

    #[test]
    fn overrides_replace_generated_colors() {
        let mut overrides = BTreeMap::new();
        overrides.insert("plant".to_string(), "#010203".to_string());
        overrides.insert("warehouse".to_string(), "bogus".to_string());
        let legend = TypeLegend::build(["plant", "warehouse"], Some(&overrides));
        assert_eq!(legend.color("plant").to_bytes(), [1, 2, 3]);
        assert_eq!(legend.color("warehouse").to_hex(), "#ff33a3");
    }
}
