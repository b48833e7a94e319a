//! Production area domain entity and its request contract

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RoutedEntity;

/// Production area of a store (kitchen line with its dietary restrictions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionArea {
    /// Unique identifier
    pub production_area_id: Uuid,

    /// Owning store, used as routing label
    pub store_id: Uuid,

    /// Ingredients this area cannot handle
    #[serde(default)]
    pub restrictions: Vec<String>,

    /// Whether the area is currently producing
    pub on: bool,
}

impl ProductionArea {
    /// Create an area for a store with a fresh id
    pub fn new(store_id: Uuid, restrictions: Vec<String>, on: bool) -> Self {
        Self {
            production_area_id: Uuid::new_v4(),
            store_id,
            restrictions,
            on,
        }
    }
}

impl RoutedEntity for ProductionArea {
    const PAYLOAD_FIELD: &'static str = "productionArea";

    fn routing_label(&self) -> String {
        self.store_id.to_string()
    }
}

/// Create/update request for a production area
///
/// The store is addressed by name; resolving it to a store id is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionAreaUpsert {
    pub store_name: String,

    #[serde(default)]
    pub restrictions: Vec<String>,

    pub on: bool,
}

impl ProductionAreaUpsert {
    /// Build a new area for the resolved store
    pub fn into_production_area(self, store_id: Uuid) -> ProductionArea {
        ProductionArea::new(store_id, self.restrictions, self.on)
    }

    /// Overwrite the mutable fields of an existing area
    pub fn apply_to(&self, area: &mut ProductionArea) {
        area.restrictions = self.restrictions.clone();
        area.on = self.on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_label_is_store_id() {
        let store_id = Uuid::new_v4();
        let area = ProductionArea::new(store_id, vec![], true);
        assert_eq!(area.routing_label(), store_id.to_string());
    }

    #[test]
    fn test_production_area_serializes_camel_case() {
        let area = ProductionArea::new(Uuid::nil(), vec!["gluten".into()], false);
        let json = serde_json::to_value(&area).unwrap();
        assert_eq!(json["storeId"], Uuid::nil().to_string());
        assert_eq!(json["restrictions"][0], "gluten");
        assert_eq!(json["on"], false);
    }

    #[test]
    fn test_upsert_apply_keeps_identity() {
        let mut area = ProductionArea::new(Uuid::new_v4(), vec![], false);
        let id = area.production_area_id;
        let upsert = ProductionAreaUpsert {
            store_name: "Paulista".into(),
            restrictions: vec!["lactose".into()],
            on: true,
        };

        upsert.apply_to(&mut area);
        assert_eq!(area.production_area_id, id);
        assert!(area.on);
        assert_eq!(area.restrictions, vec!["lactose".to_string()]);
    }

    #[test]
    fn test_upsert_from_json() {
        let upsert: ProductionAreaUpsert =
            serde_json::from_str(r#"{"storeName":"Morumbi","on":true}"#).unwrap();
        assert_eq!(upsert.store_name, "Morumbi");
        assert!(upsert.restrictions.is_empty());
    }
}
