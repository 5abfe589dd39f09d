use std::collections::HashMap;

use crate::models::common::GeoPoint;
use crate::models::map::{MapView, MarkerGroup, MarkerItem, MarkerState};
use crate::models::surplus::SurplusItem;

/// Groups items that share exactly the same coordinates into one marker.
/// Items without a usable position are left off the map. Groups keep the
/// order in which their first item was seen.
pub fn group_markers(items: &[SurplusItem]) -> Vec<MarkerGroup> {
    let mut groups: Vec<MarkerGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let position = match item.geolocation {
            Some(point) if point.is_valid() => point,
            _ => continue,
        };

        let key = position.key();
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push(MarkerGroup {
                    key: key.clone(),
                    position,
                    state: MarkerState::Available,
                    available_count: 0,
                    claimed_count: 0,
                    items: Vec::new(),
                });
                index.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };

        let group = &mut groups[slot];
        if item.is_claimed() {
            group.claimed_count += 1;
        } else {
            group.available_count += 1;
        }
        group.items.push(MarkerItem::from(item));
    }

    for group in &mut groups {
        group.state = marker_state(group.available_count, group.claimed_count);
    }

    groups
}

fn marker_state(available: usize, claimed: usize) -> MarkerState {
    match (available, claimed) {
        (_, 0) => MarkerState::Available,
        (0, _) => MarkerState::Claimed,
        _ => MarkerState::Mixed,
    }
}

pub fn map_view(items: &[SurplusItem], center: GeoPoint) -> MapView {
    MapView {
        center,
        markers: group_markers(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::surplus::ListingFields;
    use crate::models::user::{User, UserType};
    use rust_decimal::Decimal;

    fn item(title: &str, geolocation: Option<GeoPoint>, claimed: bool) -> SurplusItem {
        let creator = User::new("shop@example.com".to_string(), None, UserType::Store, None, None);
        let mut item = SurplusItem::new(
            ListingFields {
                title: title.to_string(),
                description: "Fresh".to_string(),
                quantity: "3 crates".to_string(),
                location: "Dadar".to_string(),
                geolocation,
                price: Decimal::ZERO,
            },
            &creator,
            "https://cdn.example.com/x.png".to_string(),
            "INR".to_string(),
        );
        if claimed {
            item.claimed_by = Some("ngo-1".to_string());
        }
        item
    }

    #[test]
    fn test_identical_coordinates_share_a_marker() {
        let here = Some(GeoPoint::new(19.0176, 72.8562));
        let items = vec![item("Apples", here, false), item("Pears", here, false)];

        let groups = group_markers(&items);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "19.0176,72.8562");
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[0].state, MarkerState::Available);
    }

    #[test]
    fn test_different_coordinates_get_separate_markers_in_order() {
        let items = vec![
            item("Apples", Some(GeoPoint::new(19.0176, 72.8562)), false),
            item("Rice", Some(GeoPoint::new(19.1136, 72.8697)), true),
            item("Pears", Some(GeoPoint::new(19.0176, 72.8562)), false),
        ];

        let groups = group_markers(&items);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].items[0].title, "Apples");
        assert_eq!(groups[0].items[1].title, "Pears");
        assert_eq!(groups[1].state, MarkerState::Claimed);
        assert_eq!(groups[1].claimed_count, 1);
    }

    #[test]
    fn test_signed_zero_coordinates_share_a_marker() {
        let items = vec![
            item("Apples", Some(GeoPoint::new(0.0, 72.8)), false),
            item("Pears", Some(GeoPoint::new(-0.0, 72.8)), true),
        ];

        let groups = group_markers(&items);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "0,72.8");
        assert_eq!(groups[0].state, MarkerState::Mixed);
    }

    #[test]
    fn test_mixed_state() {
        let here = Some(GeoPoint::new(19.0, 72.8));
        let groups = group_markers(&[item("Milk", here, true), item("Eggs", here, false)]);

        assert_eq!(groups[0].state, MarkerState::Mixed);
        assert_eq!(groups[0].available_count, 1);
        assert_eq!(groups[0].claimed_count, 1);
        assert!(groups[0].items[0].claimed);
    }

    #[test]
    fn test_items_without_valid_position_are_skipped() {
        let items = vec![
            item("Nowhere", None, false),
            item("Off the globe", Some(GeoPoint::new(95.0, 72.8)), false),
            item("Broken", Some(GeoPoint::new(f64::NAN, 72.8)), false),
            item("Equator", Some(GeoPoint::new(0.0, 0.0)), false),
        ];

        let view = map_view(&items, GeoPoint::new(19.0760, 72.8777));
        assert_eq!(view.markers.len(), 1);
        assert_eq!(view.markers[0].items[0].title, "Equator");
        assert_eq!(view.center, GeoPoint::new(19.0760, 72.8777));
    }
}
