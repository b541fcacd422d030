//! Popularity scoring of events

use serde::Deserialize;

/// The fields of an event that drive sampling
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventTraits {
    pub uuid: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub subtype: Option<String>,
    pub reliability: Option<f64>,
    #[serde(rename = "nThumbsUp")]
    pub thumbs_up: Option<f64>,
}

fn base_score(event: &EventTraits) -> f64 {
    match (event.kind.as_deref(), event.subtype.as_deref()) {
        (Some("ROAD_CLOSED"), _) => 500.0,
        (Some("ACCIDENT"), _) => 100.0,
        (Some("JAM"), Some("JAM_STAND_STILL_TRAFFIC")) => 50.0,
        (Some("JAM"), Some("JAM_HEAVY_TRAFFIC")) => 20.0,
        (Some("JAM"), _) => 5.0,
        (Some("HAZARD"), Some("HAZARD_ON_ROAD_OBJECT" | "HAZARD_POTHOLE")) => 5.0,
        _ => 1.0,
    }
}

/// Integer sampling weight, at least 1.
///
/// Confirmation multipliers only apply to events whose base score is
/// already above 5.
pub fn popularity_score(event: &EventTraits) -> u64 {
    let base = base_score(event);
    let mut score = base;

    if base > 5.0 {
        let reliability = event.reliability.unwrap_or(0.0);
        let reliability_multiplier = if reliability >= 9.0 {
            3.0 + (reliability - 9.0)
        } else if reliability == 8.0 {
            1.5
        } else {
            1.0
        };

        let thumbs_up = event.thumbs_up.unwrap_or(0.0);
        let thumbs_up_multiplier = if thumbs_up >= 10.0 {
            2.5
        } else if thumbs_up >= 5.0 {
            1.5
        } else {
            1.0
        };

        score *= reliability_multiplier * thumbs_up_multiplier;
    }

    score.round().max(1.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(
        kind: &str,
        subtype: Option<&str>,
        reliability: Option<f64>,
        thumbs: Option<f64>,
    ) -> EventTraits {
        EventTraits {
            uuid: Some("id".to_string()),
            kind: Some(kind.to_string()),
            subtype: subtype.map(str::to_string),
            reliability,
            thumbs_up: thumbs,
        }
    }

    #[test]
    fn test_base_scores() {
        assert_eq!(popularity_score(&event("ROAD_CLOSED", None, None, None)), 500);
        assert_eq!(popularity_score(&event("ACCIDENT", None, None, None)), 100);
        assert_eq!(
            popularity_score(&event("JAM", Some("JAM_STAND_STILL_TRAFFIC"), None, None)),
            50
        );
        assert_eq!(popularity_score(&event("JAM", Some("JAM_HEAVY_TRAFFIC"), None, None)), 20);
        assert_eq!(popularity_score(&event("JAM", Some("JAM_MODERATE_TRAFFIC"), None, None)), 5);
        assert_eq!(popularity_score(&event("HAZARD", Some("HAZARD_POTHOLE"), None, None)), 5);
        assert_eq!(popularity_score(&event("HAZARD", Some("HAZARD_WEATHER"), None, None)), 1);
        assert_eq!(popularity_score(&event("POLICE", None, Some(10.0), Some(20.0))), 1);
        assert_eq!(popularity_score(&EventTraits::default()), 1);
    }

    #[test]
    fn test_confirmation_multipliers() {
        // 100 * (3 + 1) * 2.5
        assert_eq!(popularity_score(&event("ACCIDENT", None, Some(10.0), Some(12.0))), 1000);
        // 20 * 1.5 * 1.5
        assert_eq!(
            popularity_score(&event("JAM", Some("JAM_HEAVY_TRAFFIC"), Some(8.0), Some(5.0))),
            45
        );
        // 500 * 3
        assert_eq!(popularity_score(&event("ROAD_CLOSED", None, Some(9.0), Some(1.0))), 1500);
    }

    #[test]
    fn test_low_base_ignores_multipliers() {
        assert_eq!(popularity_score(&event("JAM", None, Some(10.0), Some(50.0))), 5);
    }

    #[test]
    fn test_deserialize_from_event_json() {
        let traits: EventTraits = serde_json::from_str(
            r#"{"uuid": "e1", "type": "ACCIDENT", "subtype": "ACCIDENT_MAJOR",
                "reliability": 9, "nThumbsUp": 3, "city": "Santiago"}"#,
        )
        .unwrap();
        assert_eq!(traits.uuid.as_deref(), Some("e1"));
        assert_eq!(traits.reliability, Some(9.0));
        assert_eq!(popularity_score(&traits), 300);
    }
}
