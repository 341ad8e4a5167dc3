//! Location parsing.
//!
//! Sources hand over locations either as pre-structured mappings
//! (`{city, state | state_province, country}`) or as comma-delimited free text.
//! Both come out as a canonical [`Location`]; blank input gives an empty one.

use serde_json::Value;

use speakerbase_common::Location;

const SEPARATOR: &str = ", ";

/// Parse whatever a source stores in its location slot.
pub fn parse_location(value: Option<&Value>) -> Location {
    match value {
        Some(Value::String(text)) => parse_location_text(text),
        Some(Value::Object(map)) => {
            let field = |key: &str| map.get(key).and_then(Value::as_str);
            structured_location(
                field("city"),
                field("state").filter(|s| !s.trim().is_empty()).or(field("state_province")),
                field("country"),
            )
        }
        _ => Location::default(),
    }
}

/// Split `City, State, Country` style text by position:
/// three parts are city/state/country, two are city/country, one is country.
/// Longer strings keep their last three parts.
pub fn parse_location_text(text: &str) -> Location {
    let text = text.trim();
    if text.is_empty() {
        return Location::default();
    }

    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let (city, state, country) = match parts.as_slice() {
        [country] => (None, None, Some(*country)),
        [city, country] => (Some(*city), None, Some(*country)),
        [.., city, state, country] => (Some(*city), Some(*state), Some(*country)),
        [] => (None, None, None),
    };

    Location {
        city: non_blank(city),
        state: non_blank(state),
        country: non_blank(country),
        full_location: Some(text.to_string()),
    }
}

/// Pass structured parts through and synthesize `full_location` from the
/// non-empty ones.
pub fn structured_location(
    city: Option<&str>,
    state: Option<&str>,
    country: Option<&str>,
) -> Location {
    let city = non_blank(city);
    let state = non_blank(state);
    let country = non_blank(country);

    let parts: Vec<&str> = [&city, &state, &country]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .collect();
    if parts.is_empty() {
        return Location::default();
    }

    Location {
        full_location: Some(parts.join(SEPARATOR)),
        city,
        state,
        country,
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
