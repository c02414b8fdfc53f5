use std::fmt;

use serde::Deserialize;

use crate::domain::error::DomainError;

pub const SEATTLE_LABEL: &str = "Seattle";
pub const OUTSIDE_SEATTLE_LABEL: &str = "Outside Seattle";
pub const UNKNOWN_OUTSIDE_LABEL: &str = "Outside Seattle - Unknown Location";

/// Rough city limits; stands in for the boundary polygon when deciding whether
/// a point is inside Seattle.
const SEATTLE_LAT_RANGE: (f64, f64) = (47.4919, 47.7341);
const SEATTLE_LON_RANGE: (f64, f64) = (-122.4596, -122.2244);

/// Parsed form of the `location` query parameter.
///
/// Built fresh for every request and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationFilter {
    SeattleAll,
    SeattleNeighborhood(String),
    Outside,
    Exact(String),
}

impl LocationFilter {
    pub fn kind(&self) -> &'static str {
        match self {
            LocationFilter::SeattleAll => "seattle_all",
            LocationFilter::SeattleNeighborhood(_) => "seattle_neighborhood",
            LocationFilter::Outside => "outside",
            LocationFilter::Exact(_) => "exact",
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            LocationFilter::SeattleNeighborhood(label) | LocationFilter::Exact(label) => {
                Some(label.as_str())
            }
            LocationFilter::SeattleAll | LocationFilter::Outside => None,
        }
    }

    /// Whether a post with the given stored fields passes this filter.
    ///
    /// Mirrors the SQL built by `data::filters::push_location_filter`.
    pub fn matches(&self, location: Option<&str>, is_in_seattle: bool) -> bool {
        let same_label =
            |label: &str| location.is_some_and(|loc| loc.to_lowercase() == label.to_lowercase());
        match self {
            LocationFilter::SeattleAll => is_in_seattle,
            LocationFilter::Outside => !is_in_seattle,
            LocationFilter::SeattleNeighborhood(label) => is_in_seattle && same_label(label),
            LocationFilter::Exact(label) => same_label(label),
        }
    }
}

impl fmt::Display for LocationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{}({})", self.kind(), label),
            None => f.write_str(self.kind()),
        }
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_location_value(raw: Option<&str>) -> Option<String> {
    let collapsed = collapse_whitespace(raw?);
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Classifies a raw location filter.
///
/// A missing value keeps the legacy Seattle-only feed. Blank strings are
/// rejected rather than silently widened.
pub fn parse_location_filter(raw: Option<&str>) -> Result<LocationFilter, DomainError> {
    let Some(raw) = raw else {
        return Ok(LocationFilter::SeattleAll);
    };

    let normalized = normalize_location_value(Some(raw)).ok_or_else(|| {
        DomainError::InvalidLocation("Location filter cannot be empty".to_string())
    })?;
    let lowered = normalized.to_lowercase();

    if lowered == "seattle" || lowered == "seattle (all)" {
        return Ok(LocationFilter::SeattleAll);
    }

    if lowered == "outside seattle" {
        return Ok(LocationFilter::Outside);
    }

    if lowered.ends_with(", seattle") {
        let neighborhood = normalized
            .rsplit_once(',')
            .map(|(head, _)| head.trim())
            .unwrap_or_default();
        if neighborhood.is_empty() {
            return Ok(LocationFilter::SeattleAll);
        }
        return Ok(LocationFilter::SeattleNeighborhood(format!(
            "{neighborhood}, {SEATTLE_LABEL}"
        )));
    }

    Ok(LocationFilter::Exact(normalized))
}

/// Label echoed back in the `query.location` field of feed responses.
pub fn display_location_value(raw: Option<&str>, filter: &LocationFilter) -> String {
    match filter {
        LocationFilter::SeattleAll => SEATTLE_LABEL.to_string(),
        LocationFilter::Outside => OUTSIDE_SEATTLE_LABEL.to_string(),
        LocationFilter::SeattleNeighborhood(label) | LocationFilter::Exact(label) => {
            if label.is_empty() {
                normalize_location_value(raw).unwrap_or_else(|| SEATTLE_LABEL.to_string())
            } else {
                label.clone()
            }
        }
    }
}

/// Display label for a stored post.
pub fn format_post_location(location: Option<&str>, is_in_seattle: bool) -> String {
    match location.map(collapse_whitespace) {
        Some(label) if !label.is_empty() => label,
        _ if is_in_seattle => SEATTLE_LABEL.to_string(),
        _ => UNKNOWN_OUTSIDE_LABEL.to_string(),
    }
}

/// Address components returned by a reverse geocoder.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Address {
    pub neighbourhood: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub hamlet: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
}

impl Address {
    fn neighborhood(&self) -> Option<&str> {
        first_present(&[&self.neighbourhood, &self.suburb])
    }

    fn city(&self) -> Option<&str> {
        first_present(&[&self.city, &self.town, &self.village, &self.hamlet])
    }

    fn region(&self) -> Option<&str> {
        self.city().or_else(|| {
            first_present(&[&self.county, &self.state, &self.country])
        })
    }

    fn is_seattle_city(&self) -> bool {
        let (Some(city), Some(state)) = (self.city(), self.state.as_deref()) else {
            return false;
        };
        let state = state.to_lowercase();
        let in_us = self
            .country_code
            .as_deref()
            .is_some_and(|code| code.eq_ignore_ascii_case("us"))
            || self
                .country
                .as_deref()
                .is_some_and(|c| c.to_lowercase().starts_with("united states"));
        city.eq_ignore_ascii_case("seattle") && (state == "washington" || state == "wa") && in_us
    }
}

fn first_present<'a>(fields: &[&'a Option<String>]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|field| field.as_deref())
        .find(|value| !value.trim().is_empty())
}

/// Where a coordinate lands, as stored on a new post.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub label: String,
    pub is_in_seattle: bool,
    pub neighborhood: Option<String>,
}

pub fn is_coordinate_in_seattle(lat: f64, lon: f64) -> bool {
    (SEATTLE_LAT_RANGE.0..=SEATTLE_LAT_RANGE.1).contains(&lat)
        && (SEATTLE_LON_RANGE.0..=SEATTLE_LON_RANGE.1).contains(&lon)
}

/// Turns a coordinate and its (possibly missing) address into a location label.
pub fn classify_place(lat: f64, lon: f64, address: Option<&Address>) -> Placement {
    let in_seattle = is_coordinate_in_seattle(lat, lon)
        || address.is_some_and(Address::is_seattle_city);
    let neighborhood = address.and_then(Address::neighborhood);

    if in_seattle {
        let neighborhood = neighborhood
            .filter(|name| !name.eq_ignore_ascii_case(SEATTLE_LABEL))
            .map(str::to_string);
        // Stored in the same "<X>, Seattle" form the neighborhood filter matches.
        return Placement {
            label: neighborhood
                .as_deref()
                .map(|hood| format!("{hood}, {SEATTLE_LABEL}"))
                .unwrap_or_else(|| SEATTLE_LABEL.to_string()),
            is_in_seattle: true,
            neighborhood,
        };
    }

    let label = match (address.and_then(Address::region), neighborhood) {
        (Some(region), Some(hood)) if !hood.eq_ignore_ascii_case(region) => {
            format!("{OUTSIDE_SEATTLE_LABEL} - {hood}, {region}")
        }
        (Some(region), _) => format!("{OUTSIDE_SEATTLE_LABEL} - {region}"),
        (None, _) => UNKNOWN_OUTSIDE_LABEL.to_string(),
    };

    Placement {
        label,
        is_in_seattle: false,
        neighborhood: None,
    }
}
