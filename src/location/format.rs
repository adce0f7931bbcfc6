//! Candidate formatting: display labels, canonical short names and the
//! automatic best pick. Everything here is pure.

use super::types::{Candidate, LocationLookup, RawPlace};

/// GeoNames feature codes for populated places.
const POPULATED_PLACE_CODES: &[&str] = &["PPL", "PPLA", "PPLA2", "PPLA3", "PPLA4", "PPLC"];

/// Population above which the label shows a "(123k)" suffix.
const POPULATION_LABEL_THRESHOLD: u64 = 100_000;

/// Map raw places to candidates, keeping source order.
pub fn format_candidates(places: &[RawPlace]) -> Vec<Candidate> {
    places.iter().map(to_candidate).collect()
}

pub fn to_candidate(place: &RawPlace) -> Candidate {
    let country = match place.country.as_deref() {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => place.country_code.clone(),
    };
    let admin1 = place.admin1.clone().filter(|a| !a.is_empty());
    let short_name = short_name(&place.name, admin1.as_deref(), &country);

    Candidate {
        id: place.id,
        name: place.name.clone(),
        label: display_label(place),
        short_name,
        country,
        admin1,
        latitude: place.latitude,
        longitude: place.longitude,
    }
}

/// "Name, Admin1, Country (pop k)". For display only, never stored.
pub fn display_label(place: &RawPlace) -> String {
    let mut label = place.name.clone();
    let admin1 = place.admin1.as_deref().filter(|a| !a.is_empty());

    if let Some(admin1) = admin1 {
        if admin1 != place.name {
            label.push_str(", ");
            label.push_str(admin1);
        }
    }

    if let Some(country) = place.country.as_deref().filter(|c| !c.is_empty()) {
        if Some(country) != admin1 {
            label.push_str(", ");
            label.push_str(country);
        }
    }

    if let Some(pop) = place.population {
        if pop > POPULATION_LABEL_THRESHOLD {
            let thousands = (pop as f64 / 1000.0).round() as u64;
            label.push_str(&format!(" ({}k)", thousands));
        }
    }

    label
}

/// The canonical name persisted by the host. Depends only on its arguments.
pub fn short_name(name: &str, admin1: Option<&str>, country: &str) -> String {
    if let Some(admin1) = admin1.filter(|a| !a.is_empty()) {
        if admin1 != name {
            return format!("{}, {}", name, admin1);
        }
    }
    if !country.is_empty() && country != name {
        return format!("{}, {}", name, country);
    }
    name.to_string()
}

/// Short name of an already-built candidate.
pub fn candidate_short_name(candidate: &Candidate) -> String {
    short_name(&candidate.name, candidate.admin1.as_deref(), &candidate.country)
}

pub fn is_populated_place(feature_code: &str) -> bool {
    POPULATED_PLACE_CODES.contains(&feature_code)
}

/// Pick a place without asking the user: the most populated populated-place,
/// or the source's first result when no place qualifies.
pub fn best_match(places: &[RawPlace]) -> Option<&RawPlace> {
    let first = places.first()?;

    // Strict `>` keeps the earliest place on population ties.
    let best_city = places
        .iter()
        .filter(|p| is_populated_place(&p.feature_code))
        .fold(None::<&RawPlace>, |best, current| match best {
            Some(b) if current.population.unwrap_or(0) <= b.population.unwrap_or(0) => Some(b),
            _ => Some(current),
        });

    Some(best_city.unwrap_or(first))
}

/// Whether the user has to choose among the lookup's results.
pub fn needs_disambiguation(lookup: &LocationLookup) -> bool {
    lookup.results.len() > 1 && !lookup.exact_match
}

/// Format coordinates as "21.4225°N, 39.8262°E".
pub fn format_coords(lat: f64, lon: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", lat.abs(), ns, lon.abs(), ew)
}
