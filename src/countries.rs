//! Country names are normalized to the naming used by the map renderer's
//! gazetteer. Names without an alias are kept as they are.

/// Maps a trimmed country name to its gazetteer name, if it has an alias.
fn alias(name: &str) -> Option<&'static str> {
    let canonical = match name {
        "United States of America" => "United States",
        "South Korea" => "Korea, Republic of",
        "Congo" => "Democratic Republic of the Congo",
        "Lao People's Democratic Republic" => "Laos",
        "Syrian Arab Republic" => "Syria",
        "Russian Federation" => "Russia",
        "Viet Nam" => "Vietnam",
        "Palestinian Territory" => "Palestine",
        "Northern Ireland" => "United Kingdom",
        "Macedonia" => "North Macedonia",
        "Brunei Darussalam" => "Brunei",
        "Micronesia" => "Federated States of Micronesia",
        "Macao" => "Macau",
        "St. Helena" => "Saint Helena",
        "St. Kitts and Nevis" => "Saint Kitts and Nevis",
        "St. Vincent and the Grenadines" => "Saint Vincent and the Grenadines",
        "Svalbard & Jan Mayen Islands" => "Svalbard and Jan Mayen",
        "Cabo Verde" => "Cape Verde",
        "Czechia" => "Czech Republic",
        "Eswatini" => "Swaziland",
        "Gambia, The" => "Gambia",
        "Bahamas, The" => "Bahamas",
        "Burma" => "Myanmar",
        "Côte d'Ivoire" => "Ivory Coast",
        _ => return None,
    };
    Some(canonical)
}

pub fn canonical_name(name: &str) -> String {
    let trimmed = name.trim();
    alias(trimmed).unwrap_or(trimmed).to_owned()
}

pub fn normalize_countries(raw: &[String]) -> Vec<String> {
    raw.iter().map(|name| canonical_name(name)).collect()
}

/// Splits canonical entries on commas into the atomic keys used for grouping.
///
/// Canonical names such as "Korea, Republic of" are split as well; grouping
/// output depends on it.
pub fn atomic_countries<'a>(canonical: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
    canonical
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
}
