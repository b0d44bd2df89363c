pub mod dom;
pub mod network;
pub mod script;
pub mod text;

use crate::session::PageSnapshot;
use crate::utilities::{message, LogMessage};
use crate::vessel::{Field, Provider, RawExtraction};

lazy_static::lazy_static! {
    static ref HEMISPHERE_COORDINATE: regex::Regex =
        regex::Regex::new(r"(?i)^([+-]?)(\d+(?:\.\d+)?)\s*°?\s*([NSEW])$").unwrap();
}

/// one independent way of reading vessel fields off a loaded page
pub trait Strategy {
    fn name(&self) -> &'static str;
    fn extract(&self, page: &PageSnapshot) -> RawExtraction;
}

/// runs strategies in priority order; earlier strategies win any field they find
pub struct Extractor {
    provider: Provider,
    strategies: Vec<Box<dyn Strategy>>,
}

impl Extractor {
    pub fn new(provider: Provider, strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self {
            provider,
            strategies,
        }
    }

    pub fn for_provider(provider: Provider) -> Self {
        Self::new(provider, vec![
            Box::new(crate::extract::network::NetworkStrategy),
            Box::new(crate::extract::script::ScriptStrategy),
            Box::new(crate::extract::dom::DomStrategy::new(provider)),
            Box::new(crate::extract::text::TextStrategy),
        ])
    }

    pub fn extract(&self, page: &PageSnapshot) -> (RawExtraction, Vec<LogMessage>) {
        let mut extraction = RawExtraction::new();
        let mut messages = vec![];

        for strategy in &self.strategies {
            let mut candidate = strategy.extract(page);
            // a rejected name must not block the next strategy's candidate
            let rejected = candidate
                .get(Field::Name)
                .filter(|name| !is_vessel_name(self.provider, name))
                .map(|name| name.to_string());
            if let Some(name) = rejected {
                messages.push(message(
                    format!(
                        "{:} strategy found {:?}, not a vessel name",
                        strategy.name(),
                        name
                    ),
                    log::Level::Debug,
                ));
                candidate.remove(Field::Name);
            }

            let filled = extraction.merge(candidate);
            if !filled.is_empty() {
                messages.push(message(
                    format!(
                        "{:} strategy filled {:}",
                        strategy.name(),
                        filled
                            .iter()
                            .map(|field| field.key())
                            .collect::<Vec<&str>>()
                            .join(", ")
                    ),
                    log::Level::Debug,
                ));
            }
        }

        messages.push(message(
            format!(
                "found {:} of {:} fields",
                extraction.len(),
                Field::ALL.len()
            ),
            log::Level::Debug,
        ));

        let missing = extraction.missing();
        if !missing.is_empty() {
            messages.push(message(
                format!(
                    "not found on page: {:}",
                    missing
                        .iter()
                        .map(|field| field.key())
                        .collect::<Vec<&str>>()
                        .join(", ")
                ),
                log::Level::Debug,
            ));
        }

        (extraction, messages)
    }
}

/// whether `name` could be the vessel's rather than a placeholder or a site brand
pub fn is_vessel_name(provider: Provider, name: &str) -> bool {
    !crate::normalize::is_placeholder(name) && !provider.is_brand(name)
}

/// field named by a structured-data key, ignoring case, `_` and `-`
pub fn field_for_key(key: &str) -> Option<Field> {
    let key = key.to_lowercase().replace(['_', '-'], "");
    Some(match key.as_str() {
        "mmsi" => Field::Mmsi,
        "imo" | "imonumber" => Field::Imo,
        "name" | "shipname" | "vesselname" => Field::Name,
        "callsign" => Field::Callsign,
        "type" | "shiptype" | "vesseltype" | "typename" => Field::Type,
        "lat" | "latitude" => Field::Lat,
        "lon" | "lng" | "longitude" => Field::Lon,
        "speed" | "sog" => Field::Speed,
        "course" | "cog" => Field::Course,
        "heading" | "hdg" | "trueheading" => Field::Heading,
        "draught" | "draft" => Field::Draught,
        "status" | "navstatus" | "navstat" | "navigationalstatus" | "navigationstatus" => {
            Field::NavStatus
        }
        "destination" | "dest" => Field::Destination,
        "timestamp" | "lastpos" | "lastposition" | "positionreceived" | "ts" => Field::Timestamp,
        _ => return None,
    })
}

/// field named by a human-readable row label such as `Navigation Status` or `Speed over ground`
pub fn field_for_label(label: &str) -> Option<Field> {
    let label = label
        .trim()
        .trim_end_matches(':')
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase();

    if label.is_empty() {
        None
    } else if label.contains("mmsi") {
        Some(Field::Mmsi)
    } else if label.contains("imo") {
        Some(Field::Imo)
    } else if label.contains("call sign") || label.contains("callsign") {
        Some(Field::Callsign)
    } else if label.contains("status") {
        Some(Field::NavStatus)
    } else if label.contains("type") {
        Some(Field::Type)
    } else if label.contains("latitude") || label == "lat" {
        Some(Field::Lat)
    } else if label.contains("longitude") || label == "lon" || label == "lng" {
        Some(Field::Lon)
    } else if label.contains("speed") {
        Some(Field::Speed)
    } else if label.contains("course") {
        Some(Field::Course)
    } else if label.contains("heading") {
        Some(Field::Heading)
    } else if label.contains("draught") || label.contains("draft") {
        Some(Field::Draught)
    } else if label.contains("destination") {
        Some(Field::Destination)
    } else if label.contains("position received")
        || label.contains("last report")
        || label.contains("last update")
        || label == "timestamp"
    {
        Some(Field::Timestamp)
    } else if label == "name" || label == "vessel name" || label == "ship name" {
        Some(Field::Name)
    } else {
        None
    }
}

/// map a labelled value onto fields; `IMO / MMSI` with `9321483 / 226013370` yields both
pub fn labelled_values(label: &str, value: &str) -> Vec<(Field, String)> {
    let labels: Vec<&str> = label.split('/').collect();
    let values: Vec<&str> = value.split('/').collect();

    let pairs: Vec<(&str, &str)> = if labels.len() > 1 && labels.len() == values.len() {
        labels.into_iter().zip(values).collect()
    } else {
        vec![(label, value)]
    };

    pairs
        .into_iter()
        .filter_map(|(label, value)| {
            let field = field_for_label(label)?;
            let value = value.split_whitespace().collect::<Vec<&str>>().join(" ");
            if crate::normalize::is_placeholder(&value) {
                return None;
            }
            let value = match field {
                Field::Lat | Field::Lon => signed_coordinate(&value),
                _ => value,
            };
            Some((field, value))
        })
        .collect()
}

/// `12.5 N` → `12.5`, `45.6° W` → `-45.6`; anything else is returned unchanged
pub fn signed_coordinate(value: &str) -> String {
    match HEMISPHERE_COORDINATE.captures(value.trim()) {
        Some(captures) => {
            let sign = &captures[1];
            let number = &captures[2];
            let negative = matches!(&captures[3], "S" | "s" | "W" | "w") != (sign == "-");
            if negative {
                format!("-{:}", number)
            } else {
                number.to_string()
            }
        }
        None => value.to_string(),
    }
}

/// walk a JSON payload breadth-first, so shallower keys take precedence
pub fn collect_json(value: &serde_json::Value, extraction: &mut RawExtraction) {
    let mut queue = std::collections::VecDeque::from([value]);

    while let Some(value) = queue.pop_front() {
        match value {
            serde_json::Value::Object(map) => {
                for (key, child) in map {
                    match child {
                        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                            queue.push_back(child)
                        }
                        scalar => {
                            if let (Some(field), Some(text)) =
                                (field_for_key(key), scalar_text(scalar))
                            {
                                // `WebSite` blocks name the site, not the vessel
                                if field == Field::Name
                                    && Provider::ALL.iter().any(|provider| provider.is_brand(&text))
                                {
                                    continue;
                                }
                                extraction.fill(field, text);
                            }
                        }
                    }
                }
            }
            serde_json::Value::Array(items) => queue.extend(items.iter()),
            _ => {}
        }
    }
}

fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(text) if !crate::normalize::is_placeholder(text) => {
            Some(text.to_owned())
        }
        serde_json::Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
