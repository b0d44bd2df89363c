use chrono::TimeZone;

use crate::vessel::{Field, Provider, RawExtraction, VesselRecord};

lazy_static::lazy_static! {
    // a leading number followed by an optional unit suffix that contains no further digits
    static ref NUMBER_WITH_UNIT: regex::Regex =
        regex::Regex::new(r"^([+-]?(?:\d+(?:\.\d*)?|\.\d+))\s*([^\d]*)$").unwrap();
    static ref PLACEHOLDERS: Vec<&'static str> =
        vec!["unknown", "n/a", "na", "-", "--", "null", "none", "upgrade to unlock"];
}

const MICRODEGREES_PER_DEGREE: f64 = 1_000_000.0;
const MAXIMUM_LATITUDE: f64 = 90.0;
const MAXIMUM_LONGITUDE: f64 = 180.0;
const HEADING_NOT_AVAILABLE: f64 = 511.0;

const NAIVE_DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%b %d, %Y %H:%M",
    "%b %d, %Y %H:%M:%S",
];

/// convert one page's raw values into the canonical record; pure, so identical input gives an identical record
pub fn normalize(
    provider: Provider,
    raw: &RawExtraction,
    comparison_id: Option<&str>,
    data_source: &str,
) -> VesselRecord {
    let mut record = VesselRecord::empty(
        provider,
        data_source.to_owned(),
        comparison_id.map(|comparison_id| comparison_id.to_owned()),
    );

    record.mmsi = raw.get(Field::Mmsi).and_then(numeric_identifier);
    record.imo = raw.get(Field::Imo).and_then(numeric_identifier);
    record.name = raw
        .get(Field::Name)
        .and_then(clean_text)
        .filter(|name| !provider.is_brand(name));
    record.callsign = raw.get(Field::Callsign).and_then(clean_text);
    record.vessel_type = raw.get(Field::Type).and_then(clean_text);
    record.lat = raw
        .get(Field::Lat)
        .and_then(parse_number)
        .and_then(|value| correct_coordinate(value, MAXIMUM_LATITUDE));
    record.lon = raw
        .get(Field::Lon)
        .and_then(parse_number)
        .and_then(|value| correct_coordinate(value, MAXIMUM_LONGITUDE));
    record.speed = raw.get(Field::Speed).and_then(parse_number);
    record.course = raw.get(Field::Course).and_then(parse_number);
    record.heading = raw
        .get(Field::Heading)
        .and_then(parse_number)
        .filter(|heading| *heading != HEADING_NOT_AVAILABLE);
    record.draught = raw.get(Field::Draught).and_then(parse_number);
    record.nav_status = raw.get(Field::NavStatus).and_then(clean_text);
    record.destination = raw.get(Field::Destination).and_then(clean_text);
    record.timestamp = raw.get(Field::Timestamp).and_then(normalize_timestamp);

    record
}

/// strip surrounding quote characters and whitespace
pub fn clean_identifier(value: &str) -> String {
    value
        .trim_matches(|character: char| {
            character == '"' || character == '\'' || character.is_whitespace()
        })
        .to_string()
}

fn numeric_identifier(value: &str) -> Option<String> {
    let value = clean_identifier(value);
    // `0` is how MarineTraffic reports a vessel without an IMO number
    if value.chars().all(|character| character.is_ascii_digit())
        && value.chars().any(|character| character != '0')
    {
        Some(value)
    } else {
        None
    }
}

pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value.is_empty() || PLACEHOLDERS.contains(&value.as_str())
}

pub fn clean_text(value: &str) -> Option<String> {
    let value = value.split_whitespace().collect::<Vec<&str>>().join(" ");
    if is_placeholder(&value) {
        None
    } else {
        Some(value)
    }
}

/// parse a number from text such as `1,234.5` or `12.5 kn`; anything else is `None`, never zero
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim().replace(',', "");
    let captures = NUMBER_WITH_UNIT.captures(&value)?;
    let number = captures.get(1)?.as_str().parse::<f64>().ok()?;
    if number.is_finite() {
        Some(number)
    } else {
        None
    }
}

/// values beyond the coordinate's bounds are taken to be micro-degrees; out of bounds after that is `None`
pub fn correct_coordinate(value: f64, limit: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }

    let value = if value.abs() > limit {
        value / MICRODEGREES_PER_DEGREE
    } else {
        value
    };

    if value.abs() <= limit {
        Some(value)
    } else {
        None
    }
}

/// RFC 3339 in UTC from RFC 3339, common naive formats (taken as UTC), or Unix epoch seconds / milliseconds
pub fn normalize_timestamp(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let datetime = if value.chars().all(|character| character.is_ascii_digit()) {
        let number = value.parse::<i64>().ok()?;
        if value.len() > 10 {
            chrono::Utc.timestamp_millis_opt(number).single()
        } else {
            chrono::Utc.timestamp_opt(number, 0).single()
        }
    } else if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(value) {
        Some(datetime.with_timezone(&chrono::Utc))
    } else {
        let naive = value
            .trim_end_matches("UTC")
            .trim_end_matches('Z')
            .trim();
        NAIVE_DATETIME_FORMATS.iter().find_map(|format| {
            chrono::NaiveDateTime::parse_from_str(naive, format)
                .ok()
                .map(|datetime| chrono::Utc.from_utc_datetime(&datetime))
        })
    };

    datetime.map(|datetime| datetime.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::approx_equal;

    #[test]
    fn test_quoted_identifier() {
        assert_eq!(clean_identifier("\"226013370\""), "226013370");
        assert_eq!(clean_identifier("  '9321483' \n"), "9321483");
        assert_eq!(clean_identifier("226013370"), "226013370");
    }

    #[test]
    fn test_microdegree_latitude() {
        let value = correct_coordinate(23867359.0, MAXIMUM_LATITUDE).unwrap();
        assert!(approx_equal(value, 23.867359, 6));
    }

    #[test]
    fn test_coordinate_in_bounds_is_unchanged() {
        assert_eq!(correct_coordinate(-33.5, MAXIMUM_LATITUDE), Some(-33.5));
        assert_eq!(correct_coordinate(-179.9, MAXIMUM_LONGITUDE), Some(-179.9));
        assert_eq!(correct_coordinate(90.0, MAXIMUM_LATITUDE), Some(90.0));
    }

    #[test]
    fn test_coordinate_out_of_bounds_after_correction() {
        assert_eq!(correct_coordinate(123_456_789_000.0, MAXIMUM_LATITUDE), None);
        assert_eq!(correct_coordinate(-181_000_000.0, MAXIMUM_LONGITUDE), None);
        assert_eq!(correct_coordinate(f64::NAN, MAXIMUM_LONGITUDE), None);
    }

    #[test]
    fn test_coordinates_never_out_of_bounds() {
        for raw in [
            91.0, 180.5, 4808785.0, -7059156.9, 1.0e9, 9.0e7, -9.0e7, 1.8e8, 1.81e8, 0.0,
        ] {
            if let Some(lat) = correct_coordinate(raw, MAXIMUM_LATITUDE) {
                assert!(lat.abs() <= MAXIMUM_LATITUDE, "{raw} -> {lat}");
            }
            if let Some(lon) = correct_coordinate(raw, MAXIMUM_LONGITUDE) {
                assert!(lon.abs() <= MAXIMUM_LONGITUDE, "{raw} -> {lon}");
            }
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("12.5 kn"), Some(12.5));
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("187°"), Some(187.0));
        assert_eq!(parse_number("0"), Some(0.0));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("12.3 / 4.5"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(
            normalize_timestamp("1659286185").as_deref(),
            Some("2022-07-31T16:49:45Z")
        );
        assert_eq!(
            normalize_timestamp("1659286185000").as_deref(),
            Some("2022-07-31T16:49:45Z")
        );
        assert_eq!(
            normalize_timestamp("2023-05-19T12:31:15-04:00").as_deref(),
            Some("2023-05-19T16:31:15Z")
        );
        assert_eq!(
            normalize_timestamp("2023-05-19 12:31 UTC").as_deref(),
            Some("2023-05-19T12:31:00Z")
        );
        assert_eq!(
            normalize_timestamp("May 19, 2023 12:31 UTC").as_deref(),
            Some("2023-05-19T12:31:00Z")
        );
        assert_eq!(normalize_timestamp("3 minutes ago"), None);
    }

    #[test]
    fn test_brand_name_is_discarded() {
        let raw: RawExtraction = vec![(Field::Name, " VesselFinder ")].into_iter().collect();

        let record = normalize(Provider::VesselFinder, &raw, None, "VesselFinder");

        assert_eq!(record.name, None);
    }

    #[test]
    fn test_empty_extraction() {
        let record = normalize(
            Provider::MarineTraffic,
            &RawExtraction::new(),
            Some("run-1"),
            "MarineTraffic",
        );

        assert_eq!(record.provider, Provider::MarineTraffic);
        assert_eq!(record.data_source, "MarineTraffic");
        assert_eq!(record.comparison_id.as_deref(), Some("run-1"));
        assert_eq!(record.populated_fields(), 0);
    }

    #[test]
    fn test_scenario() {
        let raw: RawExtraction = vec![
            (Field::Mmsi, "\"677350000\""),
            (Field::Lat, "4808785"),
            (Field::Lon, "7059156.9"),
            (Field::Name, "PRESIDO"),
            (Field::Speed, "0"),
        ]
        .into_iter()
        .collect();

        let record = normalize(Provider::MarineTraffic, &raw, None, "MarineTraffic");

        assert_eq!(record.mmsi.as_deref(), Some("677350000"));
        assert!(approx_equal(record.lat.unwrap(), 4.808785, 6));
        assert!(approx_equal(record.lon.unwrap(), 7.0591569, 6));
        assert_eq!(record.name.as_deref(), Some("PRESIDO"));
        assert_eq!(record.speed, Some(0.0));
        assert_eq!(record.course, None);
        assert_eq!(record.populated_fields(), 5);
    }

    #[test]
    fn test_idempotent() {
        let raw: RawExtraction = vec![
            (Field::Imo, "'9321483'"),
            (Field::Lat, "-33.86"),
            (Field::Draught, "7.2 m"),
            (Field::Destination, "  SANTOS   BR "),
            (Field::NavStatus, "Upgrade to unlock"),
            (Field::Timestamp, "1659286185"),
        ]
        .into_iter()
        .collect();

        let first = normalize(Provider::VesselFinder, &raw, Some("abc"), "VesselFinder");
        let second = normalize(Provider::VesselFinder, &raw, Some("abc"), "VesselFinder");

        assert_eq!(first, second);
        assert_eq!(first.destination.as_deref(), Some("SANTOS BR"));
        assert_eq!(first.nav_status, None);
        assert_eq!(first.draught, Some(7.2));
    }

    #[test]
    fn test_unparsable_numbers_are_absent() {
        let raw: RawExtraction = vec![
            (Field::Speed, "fast"),
            (Field::Course, "-"),
            (Field::Heading, "unknown"),
        ]
        .into_iter()
        .collect();

        let record = normalize(Provider::MarineTraffic, &raw, None, "MarineTraffic");

        assert_eq!(record.speed, None);
        assert_eq!(record.course, None);
        assert_eq!(record.heading, None);
    }

    #[test]
    fn test_unavailable_heading_is_absent() {
        let unavailable: RawExtraction = vec![(Field::Heading, "511 °")].into_iter().collect();
        let known: RawExtraction = vec![(Field::Heading, "240")].into_iter().collect();

        assert_eq!(
            normalize(Provider::MarineTraffic, &unavailable, None, "MarineTraffic").heading,
            None
        );
        assert_eq!(
            normalize(Provider::MarineTraffic, &known, None, "MarineTraffic").heading,
            Some(240.0)
        );
    }

    #[test]
    fn test_zero_identifiers_are_absent() {
        let raw: RawExtraction = vec![(Field::Mmsi, "677350000"), (Field::Imo, "0")]
            .into_iter()
            .collect();

        let record = normalize(Provider::MarineTraffic, &raw, None, "MarineTraffic");

        assert_eq!(record.mmsi.as_deref(), Some("677350000"));
        assert_eq!(record.imo, None);
        assert_eq!(numeric_identifier("0000000"), None);
        assert_eq!(numeric_identifier("9321483").as_deref(), Some("9321483"));
    }

    #[test]
    fn test_comparison_id_is_passed_through() {
        let comparison_id = "  \"weird\" id/with:chars ";
        let record = normalize(
            Provider::VesselFinder,
            &RawExtraction::new(),
            Some(comparison_id),
            "VesselFinder",
        );

        assert_eq!(record.comparison_id.as_deref(), Some(comparison_id));
    }
}
