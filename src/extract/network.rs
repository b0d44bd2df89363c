use crate::session::{CapturedResponse, PageSnapshot};
use crate::vessel::RawExtraction;

const URL_KEYWORDS: [&str; 6] = ["vessel", "ship", "ais", "position", "track", "coordinates"];

/// reads the vessel API responses captured while the page loaded
pub struct NetworkStrategy;

impl crate::extract::Strategy for NetworkStrategy {
    fn name(&self) -> &'static str {
        "network"
    }

    fn extract(&self, page: &PageSnapshot) -> RawExtraction {
        let mut extraction = RawExtraction::new();

        for response in page
            .responses
            .iter()
            .filter(|response| (200..300).contains(&response.status))
            .filter(|response| is_vessel_endpoint(response))
        {
            // bodies that are not JSON (images, HTML) carry nothing
            if let Some(value) = response.json() {
                crate::extract::collect_json(&value, &mut extraction);
            }
        }

        extraction
    }
}

fn is_vessel_endpoint(response: &CapturedResponse) -> bool {
    let url = response.url.to_lowercase();
    let path = url.split(['?', '#']).next().unwrap_or("");
    !path.ends_with(".svg") && URL_KEYWORDS.iter().any(|keyword| url.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Strategy;
    use crate::vessel::Field;

    #[test]
    fn test_position_response() {
        let page = PageSnapshot::default().with_responses(vec![
            CapturedResponse::new(
                "https://www.marinetraffic.com/en/vessels/5630138/position",
                200,
                r#"{"lat": 4808785, "lon": 7059156.9, "speed": 0, "course": 187, "timestamp": 1659286185, "shipname": "PRESIDO"}"#,
            ),
            CapturedResponse::new(
                "https://www.marinetraffic.com/en/vessels/5630138/general",
                200,
                r#"{"name": "SOMETHING ELSE", "mmsi": "677350000", "imo": 0, "callsign": "5IM535", "type": "Tanker"}"#,
            ),
        ]);

        let extraction = NetworkStrategy.extract(&page);

        assert_eq!(extraction.get(Field::Lat), Some("4808785"));
        assert_eq!(extraction.get(Field::Lon), Some("7059156.9"));
        assert_eq!(extraction.get(Field::Speed), Some("0"));
        assert_eq!(extraction.get(Field::Name), Some("PRESIDO"));
        assert_eq!(extraction.get(Field::Mmsi), Some("677350000"));
        assert_eq!(extraction.get(Field::Callsign), Some("5IM535"));
        assert_eq!(extraction.get(Field::Timestamp), Some("1659286185"));
    }

    #[test]
    fn test_unrelated_and_malformed_responses() {
        let page = PageSnapshot::default().with_responses(vec![
            CapturedResponse::new("https://www.vesselfinder.com/api/pub/click/226013370", 200, "{\"lat\": 4.8, "),
            CapturedResponse::new("https://cdn.example.com/analytics.js", 200, r#"{"lat": 51.5}"#),
            CapturedResponse::new("https://static.vesselfinder.com/ship-icons/tanker.svg", 200, r#"{"lat": 51.5}"#),
            CapturedResponse::new("https://www.marinetraffic.com/en/vessels/1/position", 403, "<html>Forbidden</html>"),
            CapturedResponse::new(
                "https://www.marinetraffic.com/en/vessels/1/general",
                403,
                r#"{"status": 403, "message": "Forbidden"}"#,
            ),
        ]);

        let extraction = NetworkStrategy.extract(&page);

        assert!(extraction.is_empty());
    }

    #[test]
    fn test_error_responses_are_not_vessel_data() {
        let page = PageSnapshot::default().with_responses(vec![
            CapturedResponse::new(
                "https://www.marinetraffic.com/en/vessels/5630138/position",
                403,
                r#"{"status": 403, "name": "Forbidden"}"#,
            ),
            CapturedResponse::new(
                "https://www.marinetraffic.com/en/vessels/5630138/general",
                200,
                r#"{"status": "Moored", "name": "PRESIDO"}"#,
            ),
        ]);

        let extraction = NetworkStrategy.extract(&page);

        assert_eq!(extraction.get(Field::NavStatus), Some("Moored"));
        assert_eq!(extraction.get(Field::Name), Some("PRESIDO"));
    }

    #[test]
    fn test_vessel_endpoint() {
        assert!(is_vessel_endpoint(&CapturedResponse::new(
            "https://www.vesselfinder.com/api/pub/track/226013370?ts=1",
            200,
            ""
        )));
        assert!(!is_vessel_endpoint(&CapturedResponse::new(
            "https://www.vesselfinder.com/images/ship.svg?v=2",
            200,
            ""
        )));
    }
}
