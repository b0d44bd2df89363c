use crate::session::PageSnapshot;
use crate::vessel::{Field, RawExtraction};

lazy_static::lazy_static! {
    static ref OBJECT_ASSIGNMENT: regex::Regex = regex::Regex::new(
        r"(?:\b(?:var|let|const)\s+|\bwindow\.)(?:vessel|vesselData|ship|shipData|aisData)\s*=\s*\{"
    )
    .unwrap();
    static ref SCALAR_ASSIGNMENT: regex::Regex = regex::Regex::new(
        r#"(?:\b(?:var|let|const)\s+|\bwindow\.)(vesselLat|vesselLon|shipLat|shipLon|vesselSpeed|vesselCourse|vesselHeading)\s*=\s*["']?([+-]?\d+(?:\.\d+)?)"#
    )
    .unwrap();
}

/// reads vessel data the page's own scripts assign to globals
pub struct ScriptStrategy;

impl crate::extract::Strategy for ScriptStrategy {
    fn name(&self) -> &'static str {
        "script"
    }

    fn extract(&self, page: &PageSnapshot) -> RawExtraction {
        let mut extraction = RawExtraction::new();
        let selector = match scraper::Selector::parse("script") {
            Ok(selector) => selector,
            Err(_) => return extraction,
        };

        let document = page.document();
        for script in document.select(&selector) {
            let body = script.text().collect::<String>();
            let kind = script.value().attr("type").unwrap_or("").to_lowercase();

            if kind.contains("json") {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(body.trim()) {
                    crate::extract::collect_json(&value, &mut extraction);
                }
                continue;
            }

            for assignment in OBJECT_ASSIGNMENT.find_iter(&body) {
                let start = assignment.end() - 1;
                if let Some(object) = balanced_object(&body[start..]) {
                    if let Ok(value) = serde_json::from_str::<serde_json::Value>(object) {
                        crate::extract::collect_json(&value, &mut extraction);
                    }
                }
            }

            for captures in SCALAR_ASSIGNMENT.captures_iter(&body) {
                if let Some(field) = scalar_field(&captures[1]) {
                    extraction.fill(field, &captures[2]);
                }
            }
        }

        extraction
    }
}

fn scalar_field(name: &str) -> Option<Field> {
    match name {
        "vesselLat" | "shipLat" => Some(Field::Lat),
        "vesselLon" | "shipLon" => Some(Field::Lon),
        "vesselSpeed" => Some(Field::Speed),
        "vesselCourse" => Some(Field::Course),
        "vesselHeading" => Some(Field::Heading),
        _ => None,
    }
}

/// the `{ ... }` literal at the start of `text`, honouring nested braces and quoted strings
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (index, character) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if character == '\\' {
                escaped = true;
            } else if character == open {
                quote = None;
            }
            continue;
        }

        match character {
            '"' | '\'' => quote = Some(character),
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }

    None
}
