use crate::session::PageSnapshot;
use crate::vessel::{Field, RawExtraction};

struct LabelledPattern {
    fields: &'static [Field],
    regex: regex::Regex,
}

impl LabelledPattern {
    fn new(fields: &'static [Field], pattern: &str) -> Self {
        Self {
            fields,
            regex: regex::Regex::new(pattern).unwrap(),
        }
    }
}

lazy_static::lazy_static! {
    // capture groups map, in order, onto `fields`; earlier patterns take precedence
    static ref PATTERNS: Vec<LabelledPattern> = vec![
        LabelledPattern::new(
            &[Field::Course, Field::Speed],
            r"(?i)\bcourse\s*/\s*speed\b[:\s]*(\d+(?:\.\d+)?)\s*°?\s*/\s*(\d+(?:\.\d+)?)",
        ),
        LabelledPattern::new(
            &[Field::Lat, Field::Lon],
            r"(?i)(\d{1,2}(?:\.\d+)?\s*°?\s*[NS])\s*[/,]?\s*(\d{1,3}(?:\.\d+)?\s*°?\s*[EW])\b",
        ),
        LabelledPattern::new(
            &[Field::Lat],
            r"(?i)\blat(?:itude)?\b[:\s]*([+-]?\d+(?:\.\d+)?(?:\s*°)?(?:\s*[NS]\b)?)",
        ),
        LabelledPattern::new(
            &[Field::Lon],
            r"(?i)\b(?:lon|lng|longitude)\b[:\s]*([+-]?\d+(?:\.\d+)?(?:\s*°)?(?:\s*[EW]\b)?)",
        ),
        LabelledPattern::new(
            &[Field::Speed],
            r"(?i)\b(?:speed(?:\s*over\s*ground)?|sog)\b[:\s]*(\d+(?:\.\d+)?)\s*(?:kn|knots|kt)\b",
        ),
        LabelledPattern::new(
            &[Field::Speed],
            r"(?i)\b(?:speed(?:\s*over\s*ground)?|sog)\b[:\s]*(\d+(?:\.\d+)?)",
        ),
        LabelledPattern::new(
            &[Field::Course],
            r"(?i)\b(?:course(?:\s*over\s*ground)?|cog)\b[:\s]*(\d+(?:\.\d+)?)",
        ),
        LabelledPattern::new(
            &[Field::Heading],
            r"(?i)\b(?:true\s*heading|heading|hdg)\b[:\s]*(\d+(?:\.\d+)?)",
        ),
        LabelledPattern::new(
            &[Field::Draught],
            r"(?i)\b(?:draught|draft)\b[:\s]*(\d+(?:\.\d+)?)",
        ),
        LabelledPattern::new(&[Field::Mmsi], r"(?i)\bMMSI\b[:\s]*(\d{9})\b"),
        LabelledPattern::new(&[Field::Imo], r"(?i)\bIMO\b[:\s]*(\d{7})\b"),
        LabelledPattern::new(
            &[Field::Callsign],
            r"(?i)\bcall\s*sign\b[:\s]*([A-Z0-9]{3,8})\b",
        ),
        LabelledPattern::new(
            &[Field::Type],
            r"(?i)\b(?:vessel|ship|ais)\s*type\b[:\s]*([^\n\r,]+)",
        ),
        LabelledPattern::new(
            &[Field::Destination],
            r"(?i)\b(?:destination|next\s*port|bound\s*for)\b[:\s]*([^\n\r,]+)",
        ),
        LabelledPattern::new(
            &[Field::NavStatus],
            r"(?i)\b(?:navigation(?:al)?\s*status|nav\s*status|status)\b[:\s]*([^\n\r,]+)",
        ),
        LabelledPattern::new(
            &[Field::Timestamp],
            r"(?i)\b(?:position\s*received|last\s*report|last\s*update)\b[:\s]*([^\n\r]+)",
        ),
    ];
}

/// last resort: labelled values anywhere in the visible text of the page
pub struct TextStrategy;

impl crate::extract::Strategy for TextStrategy {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extract(&self, page: &PageSnapshot) -> RawExtraction {
        extract_from_text(&page.rendered_text())
    }
}

pub fn extract_from_text(text: &str) -> RawExtraction {
    let mut extraction = RawExtraction::new();

    for pattern in PATTERNS.iter() {
        if pattern.fields.iter().all(|field| extraction.contains(*field)) {
            continue;
        }

        if let Some(captures) = pattern.regex.captures(text) {
            for (index, field) in pattern.fields.iter().enumerate() {
                if let Some(value) = captures.get(index + 1) {
                    let value = value.as_str().trim();
                    if crate::normalize::is_placeholder(value) {
                        continue;
                    }
                    let value = match field {
                        Field::Lat | Field::Lon => crate::extract::signed_coordinate(value),
                        _ => value.to_string(),
                    };
                    extraction.fill(*field, value);
                }
            }
        }
    }

    extraction
}
