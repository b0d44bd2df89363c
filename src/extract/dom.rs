use crate::session::PageSnapshot;
use crate::vessel::{Field, Provider, RawExtraction};

const MARINETRAFFIC_NAME_SELECTORS: [&str; 4] = ["h1", ".page-title", ".vessel-name", ".ship-name"];
const VESSELFINDER_NAME_SELECTORS: [&str; 6] = [
    "h1",
    "h2",
    ".vessel-name",
    ".ship-name",
    "div[class*=\"vessel\"] h1",
    "span[class*=\"name\"]",
];
const DATA_ATTRIBUTE_SELECTOR: &str =
    "[data-mmsi], [data-imo], [data-lat], [data-lon], [data-lng], [data-speed], [data-course], [data-heading]";
const LABELLED_TEXT_SELECTOR: &str = "li, p, span, div";
const MAXIMUM_LABELLED_TEXT_LENGTH: usize = 80;

/// reads headings, labelled table rows and data attributes of the rendered page
pub struct DomStrategy {
    provider: Provider,
}

impl DomStrategy {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    fn name_selectors(&self) -> &'static [&'static str] {
        match self.provider {
            Provider::MarineTraffic => &MARINETRAFFIC_NAME_SELECTORS,
            Provider::VesselFinder => &VESSELFINDER_NAME_SELECTORS,
        }
    }

    /// first heading-like text that is neither a placeholder nor the site's own brand
    fn vessel_name(&self, document: &scraper::Html) -> Option<String> {
        for selector in self.name_selectors() {
            let selector = match scraper::Selector::parse(selector) {
                Ok(selector) => selector,
                Err(_) => continue,
            };

            for element in document.select(&selector) {
                let text = element_text(&element);
                if text.chars().count() >= 2 && crate::extract::is_vessel_name(self.provider, &text) {
                    return Some(text);
                }
            }
        }

        None
    }
}

impl crate::extract::Strategy for DomStrategy {
    fn name(&self) -> &'static str {
        "dom"
    }

    fn extract(&self, page: &PageSnapshot) -> RawExtraction {
        let document = page.document();
        let mut extraction = RawExtraction::new();

        if let Some(name) = self.vessel_name(&document) {
            extraction.fill(Field::Name, name);
        }

        for (label, value) in table_rows(&document)
            .into_iter()
            .chain(definition_rows(&document))
            .chain(labelled_text(&document))
        {
            for (field, value) in crate::extract::labelled_values(&label, &value) {
                extraction.fill(field, value);
            }
        }

        if let Ok(selector) = scraper::Selector::parse(DATA_ATTRIBUTE_SELECTOR) {
            for element in document.select(&selector) {
                for (attribute, value) in element.value().attrs() {
                    if let Some(field) = attribute
                        .strip_prefix("data-")
                        .and_then(crate::extract::field_for_key)
                    {
                        if !crate::normalize::is_placeholder(value) {
                            extraction.fill(field, value.trim());
                        }
                    }
                }
            }
        }

        extraction
    }
}

fn element_text(element: &scraper::ElementRef) -> String {
    element
        .text()
        .flat_map(|text| text.split_whitespace())
        .collect::<Vec<&str>>()
        .join(" ")
}

/// `<tr><td>label</td><td>value</td></tr>`
fn table_rows(document: &scraper::Html) -> Vec<(String, String)> {
    let (row_selector, cell_selector) = match (
        scraper::Selector::parse("tr"),
        scraper::Selector::parse("th, td"),
    ) {
        (Ok(row), Ok(cell)) => (row, cell),
        _ => return vec![],
    };

    document
        .select(&row_selector)
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&cell_selector).map(|cell| element_text(&cell)).collect();
            match cells.as_slice() {
                [label, value, ..] => Some((label.to_owned(), value.to_owned())),
                _ => None,
            }
        })
        .collect()
}

/// `<dt>label</dt><dd>value</dd>`
fn definition_rows(document: &scraper::Html) -> Vec<(String, String)> {
    let selector = match scraper::Selector::parse("dt") {
        Ok(selector) => selector,
        Err(_) => return vec![],
    };

    document
        .select(&selector)
        .filter_map(|term| {
            let definition = term
                .next_siblings()
                .filter_map(scraper::ElementRef::wrap)
                .next()
                .filter(|sibling| sibling.value().name() == "dd")?;
            Some((element_text(&term), element_text(&definition)))
        })
        .collect()
}

/// leaf elements reading `Label: value`
fn labelled_text(document: &scraper::Html) -> Vec<(String, String)> {
    let selector = match scraper::Selector::parse(LABELLED_TEXT_SELECTOR) {
        Ok(selector) => selector,
        Err(_) => return vec![],
    };

    document
        .select(&selector)
        .filter(|element| !element.children().any(|child| child.value().is_element()))
        .filter_map(|element| {
            let text = element_text(&element);
            if text.len() > MAXIMUM_LABELLED_TEXT_LENGTH {
                return None;
            }
            let (label, value) = text.split_once(':')?;
            Some((label.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
