#[derive(serde::Deserialize, serde::Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    MarineTraffic,
    VesselFinder,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::MarineTraffic, Provider::VesselFinder];

    /// the vendor's own brand string, as it appears in page titles
    pub fn brand(&self) -> &'static str {
        match self {
            Self::MarineTraffic => "MarineTraffic",
            Self::VesselFinder => "VesselFinder",
        }
    }

    pub fn default_distinct_id(&self) -> &'static str {
        match self {
            Self::MarineTraffic => "selenium_scraper",
            Self::VesselFinder => "vesselfinder_scraper",
        }
    }

    /// whether the given text is one of the spellings of this provider's brand
    pub fn is_brand(&self, text: &str) -> bool {
        let text = text.trim().to_lowercase();
        let brand = self.brand().to_lowercase();
        text == brand || text.replace(' ', "") == brand
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:}", self.brand())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "marinetraffic" => Ok(Self::MarineTraffic),
            "vesselfinder" => Ok(Self::VesselFinder),
            other => Err(format!("unknown provider: {:}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VesselIdentifier {
    Mmsi(String),
    Imo(String),
}

impl VesselIdentifier {
    pub fn mmsi(value: &str) -> Result<Self, crate::scrape::ScrapeError> {
        Ok(Self::Mmsi(clean_identifier("MMSI", value)?))
    }

    pub fn imo(value: &str) -> Result<Self, crate::scrape::ScrapeError> {
        Ok(Self::Imo(clean_identifier("IMO", value)?))
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Mmsi(value) | Self::Imo(value) => value,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mmsi(_) => "MMSI",
            Self::Imo(_) => "IMO",
        }
    }
}

impl std::fmt::Display for VesselIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:} {:}", self.kind(), self.value())
    }
}

fn clean_identifier(kind: &str, value: &str) -> Result<String, crate::scrape::ScrapeError> {
    let cleaned = crate::normalize::clean_identifier(value);
    if !cleaned.is_empty() && cleaned.chars().all(|character| character.is_ascii_digit()) {
        Ok(cleaned)
    } else {
        Err(crate::scrape::ScrapeError::Configuration {
            message: format!("{:} must be numeric; got {:?}", kind, value),
        })
    }
}

/// semantic fields a strategy can extract from a vessel page
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Mmsi,
    Imo,
    Name,
    Callsign,
    Type,
    Lat,
    Lon,
    Speed,
    Course,
    Heading,
    Draught,
    NavStatus,
    Destination,
    Timestamp,
}

impl Field {
    pub const ALL: [Field; 14] = [
        Field::Mmsi,
        Field::Imo,
        Field::Name,
        Field::Callsign,
        Field::Type,
        Field::Lat,
        Field::Lon,
        Field::Speed,
        Field::Course,
        Field::Heading,
        Field::Draught,
        Field::NavStatus,
        Field::Destination,
        Field::Timestamp,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Mmsi => "mmsi",
            Self::Imo => "imo",
            Self::Name => "name",
            Self::Callsign => "callsign",
            Self::Type => "type",
            Self::Lat => "lat",
            Self::Lon => "lon",
            Self::Speed => "speed",
            Self::Course => "course",
            Self::Heading => "heading",
            Self::Draught => "draught",
            Self::NavStatus => "nav_status",
            Self::Destination => "destination",
            Self::Timestamp => "timestamp",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:}", self.key())
    }
}

/// raw textual values, keyed by field, as found on a page before normalization
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawExtraction {
    fields: std::collections::BTreeMap<Field, String>,
}

impl RawExtraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(|value| value.as_str())
    }

    pub fn remove(&mut self, field: Field) -> Option<String> {
        self.fields.remove(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    /// store a value unless the field is already filled; returns whether it was stored
    pub fn fill(&mut self, field: Field, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.contains(field) || value.trim().is_empty() {
            return false;
        }
        self.fields.insert(field, value);
        true
    }

    /// fill every field this extraction lacks from `other`, returning the fields that were taken
    pub fn merge(&mut self, other: RawExtraction) -> Vec<Field> {
        let mut filled = vec![];
        for (field, value) in other.fields {
            if self.fill(field, value) {
                filled.push(field);
            }
        }
        filled
    }

    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| !self.contains(*field))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(Field, S)> for RawExtraction {
    fn from_iter<I: IntoIterator<Item = (Field, S)>>(iter: I) -> Self {
        let mut extraction = Self::new();
        for (field, value) in iter {
            extraction.fill(field, value);
        }
        extraction
    }
}

/// canonical output of one scrape
#[derive(serde::Serialize, Clone, Debug, PartialEq)]
pub struct VesselRecord {
    pub provider: Provider,
    pub mmsi: Option<String>,
    pub imo: Option<String>,
    pub name: Option<String>,
    pub callsign: Option<String>,
    #[serde(rename = "type")]
    pub vessel_type: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub speed: Option<f64>,
    pub course: Option<f64>,
    pub heading: Option<f64>,
    pub draught: Option<f64>,
    pub nav_status: Option<String>,
    pub destination: Option<String>,
    pub timestamp: Option<String>,
    pub comparison_id: Option<String>,
    pub data_source: String,
}

impl VesselRecord {
    /// a record carrying only provenance
    pub fn empty(provider: Provider, data_source: String, comparison_id: Option<String>) -> Self {
        Self {
            provider,
            mmsi: None,
            imo: None,
            name: None,
            callsign: None,
            vessel_type: None,
            lat: None,
            lon: None,
            speed: None,
            course: None,
            heading: None,
            draught: None,
            nav_status: None,
            destination: None,
            timestamp: None,
            comparison_id,
            data_source,
        }
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn populated_fields(&self) -> usize {
        [
            self.mmsi.is_some(),
            self.imo.is_some(),
            self.name.is_some(),
            self.callsign.is_some(),
            self.vessel_type.is_some(),
            self.lat.is_some(),
            self.lon.is_some(),
            self.speed.is_some(),
            self.course.is_some(),
            self.heading.is_some(),
            self.draught.is_some(),
            self.nav_status.is_some(),
            self.destination.is_some(),
            self.timestamp.is_some(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }
}
