use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which visual bucket an entry's children are counted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstitutionType {
    #[default]
    School,
    Madrasa,
}

impl InstitutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstitutionType::School => "school",
            InstitutionType::Madrasa => "madrasa",
        }
    }

    /// Boundary coercion: the backend sends `"Madrasa"` for madrasas and
    /// anything else (including nothing) means a regular school.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("Madrasa") => InstitutionType::Madrasa,
            _ => InstitutionType::School,
        }
    }
}

impl Serialize for InstitutionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One geotagged program entry as the backend API delivers it.
///
/// The backend contract is weakly typed: coordinates may arrive as numbers,
/// numeric strings, garbage strings, or be absent entirely. All coercion
/// happens here, once, so the clustering code only ever sees clean values.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryRecord {
    #[serde(default, deserialize_with = "de_coord")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "de_coord")]
    pub log: Option<f64>,
    #[serde(
        default,
        rename = "outOfSchoolChildren",
        deserialize_with = "de_count"
    )]
    pub out_of_school_children: u32,
    #[serde(default, rename = "schoolType", deserialize_with = "de_school_type")]
    pub school_type: InstitutionType,
    #[serde(default = "unknown_label", deserialize_with = "de_label")]
    pub district: String,
    #[serde(default = "unknown_label", deserialize_with = "de_label")]
    pub tehsil: String,
    #[serde(default = "unknown_label", deserialize_with = "de_label")]
    pub unioncouncil: String,
    #[serde(default = "unknown_label", deserialize_with = "de_label")]
    pub villagecouncil: String,
}

impl EntryRecord {
    /// Both coordinates present and finite, in (lat, lng) order.
    pub fn coords(&self) -> Option<(f64, f64)> {
        match (self.lat, self.log) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

// Some payloads encode numbers as strings; accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeNumber {
    Num(f64),
    Text(String),
}

impl MaybeNumber {
    fn as_finite(&self) -> Option<f64> {
        match self {
            MaybeNumber::Num(v) => Some(*v).filter(|v| v.is_finite()),
            MaybeNumber::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

fn de_coord<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let raw = Option::<MaybeNumber>::deserialize(de).unwrap_or(None);
    Ok(raw.and_then(|n| n.as_finite()))
}

fn de_count<'de, D: Deserializer<'de>>(de: D) -> Result<u32, D::Error> {
    let raw = Option::<MaybeNumber>::deserialize(de).unwrap_or(None);
    Ok(raw
        .and_then(|n| n.as_finite())
        .filter(|v| *v >= 0.0)
        .map(|v| v as u32)
        .unwrap_or(0))
}

fn de_school_type<'de, D: Deserializer<'de>>(de: D) -> Result<InstitutionType, D::Error> {
    let raw = Option::<String>::deserialize(de).unwrap_or(None);
    Ok(InstitutionType::from_label(raw.as_deref()))
}

// Absent fields skip `deserialize_with`, so the serde `default` must supply
// the same label `de_label` produces for null/empty values.
fn unknown_label() -> String {
    "Unknown".to_string()
}

fn de_label<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let raw = Option::<String>::deserialize(de).unwrap_or(None);
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string()))
}

/// Renderable summary of out-of-school children near one anchor point,
/// for one institution type. Field names follow the map frontend contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcentrationCircle {
    /// [latitude, longitude] of the anchor record.
    pub center: [f64; 2],
    /// Meters.
    pub radius: f64,
    pub color: &'static str,
    pub fill_color: &'static str,
    pub fill_opacity: f64,
    pub weight: u32,
    /// Stroke opacity, separate from the fill.
    pub opacity: f64,
    #[serde(rename = "type")]
    pub circle_type: InstitutionType,
    /// Aggregated out-of-school children within the cluster.
    pub count: u32,
    /// Number of source records contributing to the cluster.
    pub total_entries: usize,
    pub district: String,
    pub tehsil: String,
    #[serde(rename = "unioncouncil")]
    pub union_council: String,
    #[serde(rename = "villagecouncil")]
    pub village_council: String,
}

/// Map framing for the rendered circles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: [f64; 2],
    pub zoom: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_string_coordinates() {
        let entry: EntryRecord =
            serde_json::from_str(r#"{"lat": "34.01", "log": 71.52}"#).unwrap();
        assert_eq!(entry.coords(), Some((34.01, 71.52)));
    }

    #[test]
    fn rejects_garbage_coordinates() {
        let entry: EntryRecord =
            serde_json::from_str(r#"{"lat": "abc", "log": 71.52}"#).unwrap();
        assert_eq!(entry.lat, None);
        assert_eq!(entry.coords(), None);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let entry: EntryRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(entry.out_of_school_children, 0);
        assert_eq!(entry.school_type, InstitutionType::School);
        assert_eq!(entry.district, "Unknown");
        assert_eq!(entry.villagecouncil, "Unknown");
    }

    #[test]
    fn school_type_label_is_exact_match() {
        assert_eq!(
            InstitutionType::from_label(Some("Madrasa")),
            InstitutionType::Madrasa
        );
        assert_eq!(
            InstitutionType::from_label(Some("madrasa")),
            InstitutionType::School
        );
        assert_eq!(InstitutionType::from_label(None), InstitutionType::School);
    }

    #[test]
    fn circle_serializes_with_frontend_field_names() {
        let circle = ConcentrationCircle {
            center: [34.0, 71.5],
            radius: 800.0,
            color: "#dc2626",
            fill_color: "#dc2626",
            fill_opacity: 0.2,
            weight: 2,
            opacity: 0.8,
            circle_type: InstitutionType::School,
            count: 12,
            total_entries: 3,
            district: "Peshawar".into(),
            tehsil: "Unknown".into(),
            union_council: "Unknown".into(),
            village_council: "Unknown".into(),
        };
        let json = serde_json::to_value(&circle).unwrap();
        assert_eq!(json["fillColor"], "#dc2626");
        assert_eq!(json["fillOpacity"], 0.2);
        assert_eq!(json["type"], "school");
        assert_eq!(json["totalEntries"], 3);
        assert_eq!(json["unioncouncil"], "Unknown");
    }
}
