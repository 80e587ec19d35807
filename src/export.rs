use crate::stats::StatsSummary;
use crate::types::ConcentrationCircle;
use anyhow::{anyhow, Context, Result};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes the circles as a GeoJSON FeatureCollection of points carrying the
/// full circle descriptor as properties, for direct use as a map overlay.
pub fn write_circles_geojson(path: &Path, circles: &[ConcentrationCircle]) -> Result<()> {
    let features = circles
        .iter()
        .map(|circle| {
            let properties = circle_properties(circle)?;
            Ok(Feature {
                bbox: None,
                // GeoJSON positions are [lng, lat].
                geometry: Some(Geometry::new(Value::Point(vec![
                    circle.center[1],
                    circle.center[0],
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect::<Result<Vec<Feature>>>()?;

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create GeoJSON output: {:?}", path))?;
    serde_json::to_writer(BufWriter::new(file), &collection)
        .context("Failed to write GeoJSON output")?;
    println!("Wrote {} circles to {:?}", circles.len(), path);
    Ok(())
}

fn circle_properties(circle: &ConcentrationCircle) -> Result<JsonObject> {
    match serde_json::to_value(circle).context("Failed to serialize circle")? {
        serde_json::Value::Object(mut obj) => {
            // The point geometry already carries the location.
            obj.remove("center");
            Ok(obj)
        }
        _ => Err(anyhow!("Circle did not serialize to an object")),
    }
}

pub fn write_circles_csv(path: &Path, circles: &[ConcentrationCircle]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create circles CSV: {:?}", path))?;
    wtr.write_record([
        "lat",
        "lng",
        "type",
        "count",
        "totalEntries",
        "radius",
        "fillOpacity",
        "district",
        "tehsil",
        "unioncouncil",
        "villagecouncil",
    ])?;
    for circle in circles {
        wtr.write_record([
            circle.center[0].to_string(),
            circle.center[1].to_string(),
            circle.circle_type.as_str().to_string(),
            circle.count.to_string(),
            circle.total_entries.to_string(),
            circle.radius.to_string(),
            circle.fill_opacity.to_string(),
            circle.district.clone(),
            circle.tehsil.clone(),
            circle.union_council.clone(),
            circle.village_council.clone(),
        ])?;
    }
    wtr.flush()?;
    println!("Wrote {} circles to {:?}", circles.len(), path);
    Ok(())
}

pub fn write_stats_csv(path: &Path, stats: &StatsSummary) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create stats CSV: {:?}", path))?;
    wtr.write_record(["district", "entries", "outOfSchool", "sharePercent"])?;
    for district in &stats.districts {
        wtr.write_record([
            district.district.clone(),
            district.entries.to_string(),
            district.out_of_school.to_string(),
            format!("{:.2}", district.share),
        ])?;
    }
    wtr.flush()?;
    println!("Wrote stats for {} districts to {:?}", stats.districts.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InstitutionType;

    fn circle(count: u32) -> ConcentrationCircle {
        ConcentrationCircle {
            center: [34.0, 71.5],
            radius: 800.0,
            color: "#dc2626",
            fill_color: "#dc2626",
            fill_opacity: 0.2,
            weight: 2,
            opacity: 0.8,
            circle_type: InstitutionType::School,
            count,
            total_entries: 1,
            district: "Peshawar".into(),
            tehsil: "Unknown".into(),
            union_council: "Unknown".into(),
            village_council: "Unknown".into(),
        }
    }

    #[test]
    fn geojson_points_are_lng_lat() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("oosc-export-test-{}.geojson", std::process::id()));
        write_circles_geojson(&path, &[circle(15)]).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let feature = &value["features"][0];
        assert_eq!(feature["geometry"]["coordinates"][0], 71.5);
        assert_eq!(feature["geometry"]["coordinates"][1], 34.0);
        assert_eq!(feature["properties"]["count"], 15);
        assert!(feature["properties"].get("center").is_none());

        let _ = std::fs::remove_file(&path);
    }
}
