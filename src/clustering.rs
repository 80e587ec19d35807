use crate::config::MapConfig;
use crate::types::{ConcentrationCircle, EntryRecord, InstitutionType, Viewport};
use std::collections::HashSet;

// Cluster geometry. Distances are Euclidean in degree space, not geodesic;
// 0.05 degrees is roughly 5 km at the latitudes the program operates in.
pub const NEIGHBOR_RADIUS_DEG: f64 = 0.05;
/// A cluster bucket below this many children is not worth drawing.
pub const MIN_CLUSTER_CHILDREN: u32 = 10;

// Circle sizing: linear in the aggregated count, with a hard floor and
// ceiling so tiny clusters stay visible and huge ones don't swallow the map.
pub const RADIUS_PER_CHILD_M: f64 = 8.0;
pub const MIN_RADIUS_M: f64 = 800.0;
pub const MAX_RADIUS_M: f64 = 4000.0;

// Fill opacity scales with intensity, normalized against this many children.
pub const INTENSITY_DIVISOR: f64 = 500.0;
pub const MIN_FILL_OPACITY: f64 = 0.2;
pub const MAX_FILL_OPACITY: f64 = 0.7;

pub const STROKE_WEIGHT: u32 = 2;
pub const STROKE_OPACITY: f64 = 0.8;

pub const SCHOOL_COLOR: &str = "#dc2626";
pub const MADRASA_COLOR: &str = "#059669";

pub fn color_for(kind: InstitutionType) -> &'static str {
    match kind {
        InstitutionType::School => SCHOOL_COLOR,
        InstitutionType::Madrasa => MADRASA_COLOR,
    }
}

/// Result of one clustering pass: the circles to draw plus the viewport
/// that frames them. Rebuilt from scratch on every invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutcome {
    pub circles: Vec<ConcentrationCircle>,
    pub viewport: Viewport,
}

/// Groups nearby entries and aggregates out-of-school children per anchor
/// point and institution type.
///
/// Pure and total: malformed records are skipped, an empty or all-invalid
/// input yields an empty circle list and the default regional viewport.
/// O(n²) in the number of valid-coordinate entries; callers supply small,
/// already-filtered result sets, so no spatial index is used.
pub fn concentration_map(entries: &[EntryRecord], map: &MapConfig) -> ClusterOutcome {
    let mut processed: HashSet<String> = HashSet::new();
    let mut circles: Vec<ConcentrationCircle> = Vec::new();

    for anchor in entries {
        let Some((lat, lng)) = anchor.coords() else {
            continue;
        };
        // Zero-count records never anchor a cluster, but they still count
        // as neighbors of other anchors below.
        if anchor.out_of_school_children == 0 {
            continue;
        }
        let key = rounded_key(lat, lng);
        if processed.contains(&key) {
            continue;
        }

        // Everything within the proximity radius, the anchor included.
        // The neighbor check uses raw coordinates; rounding is only for
        // the dedup keys.
        let nearby: Vec<&EntryRecord> = entries
            .iter()
            .filter(|e| {
                e.coords().map_or(false, |(elat, elng)| {
                    degree_distance(lat, lng, elat, elng) <= NEIGHBOR_RADIUS_DEG
                })
            })
            .collect();

        // Records swallowed by this cluster stop being anchor candidates,
        // so one dense site emits one circle per type, not one per record.
        for e in &nearby {
            if let Some((elat, elng)) = e.coords() {
                processed.insert(rounded_key(elat, elng));
            }
        }

        for kind in [InstitutionType::School, InstitutionType::Madrasa] {
            let bucket_size = nearby.iter().filter(|e| e.school_type == kind).count();
            let sum: u32 = nearby
                .iter()
                .filter(|e| e.school_type == kind)
                .map(|e| e.out_of_school_children)
                .sum();
            if sum < MIN_CLUSTER_CHILDREN {
                continue;
            }
            circles.push(build_circle(anchor, lat, lng, kind, sum, bucket_size));
        }
    }

    // Largest circles last in paint order means largest on top; keep the
    // list itself count-descending and let renderers iterate in reverse.
    circles.sort_by(|a, b| b.count.cmp(&a.count));

    let viewport = frame_viewport(&circles, map);
    ClusterOutcome { circles, viewport }
}

fn build_circle(
    anchor: &EntryRecord,
    lat: f64,
    lng: f64,
    kind: InstitutionType,
    sum: u32,
    bucket_size: usize,
) -> ConcentrationCircle {
    let radius = (sum as f64 * RADIUS_PER_CHILD_M).clamp(MIN_RADIUS_M, MAX_RADIUS_M);
    let intensity = (sum as f64 / INTENSITY_DIVISOR).min(1.0);
    let fill_opacity = (intensity * MAX_FILL_OPACITY).clamp(MIN_FILL_OPACITY, MAX_FILL_OPACITY);

    ConcentrationCircle {
        center: [lat, lng],
        radius,
        color: color_for(kind),
        fill_color: color_for(kind),
        fill_opacity,
        weight: STROKE_WEIGHT,
        opacity: STROKE_OPACITY,
        circle_type: kind,
        count: sum,
        total_entries: bucket_size,
        district: anchor.district.clone(),
        tehsil: anchor.tehsil.clone(),
        union_council: anchor.unioncouncil.clone(),
        village_council: anchor.villagecouncil.clone(),
    }
}

fn frame_viewport(circles: &[ConcentrationCircle], map: &MapConfig) -> Viewport {
    if !circles.is_empty() {
        let n = circles.len() as f64;
        let lat = circles.iter().map(|c| c.center[0]).sum::<f64>() / n;
        let lng = circles.iter().map(|c| c.center[1]).sum::<f64>() / n;
        if lat.is_finite() && lng.is_finite() && lat != 0.0 && lng != 0.0 {
            return Viewport {
                center: [lat, lng],
                zoom: map.cluster_zoom,
            };
        }
    }
    tracing::debug!("no concentration data available, framing default region");
    Viewport {
        center: map.default_center,
        zoom: map.default_zoom,
    }
}

fn degree_distance(lat_a: f64, lng_a: f64, lat_b: f64, lng_b: f64) -> f64 {
    let dlat = lat_a - lat_b;
    let dlng = lng_a - lng_b;
    (dlat * dlat + dlng * dlng).sqrt()
}

/// Coordinates rounded to 4 decimal places (~11 m) identify an anchor site.
fn rounded_key(lat: f64, lng: f64) -> String {
    format!("{:.4}:{:.4}", lat, lng)
}
