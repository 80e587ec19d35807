use crate::types::{EntryRecord, InstitutionType};
use serde::Serialize;
use std::collections::HashMap;

/// Aggregate figures backing the dashboard stat cards and charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_entries: usize,
    pub total_out_of_school: u64,
    pub school_children: u64,
    pub madrasa_children: u64,
    /// Percentage of children in the school bucket, 0 when nothing is counted.
    pub school_share: f64,
    pub madrasa_share: f64,
    pub districts: Vec<DistrictStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictStats {
    pub district: String,
    pub entries: usize,
    pub out_of_school: u64,
    pub share: f64,
}

/// Groups the loaded entries into program-wide and per-district totals.
/// Districts come out sorted by out-of-school count descending, name
/// ascending on ties, so the chart ordering is stable.
pub fn summarize(entries: &[EntryRecord]) -> StatsSummary {
    let mut school_children: u64 = 0;
    let mut madrasa_children: u64 = 0;
    let mut per_district: HashMap<String, (usize, u64)> = HashMap::new();

    for entry in entries {
        let count = entry.out_of_school_children as u64;
        match entry.school_type {
            InstitutionType::School => school_children += count,
            InstitutionType::Madrasa => madrasa_children += count,
        }
        let slot = per_district.entry(entry.district.clone()).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += count;
    }

    let total = school_children + madrasa_children;

    let mut districts: Vec<DistrictStats> = per_district
        .into_iter()
        .map(|(district, (entries, out_of_school))| DistrictStats {
            district,
            entries,
            out_of_school,
            share: percent(out_of_school, total),
        })
        .collect();
    districts.sort_by(|a, b| {
        b.out_of_school
            .cmp(&a.out_of_school)
            .then_with(|| a.district.cmp(&b.district))
    });

    StatsSummary {
        total_entries: entries.len(),
        total_out_of_school: total,
        school_children,
        madrasa_children,
        school_share: percent(school_children, total),
        madrasa_share: percent(madrasa_children, total),
        districts,
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
