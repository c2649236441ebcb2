//! Environmental-impact projection over an account's delivery history.

use crate::types::{ActivityKind, ActivityRecord, EnvironmentalImpact};

/// kg of CO₂ avoided per kg of organic waste diverted from landfill.
pub const CO2_PER_KG: f64 = 0.5;
/// kg of finished compost per kg of organic waste.
pub const COMPOST_PER_KG: f64 = 0.3;
/// m³ of biogas per kg of organic waste.
pub const BIOGAS_PER_KG: f64 = 0.1;
/// kg of CO₂ one tree absorbs in a year.
pub const CO2_PER_TREE: f64 = 21.0;

/// Total kilograms delivered, summed over earn records.
pub fn delivered_kilograms<'a>(records: impl IntoIterator<Item = &'a ActivityRecord>) -> f64 {
    records
        .into_iter()
        .filter(|r| r.kind == ActivityKind::Earn)
        .filter_map(|r| r.kilograms)
        .sum()
}

pub fn estimate<'a>(records: impl IntoIterator<Item = &'a ActivityRecord>) -> EnvironmentalImpact {
    let kilograms = delivered_kilograms(records);
    let co2 = kilograms * CO2_PER_KG;
    EnvironmentalImpact {
        co2_avoided_kg: round1(co2),
        compost_generated_kg: round1(kilograms * COMPOST_PER_KG),
        biogas_produced_m3: round1(kilograms * BIOGAS_PER_KG),
        trees_equivalent: round1(co2 / CO2_PER_TREE),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
