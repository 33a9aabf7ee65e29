// rams-document-service/src/scoring.rs

use serde::{Deserialize, Serialize};

use crate::models::Risk;

pub const MIN_FACTOR: u8 = 1;
pub const MAX_FACTOR: u8 = 5;

/// Severity band of a risk rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskBand {
    /// Rating 1-4
    Low,
    /// Rating 5-9
    Medium,
    /// Rating 10-16
    High,
    /// Rating 17-25
    VeryHigh,
}

impl RiskBand {
    pub fn label(&self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
            RiskBand::VeryHigh => "Very High",
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Clamp a likelihood or severity value into 1..=5.
pub fn clamp_factor(value: u8) -> u8 {
    value.clamp(MIN_FACTOR, MAX_FACTOR)
}

/// Rating = likelihood x severity, with both factors clamped into range first.
pub fn compute_rating(likelihood: u8, severity: u8) -> u8 {
    clamp_factor(likelihood) * clamp_factor(severity)
}

pub fn classify_rating(rating: u8) -> RiskBand {
    match rating {
        0..=4 => RiskBand::Low,
        5..=9 => RiskBand::Medium,
        10..=16 => RiskBand::High,
        _ => RiskBand::VeryHigh,
    }
}

/// Default residual risk: half the rating, floored, never below 1.
pub fn compute_residual(rating: u8) -> u8 {
    (rating / 2).max(1)
}

/// Qualitative hazard level as supplied by hazard suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardLevel {
    VeryHigh,
    High,
    Medium,
    Other,
}

/// (level, likelihood, severity)
const HAZARD_LEVEL_FACTORS: [(HazardLevel, u8, u8); 4] = [
    (HazardLevel::VeryHigh, 5, 5),
    (HazardLevel::High, 4, 4),
    (HazardLevel::Medium, 3, 3),
    (HazardLevel::Other, 2, 2),
];

impl HazardLevel {
    /// Parse the qualitative label. Anything unrecognised maps to `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Very High" => HazardLevel::VeryHigh,
            "High" => HazardLevel::High,
            "Medium" => HazardLevel::Medium,
            _ => HazardLevel::Other,
        }
    }

    /// The (likelihood, severity) pair for this level.
    pub fn factors(&self) -> (u8, u8) {
        HAZARD_LEVEL_FACTORS
            .iter()
            .find(|(level, _, _)| level == self)
            .map(|&(_, likelihood, severity)| (likelihood, severity))
            .unwrap_or((2, 2))
    }
}

/// Aggregate statistics over a risk register.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummary {
    pub total: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub very_high: usize,
    pub average_rating: f64,
    pub highest_rating: u8,
}

pub fn summarize(risks: &[Risk]) -> RiskSummary {
    let mut summary = RiskSummary {
        total: risks.len(),
        ..Default::default()
    };
    if risks.is_empty() {
        return summary;
    }

    let mut sum = 0u32;
    for risk in risks {
        sum += u32::from(risk.risk_rating);
        summary.highest_rating = summary.highest_rating.max(risk.risk_rating);
        match classify_rating(risk.risk_rating) {
            RiskBand::Low => summary.low += 1,
            RiskBand::Medium => summary.medium += 1,
            RiskBand::High => summary.high += 1,
            RiskBand::VeryHigh => summary.very_high += 1,
        }
    }
    summary.average_rating = f64::from(sum) / risks.len() as f64;
    summary
}
