use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub String);

impl ClaimId {
    /// Lookup key form: trimmed, uppercased, interior whitespace removed so
    /// spoken ids like "clm 201" resolve to "CLM201".
    pub fn normalized(&self) -> String {
        self.0
            .trim()
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| ch.to_ascii_uppercase())
            .collect()
    }
}

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    AutoAccident,
    PropertyDamage,
    WaterDamage,
    Theft,
    #[default]
    Other,
}

impl ClaimType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AutoAccident => "Auto Accident",
            Self::PropertyDamage => "Property Damage",
            Self::WaterDamage => "Water Damage",
            Self::Theft => "Vehicle Theft",
            Self::Other => "Other",
        }
    }

    /// Lenient parse for values arriving from conversational tool calls;
    /// unrecognized inputs fall back to `Other` rather than failing the call.
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        if normalized.contains("auto") || normalized.contains("vehicle accident") {
            Self::AutoAccident
        } else if normalized.contains("water") || normalized.contains("flood") {
            Self::WaterDamage
        } else if normalized.contains("theft") || normalized.contains("stolen") {
            Self::Theft
        } else if normalized.contains("property") || normalized.contains("home") {
            Self::PropertyDamage
        } else {
            Self::Other
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Open,
    PendingSettlement,
    Escalated,
    Closed,
}

impl ClaimStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::PendingSettlement => "Active - Settlement Pending",
            Self::Escalated => "Escalated",
            Self::Closed => "Closed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRange {
    pub min: Decimal,
    pub max: Decimal,
    pub recommended: Decimal,
}

impl SettlementRange {
    pub fn new(min: Decimal, recommended: Decimal, max: Decimal) -> Result<Self, DomainError> {
        if min < Decimal::ZERO {
            return Err(DomainError::InvariantViolation(
                "settlement range minimum must be non-negative".to_owned(),
            ));
        }
        if !(min <= recommended && recommended <= max) {
            return Err(DomainError::InvalidSettlementRange { min, recommended, max });
        }
        Ok(Self { min, max, recommended })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub id: ClaimId,
    pub policy_number: String,
    pub claimant_name: String,
    pub incident_date: NaiveDate,
    pub claim_type: ClaimType,
    pub estimated_damage: Decimal,
    pub status: ClaimStatus,
    pub settlement_range: SettlementRange,
    pub priority: PriorityTier,
}

impl ClaimRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ClaimId,
        policy_number: impl Into<String>,
        claimant_name: impl Into<String>,
        incident_date: NaiveDate,
        claim_type: ClaimType,
        estimated_damage: Decimal,
        status: ClaimStatus,
        settlement_range: SettlementRange,
        priority: PriorityTier,
    ) -> Result<Self, DomainError> {
        if estimated_damage < Decimal::ZERO {
            return Err(DomainError::InvariantViolation(
                "estimated damage must be non-negative".to_owned(),
            ));
        }
        Ok(Self {
            id,
            policy_number: policy_number.into(),
            claimant_name: claimant_name.into(),
            incident_date,
            claim_type,
            estimated_damage,
            status,
            settlement_range,
            priority,
        })
    }
}
