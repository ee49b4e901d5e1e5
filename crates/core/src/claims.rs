use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::claim::{
    ClaimId, ClaimRecord, ClaimStatus, ClaimType, PriorityTier, SettlementRange,
};

/// Read-only claim lookup, seeded once at startup and shared across the
/// session. Keys are normalized claim ids, so lookups are case- and
/// whitespace-insensitive.
#[derive(Debug, Default)]
pub struct ClaimStore {
    records: HashMap<String, ClaimRecord>,
}

impl ClaimStore {
    pub fn new(seeds: Vec<ClaimRecord>) -> Self {
        let mut records = HashMap::with_capacity(seeds.len());
        for record in seeds {
            records.insert(record.id.normalized(), record);
        }
        Self { records }
    }

    /// Store seeded with the demo book of business used by the scripted
    /// negotiation scenario.
    pub fn demo() -> Self {
        Self::new(demo_seeds())
    }

    pub fn lookup(&self, claim_id: &ClaimId) -> Option<&ClaimRecord> {
        self.records.get(&claim_id.normalized())
    }

    pub fn lookup_str(&self, claim_id: &str) -> Option<&ClaimRecord> {
        self.lookup(&ClaimId(claim_id.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn demo_seeds() -> Vec<ClaimRecord> {
    vec![
        ClaimRecord {
            id: ClaimId("CLM201".to_owned()),
            policy_number: "POL-88421".to_owned(),
            claimant_name: "Nachiket Kulkarni".to_owned(),
            incident_date: date(2024, 8, 15),
            claim_type: ClaimType::AutoAccident,
            estimated_damage: Decimal::new(15_750, 0),
            status: ClaimStatus::PendingSettlement,
            settlement_range: range(12_000, 14_500, 18_000),
            priority: PriorityTier::High,
        },
        ClaimRecord {
            id: ClaimId("CLM002".to_owned()),
            policy_number: "POL-55102".to_owned(),
            claimant_name: "Sarah Chen".to_owned(),
            incident_date: date(2024, 7, 2),
            claim_type: ClaimType::WaterDamage,
            estimated_damage: Decimal::new(8_500, 0),
            status: ClaimStatus::Open,
            settlement_range: range(6_000, 7_800, 9_500),
            priority: PriorityTier::Medium,
        },
        ClaimRecord {
            id: ClaimId("CLM003".to_owned()),
            policy_number: "POL-73918".to_owned(),
            claimant_name: "Mike Rodriguez".to_owned(),
            incident_date: date(2024, 8, 1),
            claim_type: ClaimType::Theft,
            estimated_damage: Decimal::new(22_000, 0),
            status: ClaimStatus::Open,
            settlement_range: range(18_000, 21_000, 24_000),
            priority: PriorityTier::High,
        },
    ]
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn range(min: i64, recommended: i64, max: i64) -> SettlementRange {
    SettlementRange {
        min: Decimal::new(min, 0),
        max: Decimal::new(max, 0),
        recommended: Decimal::new(recommended, 0),
    }
}
