//! # Distributor Tiering
//!
//! Derives an advisory distributor tier from the free-text coverage area an
//! applicant types in.
//!
//! ```text
//! "Lagos, Ogun & Oyo"          ──► 3 states  ──► tier2
//! "South-West"                 ──► ≥4 states ──► tier2
//! "Nationwide"                 ──► 37        ──► tier3
//! "Kano"                       ──► 1         ──► tier1
//! ```
//!
//! This is a heuristic. It never blocks a submission and an admin can see
//! the raw coverage text next to the derived tier.

use crate::types::DistributorTier;
use crate::NATIONWIDE_STATE_COUNT;

/// Phrases that mean the whole federation.
const NATIONAL_KEYWORDS: &[&str] = &[
    "nationwide",
    "all states",
    "all 36 states",
    "across nigeria",
    "national coverage",
];

/// Geopolitical zones. Naming one implies several states.
const REGION_KEYWORDS: &[&str] = &[
    "south-west",
    "south west",
    "southwest",
    "south-east",
    "south east",
    "southeast",
    "south-south",
    "south south",
    "north-central",
    "north central",
    "northcentral",
    "north-east",
    "north east",
    "northeast",
    "north-west",
    "north west",
    "northwest",
];

/// Minimum state count assumed when a geopolitical zone is named.
const REGION_MIN_STATES: usize = 4;

/// Estimates how many states a coverage description spans.
///
/// Segments are separated by `,`, `&`, `+`, `/` or the word `and`; empty
/// segments are ignored.
pub fn count_coverage_states(coverage: &str) -> usize {
    let text = coverage.to_lowercase();

    if NATIONAL_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return NATIONWIDE_STATE_COUNT;
    }

    let count = text
        .split(|c: char| matches!(c, ',' | '&' | '+' | '/'))
        .flat_map(|part| part.split(" and "))
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && *segment != "and")
        .count();

    if REGION_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        count.max(REGION_MIN_STATES)
    } else {
        count
    }
}

impl DistributorTier {
    /// `<3` ⇒ tier1, `3..=5` ⇒ tier2, `≥6` ⇒ tier3.
    pub fn from_state_count(states: usize) -> Self {
        match states {
            0..=2 => DistributorTier::Tier1,
            3..=5 => DistributorTier::Tier2,
            _ => DistributorTier::Tier3,
        }
    }
}

/// Tier for a coverage description.
pub fn distributor_tier(coverage: &str) -> DistributorTier {
    DistributorTier::from_state_count(count_coverage_states(coverage))
}
