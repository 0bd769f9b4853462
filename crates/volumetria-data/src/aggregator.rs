//! Per-member and per-service-type counting of volumetry records.
//!
//! Restricts records to authorized users, narrows them to the selected
//! leadership group or user, and tallies service types per member and for
//! the whole selection.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;
use volumetria_core::models::Identifier;
use volumetria_core::settings::ALL_FILTER;

use crate::volumetry::VolumetryModel;

/// Day count reported for every team summary row.
///
/// There is no date-range input yet, so the average equals the quantity.
pub const SUMMARY_DAYS: u32 = 1;

// ── Selection ─────────────────────────────────────────────────────────────────

/// What a report covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Selection {
    /// Every authorized user.
    All,
    /// Members of one leadership group.
    Group(String),
    /// A single user.
    Member(Identifier),
}

impl Selection {
    /// Interpret selector text for a roster with or without grouping.
    ///
    /// `TODOS`/`ALL` (any case) and blank text select everyone. Otherwise the
    /// value names a group when the roster is grouped, or a user when flat.
    pub fn parse(raw: &str, has_grouping: bool) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case(ALL_FILTER)
            || trimmed.eq_ignore_ascii_case("ALL")
        {
            return Selection::All;
        }
        if has_grouping {
            return Selection::Group(trimmed.to_string());
        }
        match Identifier::normalize(trimmed) {
            Some(id) => Selection::Member(id),
            None => Selection::All,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => write!(f, "{}", ALL_FILTER),
            Selection::Group(name) => write!(f, "{}", name),
            Selection::Member(id) => write!(f, "{}", id),
        }
    }
}

// ── Result types ──────────────────────────────────────────────────────────────

/// Number of records of one service type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCount {
    pub service_type: String,
    pub count: u64,
}

/// Counts for one member. A member with no records has `total == 0` and no
/// services; it is still listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberBreakdown {
    pub member: Identifier,
    pub total: u64,
    /// Service types in order of first appearance in the volumetry table.
    pub services: Vec<ServiceCount>,
}

impl MemberBreakdown {
    fn from_tally(member: Identifier, tally: ServiceTally) -> Self {
        Self {
            member,
            total: tally.total,
            services: tally.counts,
        }
    }

    pub fn count_of(&self, service_type: &str) -> u64 {
        self.services
            .iter()
            .find(|s| s.service_type == service_type)
            .map(|s| s.count)
            .unwrap_or(0)
    }
}

/// One line of the team-level summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummaryRow {
    pub service_type: String,
    pub quantity: u64,
    pub days: u32,
    pub average: f64,
}

/// Everything one report shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub selection: Selection,
    /// Members sorted ascending by identifier.
    pub members: Vec<MemberBreakdown>,
    /// Service type → count across all members.
    pub team_totals: BTreeMap<String, u64>,
    pub grand_total: u64,
}

impl AggregationResult {
    /// Team totals sorted by service type, with the day-count placeholder.
    pub fn team_summary(&self) -> Vec<TeamSummaryRow> {
        self.team_totals
            .iter()
            .map(|(service_type, &quantity)| TeamSummaryRow {
                service_type: service_type.clone(),
                quantity,
                days: SUMMARY_DAYS,
                average: quantity as f64 / f64::from(SUMMARY_DAYS),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.grand_total == 0
    }
}

// ── ServiceTally ──────────────────────────────────────────────────────────────

/// Service counts that remember first-seen order.
#[derive(Debug, Clone, Default)]
struct ServiceTally {
    counts: Vec<ServiceCount>,
    index: HashMap<String, usize>,
    total: u64,
}

impl ServiceTally {
    fn add(&mut self, service_type: &str) {
        match self.index.get(service_type) {
            Some(&i) => self.counts[i].count += 1,
            None => {
                self.index
                    .insert(service_type.to_string(), self.counts.len());
                self.counts.push(ServiceCount {
                    service_type: service_type.to_string(),
                    count: 1,
                });
            }
        }
        self.total += 1;
    }
}

// ── ServiceAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that builds an [`AggregationResult`].
pub struct ServiceAggregator;

impl ServiceAggregator {
    /// Count the records of `model` for `selection`.
    ///
    /// Only records whose user is in `authorized` are considered. The member
    /// list always covers the whole selection: every authorized user for
    /// [`Selection::All`], the group's members for [`Selection::Group`]
    /// (none when the group is unknown), the user for [`Selection::Member`].
    /// Inputs are never modified.
    pub fn aggregate(
        model: &VolumetryModel,
        authorized: &BTreeSet<Identifier>,
        groups: &BTreeMap<String, Vec<Identifier>>,
        selection: &Selection,
    ) -> AggregationResult {
        let members: BTreeSet<Identifier> = match selection {
            Selection::All => authorized.clone(),
            Selection::Group(name) => groups
                .get(name)
                .map(|m| m.iter().cloned().collect())
                .unwrap_or_default(),
            Selection::Member(id) => BTreeSet::from([id.clone()]),
        };

        // BTreeMap keeps members sorted ascending.
        let mut tallies: BTreeMap<Identifier, ServiceTally> = members
            .into_iter()
            .map(|m| (m, ServiceTally::default()))
            .collect();

        for record in &model.records {
            if !authorized.contains(&record.user) {
                continue;
            }
            if let Some(tally) = tallies.get_mut(&record.user) {
                tally.add(&record.service_type);
            }
        }

        let mut team_totals: BTreeMap<String, u64> = BTreeMap::new();
        let mut grand_total = 0u64;
        let members: Vec<MemberBreakdown> = tallies
            .into_iter()
            .map(|(member, tally)| {
                for service in &tally.counts {
                    *team_totals.entry(service.service_type.clone()).or_insert(0) += service.count;
                }
                grand_total += tally.total;
                MemberBreakdown::from_tally(member, tally)
            })
            .collect();

        tracing::debug!(
            selection = %selection,
            members = members.len(),
            grand_total,
            "aggregation complete"
        );

        AggregationResult {
            selection: selection.clone(),
            members,
            team_totals,
            grand_total,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
