use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::board::CellDeduction;

/// Deduction technique (ordered by priority, simplest first).
///
/// The discriminant order is the dispatch order: the dispatcher tries
/// techniques ascending and returns the first that produces a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Technique {
    // Basic crossing
    TwoByTwo,
    FiveCrosses,

    // Candidate counting
    CandidateDeficit,
    PartitionedCandidates,
    SharedLine,

    // Band vs region budgets
    RowBandBudget,
    ColumnBandBudget,
    RegionRowPartition,
    RegionColumnPartition,

    // Exclusive-area framings
    ExclusiveRowBand,
    ExclusiveColumnBand,
    ExclusiveRegionRows,
    ExclusiveRegionCols,
    RegionBandSqueeze,

    // 2×2 cage reasoning
    BandCages,
    CagesVsRegionQuota,
    RegionCages,
    CageExclusion,

    // Intersections
    RowColumnSqueeze,
    RegionBandIntersection,

    // Multi-region coupling
    RegionPairExclusion,
    PressuredTees,

    // Constraint subset analysis
    SubsetSqueeze,

    // Entanglement patterns
    Entanglement,

    // Reserved: chain reasoning emerges from repeated application of the
    // techniques above; the slot never emits findings.
    Chains,
}

impl Technique {
    /// Every technique, in dispatch order.
    pub const ALL: &'static [Technique] = &[
        Technique::TwoByTwo,
        Technique::FiveCrosses,
        Technique::CandidateDeficit,
        Technique::PartitionedCandidates,
        Technique::SharedLine,
        Technique::RowBandBudget,
        Technique::ColumnBandBudget,
        Technique::RegionRowPartition,
        Technique::RegionColumnPartition,
        Technique::ExclusiveRowBand,
        Technique::ExclusiveColumnBand,
        Technique::ExclusiveRegionRows,
        Technique::ExclusiveRegionCols,
        Technique::RegionBandSqueeze,
        Technique::BandCages,
        Technique::CagesVsRegionQuota,
        Technique::RegionCages,
        Technique::CageExclusion,
        Technique::RowColumnSqueeze,
        Technique::RegionBandIntersection,
        Technique::RegionPairExclusion,
        Technique::PressuredTees,
        Technique::SubsetSqueeze,
        Technique::Entanglement,
        Technique::Chains,
    ];

    /// Numeric priority, ascending with sophistication.
    #[inline]
    pub fn priority(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Technique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Technique::TwoByTwo => "Two-by-Two",
            Technique::FiveCrosses => "Five Crosses",
            Technique::CandidateDeficit => "Candidate Deficit",
            Technique::PartitionedCandidates => "Partitioned Candidates",
            Technique::SharedLine => "Shared Row/Column",
            Technique::RowBandBudget => "Row-Band Budget",
            Technique::ColumnBandBudget => "Column-Band Budget",
            Technique::RegionRowPartition => "Region Row Partition",
            Technique::RegionColumnPartition => "Region Column Partition",
            Technique::ExclusiveRowBand => "Exclusive Row-Band",
            Technique::ExclusiveColumnBand => "Exclusive Column-Band",
            Technique::ExclusiveRegionRows => "Exclusive Region Rows",
            Technique::ExclusiveRegionCols => "Exclusive Region Columns",
            Technique::RegionBandSqueeze => "Region-Band Squeeze",
            Technique::BandCages => "Band Cages",
            Technique::CagesVsRegionQuota => "Cages vs Region Quota",
            Technique::RegionCages => "Region Cages",
            Technique::CageExclusion => "Cage Exclusion",
            Technique::RowColumnSqueeze => "Row/Column Squeeze",
            Technique::RegionBandIntersection => "Region-Band Intersection",
            Technique::RegionPairExclusion => "Region-Pair Exclusion",
            Technique::PressuredTees => "Pressured Tees",
            Technique::SubsetSqueeze => "Subset Squeeze",
            Technique::Entanglement => "Entanglement",
            Technique::Chains => "Chains",
        };
        f.write_str(name)
    }
}

/// Enabled-technique set, a small bitmask keyed by discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechniqueSet(u32);

impl TechniqueSet {
    pub fn all() -> Self {
        let mut mask = 0;
        for &t in Technique::ALL {
            mask |= 1 << t.priority();
        }
        TechniqueSet(mask)
    }

    pub fn none() -> Self {
        TechniqueSet(0)
    }

    pub fn only(techniques: &[Technique]) -> Self {
        let mut set = Self::none();
        for &t in techniques {
            set = set.with(t);
        }
        set
    }

    #[must_use]
    pub fn with(self, t: Technique) -> Self {
        TechniqueSet(self.0 | (1 << t.priority()))
    }

    #[must_use]
    pub fn without(self, t: Technique) -> Self {
        TechniqueSet(self.0 & !(1 << t.priority()))
    }

    #[inline]
    pub fn contains(self, t: Technique) -> bool {
        self.0 & (1 << t.priority()) != 0
    }
}

impl Default for TechniqueSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Per-call solver configuration.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Techniques the dispatcher may use.
    pub techniques: TechniqueSet,
    /// Auto-solve iteration ceiling.
    pub iteration_ceiling: usize,
    /// Node budget for the quota-in-band enumeration.
    pub quota_node_budget: usize,
    /// Candidate-count cap above which the quota enumeration bails out.
    pub quota_candidate_cap: usize,
    /// Candidate-count cap for entanglement constrained units.
    pub constrained_unit_cap: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            techniques: TechniqueSet::all(),
            iteration_ceiling: 500,
            quota_node_budget: 200_000,
            quota_candidate_cap: 16,
            constrained_unit_cap: 4,
        }
    }
}

/// A hint: the externalized form of one schema application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hint {
    /// The technique that produced this hint.
    pub technique: Technique,
    /// The forced cells.
    pub deductions: Vec<CellDeduction>,
    /// Cells involved in the reasoning (for highlighting).
    pub involved_cells: Vec<usize>,
    /// Rendered explanation, one sentence per reasoning step.
    pub explanation: String,
    /// Structured reasoning steps (host rendering only).
    #[serde(skip)]
    pub steps: Vec<super::explain::Step>,
}

impl std::fmt::Display for Hint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.technique, self.explanation)
    }
}

/// Result of a hint request.
#[derive(Debug, Clone)]
pub enum HintOutcome {
    Hint(Hint),
    /// Every enabled technique came up empty.
    NoHint,
    Cancelled,
}

/// Result of auto-solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved,
    NoProgress,
    Violation,
    Cancelled,
}

/// Cooperative cancellation token, checked at suspension points.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
