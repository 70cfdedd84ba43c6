//! Composite risk scoring and root-cause diagnosis.
//!
//! Risk combines four upstream signals: file churn (commit count),
//! cognitive complexity, a file-health deficit and co-change entropy. Each
//! is normalized against the codebase's own distribution (z-score, clipped
//! at 3σ, mapped to `[0, 1]`), so thresholds adapt to the project. Without
//! any recorded signals a fixed normalization is used instead.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use crate::algo::round_to;
use crate::db::Index;
use crate::error::{Error, Result};
use crate::graph::CodeGraph;
use crate::types::SymbolId;

/// Weight of the churn factor.
pub const CHURN_WEIGHT: f64 = 0.30;
/// Weight of the complexity factor.
pub const COMPLEXITY_WEIGHT: f64 = 0.30;
/// Weight of the health-deficit factor.
pub const HEALTH_WEIGHT: f64 = 0.25;
/// Weight of the co-change entropy factor.
pub const ENTROPY_WEIGHT: f64 = 0.15;

/// Default neighbourhood depth for [`diagnose`].
pub const DEFAULT_DEPTH: usize = 2;

const MIN_STD: f64 = 0.01;
const Z_CLIP: f64 = 3.0;

/// Raw signals for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RiskInputs {
    /// Commits touching the owning file
    pub commits: f64,
    /// Cognitive complexity of the symbol
    pub complexity: f64,
    /// Owning file's health on a 0–10 scale, if known
    pub health: Option<f64>,
    /// Co-change entropy of the owning file
    pub entropy: f64,
}

/// Normalized factors, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RiskFactors {
    /// Churn
    pub churn: f64,
    /// Complexity
    pub complexity: f64,
    /// Health deficit
    pub health_deficit: f64,
    /// Co-change entropy
    pub entropy: f64,
}

impl RiskFactors {
    /// Weighted sum, rounded to 3 places.
    #[must_use]
    pub fn score(&self) -> f64 {
        round_to(
            self.churn * CHURN_WEIGHT
                + self.complexity * COMPLEXITY_WEIGHT
                + self.health_deficit * HEALTH_WEIGHT
                + self.entropy * ENTROPY_WEIGHT,
            3,
        )
    }
}

/// Mean and (floored) standard deviation of one signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distribution {
    /// Mean
    pub mean: f64,
    /// Population standard deviation, at least 0.01
    pub std: f64,
}

impl Distribution {
    /// Fit to `values`; `None` when there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std: variance.sqrt().max(MIN_STD),
        })
    }

    /// How far above the mean `value` is, in `[0, 1]` (3σ saturates).
    fn excess(&self, value: f64) -> f64 {
        ((value - self.mean) / self.std).clamp(0.0, Z_CLIP) / Z_CLIP
    }

    /// How far below the mean `value` is, in `[0, 1]`.
    fn deficit(&self, value: f64) -> f64 {
        ((self.mean - value) / self.std).clamp(0.0, Z_CLIP) / Z_CLIP
    }
}

/// How signals are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskModel {
    /// Against codebase distributions. A signal with no recorded values
    /// contributes 0.
    ZScore {
        /// Commit counts
        commits: Option<Distribution>,
        /// Cognitive complexity
        complexity: Option<Distribution>,
        /// File health
        health: Option<Distribution>,
        /// Co-change entropy
        entropy: Option<Distribution>,
    },
    /// Fixed scales: 50 commits, complexity 30, health 7.
    Fixed,
}

impl RiskModel {
    /// Fit a z-score model, or [`RiskModel::Fixed`] when every signal is
    /// empty.
    #[must_use]
    pub fn fit(commits: &[f64], complexity: &[f64], health: &[f64], entropy: &[f64]) -> Self {
        let model = Self::ZScore {
            commits: Distribution::fit(commits),
            complexity: Distribution::fit(complexity),
            health: Distribution::fit(health),
            entropy: Distribution::fit(entropy),
        };
        match model {
            Self::ZScore {
                commits: None,
                complexity: None,
                health: None,
                entropy: None,
            } => Self::Fixed,
            fitted => fitted,
        }
    }

    /// Normalize `inputs` into factors.
    #[must_use]
    pub fn factors(&self, inputs: &RiskInputs) -> RiskFactors {
        match self {
            Self::ZScore {
                commits,
                complexity,
                health,
                entropy,
            } => RiskFactors {
                churn: commits.map_or(0.0, |d| d.excess(inputs.commits)),
                complexity: complexity.map_or(0.0, |d| d.excess(inputs.complexity)),
                health_deficit: match (health, inputs.health) {
                    (Some(d), Some(h)) => d.deficit(h),
                    _ => 0.0,
                },
                entropy: entropy.map_or(0.0, |d| d.excess(inputs.entropy)),
            },
            Self::Fixed => RiskFactors {
                churn: (inputs.commits / 50.0).min(1.0),
                complexity: (inputs.complexity / 30.0).min(1.0),
                health_deficit: inputs
                    .health
                    .filter(|&h| h > 0.0)
                    .map_or(0.5, |h| ((7.0 - h) / 7.0).max(0.0)),
                entropy: inputs.entropy.clamp(0.0, 1.0),
            },
        }
    }

    /// Composite risk of `inputs`.
    #[must_use]
    pub fn score(&self, inputs: &RiskInputs) -> f64 {
        self.factors(inputs).score()
    }
}

/// Per-symbol signals and the model fitted to them.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskSignals {
    /// Inputs keyed by symbol
    pub inputs: HashMap<SymbolId, RiskInputs>,
    /// Normalization fitted to all recorded values
    pub model: RiskModel,
}

/// Gather recorded churn, complexity and health for every symbol.
///
/// # Errors
///
/// Propagates store failures.
pub(crate) fn load_signals(index: &Index) -> Result<RiskSignals> {
    let file_stats = index.get_all_file_stats()?;
    let complexity = index.get_all_symbol_complexity()?;

    let commits: Vec<f64> = file_stats.values().map(|s| f64::from(s.commit_count)).collect();
    let health: Vec<f64> = file_stats.values().filter_map(|s| s.health_score).collect();
    let entropy: Vec<f64> = file_stats.values().map(|s| s.cochange_entropy).collect();
    let cc: Vec<f64> = complexity.values().map(|c| c.cognitive_complexity).collect();
    let model = RiskModel::fit(&commits, &cc, &health, &entropy);

    let inputs = index
        .list_all_symbols()?
        .into_iter()
        .map(|symbol| {
            let stats = file_stats.get(&symbol.file_id).copied().unwrap_or_default();
            let inputs = RiskInputs {
                commits: f64::from(stats.commit_count),
                complexity: complexity
                    .get(&symbol.id)
                    .map_or(0.0, |c| c.cognitive_complexity),
                health: stats.health_score,
                entropy: stats.cochange_entropy,
            };
            (symbol.id, inputs)
        })
        .collect();
    Ok(RiskSignals { inputs, model })
}

/// Whether a suspect calls into the target or is called by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Transitive caller
    Upstream,
    /// Transitive callee
    Downstream,
}

/// A neighbour ranked as a possible root cause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suspect {
    /// Symbol
    pub symbol: SymbolId,
    /// Qualified name
    pub name: String,
    /// Owning file
    pub file: PathBuf,
    /// Declaration line
    pub line: u32,
    /// Direction relative to the target
    pub relation: Relation,
    /// Composite risk
    pub risk: f64,
    /// Raw signals behind the score
    pub inputs: RiskInputs,
}

/// Ranked root-cause candidates around a symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    /// The symbol being investigated
    pub target: SymbolId,
    /// Its own risk
    pub target_risk: f64,
    /// Callers within the depth, riskiest first
    pub upstream: Vec<Suspect>,
    /// Callees within the depth, riskiest first
    pub downstream: Vec<Suspect>,
    /// One-line summary naming the top suspect
    pub verdict: String,
}

/// Rank the callers and callees of `target` within `depth` hops by risk.
///
/// # Errors
///
/// `Error::NotFound` if `target` is not in the graph.
pub fn diagnose(
    graph: &CodeGraph,
    signals: &RiskSignals,
    target: SymbolId,
    depth: usize,
) -> Result<Diagnosis> {
    if !graph.contains(target) {
        return Err(Error::NotFound(format!("symbol {target}")));
    }
    let score = |id: SymbolId| {
        let inputs = signals.inputs.get(&id).copied().unwrap_or_default();
        (signals.model.score(&inputs), inputs)
    };

    let rank = |relation: Relation| {
        let ids = bounded_walk(graph, target, depth, relation);
        let mut suspects: Vec<Suspect> = ids
            .into_iter()
            .filter_map(|id| {
                let node = graph.node(id)?;
                let (risk, inputs) = score(id);
                Some(Suspect {
                    symbol: id,
                    name: node.qualified_name.clone(),
                    file: node.file_path.clone(),
                    line: node.line_start,
                    relation,
                    risk,
                    inputs,
                })
            })
            .collect();
        suspects.sort_by(|a, b| b.risk.total_cmp(&a.risk).then_with(|| a.symbol.cmp(&b.symbol)));
        suspects
    };
    let upstream = rank(Relation::Upstream);
    let downstream = rank(Relation::Downstream);

    let verdict = match upstream.first().or_else(|| downstream.first()) {
        Some(top) => {
            let health = top
                .inputs
                .health
                .map_or_else(|| "n/a".to_string(), |h| format!("{h}/10"));
            format!(
                "Top suspect: {} (risk={:.2}, cc={}, commits={}, health={health})",
                top.name, top.risk, top.inputs.complexity, top.inputs.commits
            )
        }
        None => "No upstream/downstream symbols found within depth range.".to_string(),
    };

    Ok(Diagnosis {
        target,
        target_risk: score(target).0,
        upstream,
        downstream,
        verdict,
    })
}

fn bounded_walk(graph: &CodeGraph, start: SymbolId, depth: usize, relation: Relation) -> Vec<SymbolId> {
    let mut seen: HashSet<SymbolId> = HashSet::new();
    let mut frontier = vec![start];
    for _ in 0..depth {
        let mut next = Vec::new();
        for id in frontier {
            let neighbours = match relation {
                Relation::Upstream => graph.callers(id),
                Relation::Downstream => graph.callees(id),
            };
            for n in neighbours {
                if n != start && seen.insert(n) {
                    next.push(n);
                }
            }
        }
        frontier = next;
    }
    seen.into_iter().collect()
}
