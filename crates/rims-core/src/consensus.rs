//! ConsensusAggregator: agreement among candidate answers.
//!
//! Up to three candidates use the pairwise scan: exact majority first, then
//! the first equivalent pair in enumeration order (`(0,1)`, `(0,2)`,
//! `(1,2)`), returning the earlier member of that pair. Candidate order is
//! method-priority order, so this tie-break is deterministic and
//! intentionally asymmetric.
//!
//! Larger sets use the generalized form: tolerance buckets for numbers,
//! union-merged equivalence classes for symbolic answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::answer::{Answer, CandidateSet, Domain};
use crate::equivalence::EquivalenceChecker;
use crate::error::Result;
use crate::metrics::METRICS;
use crate::obs;

/// Candidate counts at or below this use the pairwise scan.
pub const PAIRWISE_MAX: usize = 3;

/// Outcome of aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "answers", rename_all = "snake_case")]
pub enum Consensus {
    /// At least two candidates agree on this answer.
    Agreed(Answer),
    /// Several equivalence classes tie for the largest support.
    Ambiguous(Vec<Answer>),
    /// Only one usable candidate was left; it stands unopposed.
    Unopposed(Answer),
    NoConsensus,
}

impl Consensus {
    /// Answers to grade, in preference order; empty for no consensus.
    pub fn answers(&self) -> Vec<&Answer> {
        match self {
            Consensus::Agreed(a) | Consensus::Unopposed(a) => vec![a],
            Consensus::Ambiguous(all) => all.iter().collect(),
            Consensus::NoConsensus => Vec::new(),
        }
    }

    /// The single chosen answer, if there is exactly one.
    pub fn single(&self) -> Option<&Answer> {
        match self {
            Consensus::Agreed(a) | Consensus::Unopposed(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Consensus::NoConsensus)
    }

    fn label(&self) -> &'static str {
        match self {
            Consensus::Agreed(_) => "agreed",
            Consensus::Ambiguous(_) => "ambiguous",
            Consensus::Unopposed(_) => "unopposed",
            Consensus::NoConsensus => "no_consensus",
        }
    }
}

/// Aggregates candidates using one domain's equivalence rules.
#[derive(Debug, Clone)]
pub struct ConsensusAggregator {
    checker: EquivalenceChecker,
}

impl ConsensusAggregator {
    pub fn new(checker: EquivalenceChecker) -> Self {
        Self { checker }
    }

    pub fn checker(&self) -> &EquivalenceChecker {
        &self.checker
    }

    /// Normalizes raw candidates (missing ones become `Invalid`) and
    /// aggregates them. An empty slice is a contract violation.
    pub fn aggregate_raw(&self, raw: &[Option<String>]) -> Result<Consensus> {
        let normalizer = self.checker.normalizer();
        let answers = raw
            .iter()
            .map(|r| normalizer.normalize_opt(r.as_deref()))
            .collect();
        let set = CandidateSet::new(self.checker.domain(), answers)?;
        Ok(self.aggregate(&set))
    }

    /// Decides the consensus of a candidate set.
    pub fn aggregate(&self, set: &CandidateSet) -> Consensus {
        let consensus = match set.domain() {
            Domain::Arithmetic => {
                let values: Vec<f64> = set
                    .candidates()
                    .iter()
                    .filter_map(Answer::as_numeric)
                    .collect();
                if set.len() <= PAIRWISE_MAX {
                    self.numeric_pairwise(&values)
                } else {
                    self.numeric_buckets(&values)
                }
            }
            Domain::SymbolicExpression | Domain::SymbolicEquationOrExpression => {
                let usable: Vec<&Answer> = set
                    .candidates()
                    .iter()
                    .filter(|a| !a.is_invalid())
                    .collect();
                if set.len() <= PAIRWISE_MAX {
                    self.symbolic_pairwise(&usable)
                } else {
                    self.symbolic_classes(&usable)
                }
            }
        };
        METRICS.record_consensus(!consensus.is_none());
        obs::emit_consensus_decided(set.domain().as_str(), set.len(), consensus.label());
        consensus
    }

    fn numeric_pairwise(&self, values: &[f64]) -> Consensus {
        match values {
            [] => return Consensus::NoConsensus,
            [only] => return Consensus::Unopposed(Answer::Numeric(*only)),
            _ => {}
        }
        if let Some(majority) = exact_majority(values) {
            return Consensus::Agreed(Answer::Numeric(majority));
        }
        let tol = self.checker.tolerance();
        for (i, a) in values.iter().enumerate() {
            for b in &values[i + 1..] {
                if (a - b).abs() < tol {
                    return Consensus::Agreed(Answer::Numeric(*a));
                }
            }
        }
        Consensus::NoConsensus
    }

    fn numeric_buckets(&self, values: &[f64]) -> Consensus {
        match values {
            [] => return Consensus::NoConsensus,
            [only] => return Consensus::Unopposed(Answer::Numeric(*only)),
            _ => {}
        }
        if let Some(majority) = exact_majority(values) {
            return Consensus::Agreed(Answer::Numeric(majority));
        }
        // Grid cell -> (count, first member); insertion order breaks ties.
        let tol = self.checker.tolerance();
        let mut order: Vec<i64> = Vec::new();
        let mut buckets: HashMap<i64, (usize, f64)> = HashMap::new();
        for &v in values {
            let cell = (v / tol).round() as i64;
            buckets
                .entry(cell)
                .and_modify(|(count, _)| *count += 1)
                .or_insert_with(|| {
                    order.push(cell);
                    (1, v)
                });
        }
        let mut best: Option<(usize, f64)> = None;
        for cell in &order {
            let (count, first) = buckets[cell];
            if best.map_or(true, |(c, _)| count > c) {
                best = Some((count, first));
            }
        }
        match best {
            Some((count, first)) if count >= 2 => Consensus::Agreed(Answer::Numeric(first)),
            _ => Consensus::NoConsensus,
        }
    }

    fn symbolic_pairwise(&self, usable: &[&Answer]) -> Consensus {
        match usable {
            [] => return Consensus::NoConsensus,
            [only] => return Consensus::Unopposed((*only).clone()),
            _ => {}
        }
        for (i, a) in usable.iter().enumerate() {
            for b in &usable[i + 1..] {
                if self.checker.is_equiv(a, b) {
                    return Consensus::Agreed((*a).clone());
                }
            }
        }
        Consensus::NoConsensus
    }

    fn symbolic_classes(&self, usable: &[&Answer]) -> Consensus {
        match usable {
            [] => return Consensus::NoConsensus,
            [only] => return Consensus::Unopposed((*only).clone()),
            _ => {}
        }

        // Exact-text duplicates first.
        let mut distinct: Vec<(String, &Answer, usize)> = Vec::new();
        for answer in usable {
            let key = answer.to_string();
            match distinct.iter_mut().find(|(k, _, _)| *k == key) {
                Some(entry) => entry.2 += 1,
                None => distinct.push((key, answer, 1)),
            }
        }

        let mut classes = UnionFind::new(distinct.len());
        for i in 0..distinct.len() {
            for j in i + 1..distinct.len() {
                if classes.find(i) != classes.find(j)
                    && self.checker.is_equiv(distinct[i].1, distinct[j].1)
                {
                    classes.union(i, j);
                }
            }
        }

        // Root -> total count; the representative is the root, which is
        // always the earliest member.
        let mut totals: Vec<usize> = vec![0; distinct.len()];
        for (idx, (_, _, count)) in distinct.iter().enumerate() {
            totals[classes.find(idx)] += count;
        }
        let max = totals.iter().copied().max().unwrap_or(0);
        if max < 2 {
            return Consensus::NoConsensus;
        }
        let mut winners: Vec<Answer> = totals
            .iter()
            .enumerate()
            .filter(|(_, total)| **total == max)
            .map(|(root, _)| distinct[root].1.clone())
            .collect();
        if winners.len() == 1 {
            Consensus::Agreed(winners.remove(0))
        } else {
            Consensus::Ambiguous(winners)
        }
    }
}

/// Most common value if it occurs at least twice and no other value occurs
/// as often. A tie leaves the decision to the tolerance step.
fn exact_majority(values: &[f64]) -> Option<f64> {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for &v in values {
        match counts.iter_mut().find(|(x, _)| *x == v) {
            Some(entry) => entry.1 += 1,
            None => counts.push((v, 1)),
        }
    }
    let top = counts.iter().map(|(_, c)| *c).max()?;
    let mut leaders = counts.iter().filter(|(_, c)| *c == top);
    match (leaders.next(), leaders.next()) {
        (Some((v, _)), None) if top >= 2 => Some(*v),
        _ => None,
    }
}

/// Disjoint sets whose root is always the smallest index in the set.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[high] = low;
        }
    }
}
