//! Query evaluation: candidate generation followed by memoized path search.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use canopy_core::NodeId;
use canopy_frame::{MetricFrame, MetricRow};
use canopy_graph::CallGraph;
use canopy_pattern::{
    compile_object_dialect, compile_string_dialect, CompoundQuery, Pattern, PatternError,
    Quantifier, Query, RowContext, SetOp,
};
use tracing::debug;

use crate::error::{QueryError, QueryResult};

/// How predicates aggregate over a node's rows when the frame is
/// multi-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiIndexMode {
    /// Single-index data only; multi-indexed frames are rejected.
    #[default]
    Off,
    /// A node matches when any of its rows satisfies the predicate.
    Any,
    /// A node matches only when every row satisfies the predicate.
    All,
}

impl FromStr for MultiIndexMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(MultiIndexMode::Off),
            "any" => Ok(MultiIndexMode::Any),
            "all" => Ok(MultiIndexMode::All),
            other => Err(QueryError::UnknownMode {
                mode: other.to_string(),
            }),
        }
    }
}

/// Applies queries to a call graph and its metric frame.
///
/// The engine itself is stateless apart from its mode; every evaluation
/// builds its own candidate sets and path cache, so results never depend
/// on earlier calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryEngine {
    mode: MultiIndexMode,
}

impl QueryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: MultiIndexMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MultiIndexMode {
        self.mode
    }

    /// Apply a query. Returns the matched nodes sorted by id, without
    /// duplicates. An empty result is not an error.
    pub fn apply(
        &self,
        query: &Query,
        graph: &CallGraph,
        frame: &MetricFrame,
    ) -> QueryResult<Vec<NodeId>> {
        let matches = self.eval_query(query, graph, frame)?;
        debug!(matched = matches.len(), graph_size = graph.len(), "query applied");
        Ok(sorted(matches))
    }

    /// Apply a single pattern directly.
    pub fn apply_pattern(
        &self,
        pattern: &Pattern,
        graph: &CallGraph,
        frame: &MetricFrame,
    ) -> QueryResult<Vec<NodeId>> {
        Ok(sorted(self.eval_pattern(pattern, graph, frame)?))
    }

    fn eval_query(
        &self,
        query: &Query,
        graph: &CallGraph,
        frame: &MetricFrame,
    ) -> QueryResult<HashSet<NodeId>> {
        match query {
            Query::Pattern(pattern) => self.eval_pattern(pattern, graph, frame),
            // Raw dialect forms compile lazily, when they are applied.
            Query::Object(path) => {
                let pattern = compile_object_dialect(path)?;
                self.eval_pattern(&pattern, graph, frame)
            }
            Query::Text(text) => {
                let compiled = compile_string_dialect(text)?;
                self.eval_query(&compiled, graph, frame)
            }
            Query::Compound(compound) => self.eval_compound(compound, graph, frame),
        }
    }

    fn eval_compound(
        &self,
        compound: &CompoundQuery,
        graph: &CallGraph,
        frame: &MetricFrame,
    ) -> QueryResult<HashSet<NodeId>> {
        let expected = match compound.op {
            SetOp::Not => compound.subqueries.len() == 1,
            _ => compound.subqueries.len() >= 2,
        };
        if !expected {
            return Err(PatternError::bad_arity(format!(
                "{:?} applied to {} subqueries",
                compound.op,
                compound.subqueries.len()
            ))
            .into());
        }

        let mut results = Vec::with_capacity(compound.subqueries.len());
        for subquery in &compound.subqueries {
            results.push(self.eval_query(subquery, graph, frame)?);
        }

        let mut iter = results.into_iter();
        // Arity was checked above.
        let first = iter.next().unwrap_or_default();
        let combined = match compound.op {
            SetOp::And => iter.fold(first, |acc, set| &acc & &set),
            SetOp::Or => iter.fold(first, |acc, set| &acc | &set),
            SetOp::Xor => iter.fold(first, |acc, set| &acc ^ &set),
            SetOp::Not => {
                let mut complement: HashSet<NodeId> = graph.traverse().into_iter().collect();
                complement.retain(|node| !first.contains(node));
                complement
            }
        };
        Ok(combined)
    }

    fn eval_pattern(
        &self,
        pattern: &Pattern,
        graph: &CallGraph,
        frame: &MetricFrame,
    ) -> QueryResult<HashSet<NodeId>> {
        if pattern.is_empty() {
            return Err(PatternError::invalid_path("cannot apply an empty pattern").into());
        }
        let mut search = PatternSearch::new(self.mode, pattern, graph, frame)?;
        Ok(search.run())
    }
}

fn sorted(matches: HashSet<NodeId>) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = matches.into_iter().collect();
    out.sort_unstable();
    out
}

/// One pattern evaluation. Owns the candidate sets and the path cache;
/// dropped when the evaluation finishes.
struct PatternSearch<'a> {
    pattern: &'a Pattern,
    graph: &'a CallGraph,
    /// Per-position sets of nodes whose rows satisfy that position's
    /// predicate.
    candidates: Vec<HashSet<NodeId>>,
    /// Memoized search results keyed by (node, pattern position). `None`
    /// records a dead end.
    cache: HashMap<(NodeId, usize), Option<Vec<Vec<NodeId>>>>,
}

impl<'a> PatternSearch<'a> {
    /// Candidate generation. Evaluates every position's predicate over
    /// every node's rows; a predicate type error aborts the evaluation.
    fn new(
        mode: MultiIndexMode,
        pattern: &'a Pattern,
        graph: &'a CallGraph,
        frame: &'a MetricFrame,
    ) -> QueryResult<Self> {
        if frame.is_multi_indexed() && mode == MultiIndexMode::Off {
            return Err(QueryError::ModeMismatch {
                message: "mode 'off' cannot filter multi-indexed data; use 'any' or 'all'"
                    .to_string(),
            });
        }

        let order = graph.traverse();
        // Nodes without rows still get metadata predicates (depth, leaf).
        let no_rows = MetricRow::new();
        let mut candidates = Vec::with_capacity(pattern.len());
        for element in pattern.iter() {
            let mut matching = HashSet::new();
            for &node in &order {
                let meta = graph.node(node);
                let eval_row = |row: &MetricRow| -> QueryResult<bool> {
                    let ctx = RowContext {
                        depth: meta.depth,
                        node_index: node.value(),
                        is_leaf: meta.is_leaf(),
                        row,
                        frame,
                    };
                    Ok(element.predicate.eval(&ctx)?)
                };

                let rows = frame.rows(node);
                let matched = if rows.is_empty() {
                    eval_row(&no_rows)?
                } else {
                    match mode {
                        MultiIndexMode::Off => eval_row(&rows[0])?,
                        MultiIndexMode::Any => {
                            let mut any = false;
                            for row in rows {
                                if eval_row(row)? {
                                    any = true;
                                    break;
                                }
                            }
                            any
                        }
                        MultiIndexMode::All => {
                            let mut all = true;
                            for row in rows {
                                if !eval_row(row)? {
                                    all = false;
                                    break;
                                }
                            }
                            all
                        }
                    }
                };
                if matched {
                    matching.insert(node);
                }
            }
            candidates.push(matching);
        }

        Ok(Self {
            pattern,
            graph,
            candidates,
            cache: HashMap::new(),
        })
    }

    /// Path search: start a memoized descent from every first-position
    /// candidate, in traversal order, and collect all matched nodes.
    fn run(&mut self) -> HashSet<NodeId> {
        let starts: Vec<NodeId> = self
            .graph
            .traverse()
            .into_iter()
            .filter(|node| self.candidates[0].contains(node))
            .collect();

        let mut matches = HashSet::new();
        for start in starts {
            if let Some(paths) = self.find_matches(start, 0) {
                for path in paths {
                    matches.extend(path);
                }
            }
        }
        matches
    }

    /// Match the pattern suffix starting at `idx` against the subgraph
    /// rooted at `node`. Returns all matched paths, or `None` on a dead
    /// end. Results are memoized per (node, idx).
    fn find_matches(&mut self, node: NodeId, idx: usize) -> Option<Vec<Vec<NodeId>>> {
        if let Some(cached) = self.cache.get(&(node, idx)) {
            return cached.clone();
        }
        let graph = self.graph;
        let last = self.pattern.len() - 1;

        let next_idx = match self.pattern[idx].quantifier {
            Quantifier::One => {
                if !self.candidates[idx].contains(&node) {
                    self.cache.insert((node, idx), None);
                    return None;
                }
                // The node alone completes the pattern at the final
                // position, or one before a trailing "*" (zero repeats).
                if idx == last
                    || (idx + 1 == last
                        && self.pattern[last].quantifier == Quantifier::ZeroOrMore)
                {
                    let paths = vec![vec![node]];
                    self.cache.insert((node, idx), Some(paths.clone()));
                    return Some(paths);
                }
                idx + 1
            }
            Quantifier::ZeroOrMore => {
                if idx < last && self.candidates[idx + 1].contains(&node) {
                    // Zero-repetition skip: the node already satisfies the
                    // next position. Not cached under (node, idx) because
                    // the result belongs to (node, idx + 1).
                    return self.find_matches(node, idx + 1);
                } else if !self.candidates[idx].contains(&node) {
                    // Dead end, unless the "*" is the final position, in
                    // which case the run ends here with zero nodes.
                    return if idx < last {
                        self.cache.insert((node, idx), None);
                        None
                    } else {
                        let paths = vec![Vec::new()];
                        self.cache.insert((node, idx), Some(paths.clone()));
                        Some(paths)
                    };
                } else if idx == last && graph.is_leaf(node) {
                    // A matching leaf closes a final "*" run.
                    return Some(vec![vec![node]]);
                }
                idx
            }
        };

        // Recurse into children, deduplicating their paths.
        let mut child_paths: HashSet<Vec<NodeId>> = HashSet::new();
        for &child in graph.children(node) {
            if let Some(subpaths) = self.find_matches(child, next_idx) {
                child_paths.extend(subpaths);
            }
        }
        if child_paths.is_empty() {
            self.cache.insert((node, idx), None);
            return None;
        }
        let paths: Vec<Vec<NodeId>> = child_paths
            .into_iter()
            .map(|suffix| {
                let mut path = Vec::with_capacity(suffix.len() + 1);
                path.push(node);
                path.extend(suffix);
                path
            })
            .collect();
        self.cache.insert((node, idx), Some(paths.clone()));
        Some(paths)
    }
}
