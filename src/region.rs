//! Common region of two trees, and crossover support built on it.
//!
//! The common region is the maximal predicate-closed prefix shared by two
//! trees: a synchronized level-order co-traversal records a pair only while
//! the predicate holds, and never descends below a mismatch. Matched pairs
//! are partitioned into terminal and nonterminal lists so a crossover
//! operator can sample uniformly within either class.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::arena::NodeId;
use crate::compare::NodeCompare;
use crate::env::Environment;
use crate::error::{TreeError, TreeResult};
use crate::tree::Tree;
use crate::Arity;

/// One matched pair of the common region.
///
/// `path` is the child-index route from the roots to the pair; by
/// construction of the co-traversal it is the same in both trees, which is
/// what lets a crossover operator address both slots after the region has
/// been computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionItem {
    /// Candidate sequence number assigned during the co-traversal.
    pub seq: usize,
    /// Child-index path from the root to this pair.
    pub path: Vec<Arity>,
    /// Matched node in the first tree.
    pub id1: NodeId,
    /// Matched node in the second tree.
    pub id2: NodeId,
}

/// Result of a common-region computation: matched pairs in traversal
/// order, partitioned into terminal and nonterminal picks.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommonRegion {
    items: Vec<RegionItem>,
    terminals: Vec<usize>,
    nonterminals: Vec<usize>,
}

impl CommonRegion {
    fn add(&mut self, item: RegionItem) {
        debug_assert!(self.items.last().is_none_or(|last| last.seq < item.seq));
        if item.id1.is_terminal() {
            self.terminals.push(self.items.len());
        } else {
            self.nonterminals.push(self.items.len());
        }
        self.items.push(item);
    }

    /// Number of matched pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no pair matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The `n`-th matched pair in traversal order.
    #[must_use]
    pub fn get(&self, n: usize) -> Option<&RegionItem> {
        self.items.get(n)
    }

    /// Find a pair by its candidate sequence number.
    #[must_use]
    pub fn by_seq(&self, seq: usize) -> Option<&RegionItem> {
        self.items.binary_search_by_key(&seq, |item| item.seq).ok().map(|n| &self.items[n])
    }

    /// All matched pairs in traversal order.
    #[must_use]
    pub fn items(&self) -> &[RegionItem] {
        &self.items
    }

    /// Iterate over the matched pairs in traversal order.
    pub fn iter(&self) -> std::slice::Iter<'_, RegionItem> {
        self.items.iter()
    }

    /// Number of matched terminal pairs.
    #[must_use]
    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    /// The `n`-th matched terminal pair.
    #[must_use]
    pub fn nth_terminal(&self, n: usize) -> Option<&RegionItem> {
        self.terminals.get(n).map(|&i| &self.items[i])
    }

    /// Number of matched nonterminal pairs.
    #[must_use]
    pub fn nonterminal_count(&self) -> usize {
        self.nonterminals.len()
    }

    /// The `n`-th matched nonterminal pair.
    #[must_use]
    pub fn nth_nonterminal(&self, n: usize) -> Option<&RegionItem> {
        self.nonterminals.get(n).map(|&i| &self.items[i])
    }
}

impl<'r> IntoIterator for &'r CommonRegion {
    type Item = &'r RegionItem;
    type IntoIter = std::slice::Iter<'r, RegionItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Compute the common region of the trees under `root1` and `root2`.
///
/// Candidate pairs are numbered in co-traversal order, counting mismatched
/// candidates too; children of a mismatched pair are never candidates. The
/// cost is linear in the size of the matched region.
#[must_use]
pub fn common_region<C>(
    env: &Environment<C>,
    root1: NodeId,
    root2: NodeId,
    compare: &NodeCompare,
) -> CommonRegion {
    let mut region = CommonRegion::default();
    let mut seq = 0;

    let mut queue: VecDeque<(NodeId, NodeId, Vec<Arity>)> = VecDeque::new();
    if !root1.is_empty() && !root2.is_empty() && compare.equal(env, root1, root2) {
        region.add(RegionItem { seq, path: Vec::new(), id1: root1, id2: root2 });
        queue.push_back((root1, root2, Vec::new()));
    }
    seq += 1;

    while let Some((current1, current2, path)) = queue.pop_front() {
        // Under terminality comparison the arities of a matched pair can
        // differ; co-traversal continues over the shared child slots.
        let arity = current1.arity().min(current2.arity());
        for i in 0..arity {
            let child1 = env.arena().argument(current1, i);
            let child2 = env.arena().argument(current2, i);
            if compare.equal(env, child1, child2) {
                let mut child_path = path.clone();
                child_path.push(i);
                region.add(RegionItem { seq, path: child_path.clone(), id1: child1, id2: child2 });
                queue.push_back((child1, child2, child_path));
            }
            seq += 1;
        }
    }

    region
}

/// Configuration for [`crossover`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CrossoverConfig {
    /// Probability of exchanging at a terminal pair instead of a
    /// nonterminal pair, when both classes are available.
    pub terminal_rate: f64,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self { terminal_rate: 0.1 }
    }
}

/// Structural crossover: sample one matched pair of the common region
/// uniformly (class chosen by `config.terminal_rate`) and exchange the
/// subtrees under it between the two trees, in place.
///
/// # Errors
///
/// Returns [`TreeError::EmptyRegion`] when the trees share no common
/// region under `compare`.
pub fn crossover<C, R: Rng>(
    env: &mut Environment<C>,
    rng: &mut R,
    tree1: &mut Tree,
    tree2: &mut Tree,
    compare: &NodeCompare,
    config: &CrossoverConfig,
) -> TreeResult<()> {
    let region = common_region(env, tree1.root(), tree2.root(), compare);
    if region.is_empty() {
        return Err(TreeError::EmptyRegion);
    }

    let pick_terminal = match (region.terminal_count(), region.nonterminal_count()) {
        (0, _) => false,
        (_, 0) => true,
        _ => rng.gen_bool(config.terminal_rate),
    };
    let item = if pick_terminal {
        region.nth_terminal(rng.gen_range(0..region.terminal_count()))
    } else {
        region.nth_nonterminal(rng.gen_range(0..region.nonterminal_count()))
    };
    let item = match item {
        Some(item) => item.clone(),
        None => unreachable!("sampled index is in range"),
    };

    tree1.put_slot(env, &item.path, item.id2);
    tree2.put_slot(env, &item.path, item.id1);
    Ok(())
}
