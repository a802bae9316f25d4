//! Owning trees and non-owning subtree cursors with cached statistics.
//!
//! A [`Tree`] owns a root handle; a [`Subtree`] is a cursor over one slot
//! of a tree (the root, or a child slot of some node), addressed by the
//! child-index path from the root. Cursors borrow their tree mutably, so
//! the borrow checker rules out the classic staleness hazard of holding a
//! sibling cursor across a structural mutation: any mutation goes through
//! the one live cursor and invalidates both its local caches and the
//! owning tree's caches.
//!
//! Destruction is explicit ([`Tree::destroy`]); trees do not free their
//! nodes on drop, because the arena is injected per call rather than
//! reachable from a destructor.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::arena::NodeId;
use crate::env::Environment;
use crate::error::{SymbolError, TreeError, TreeResult};
use crate::render::render;
use crate::traverse::{NodeFilter, for_each_node, nth_node_path, subtree_width};
use crate::{Arity, traverse};

/// Structural statistics of a subtree, computed in one level-order pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeDescription {
    /// Total node count.
    pub size: usize,
    /// Maximum node depth (the root is at depth 0).
    pub depth: usize,
    /// Number of leaves.
    pub term_count: usize,
    /// Number of internal nodes.
    pub nonterm_count: usize,
}

fn describe_subtree<C>(env: &Environment<C>, root: NodeId) -> TreeDescription {
    let mut description = TreeDescription::default();
    for_each_node(env.arena(), root, |id, _, depth| {
        description.size += 1;
        description.depth = description.depth.max(depth);
        if id.is_terminal() {
            description.term_count += 1;
        } else {
            description.nonterm_count += 1;
        }
        false
    });
    description
}

/// Replace the node in a slot with a fresh node declared by `name`,
/// keeping the child handles. Arities must match.
fn replace_symbol<C>(
    env: &mut Environment<C>,
    current: NodeId,
    name: &str,
) -> TreeResult<NodeId> {
    let symbol =
        env.symbol_id(name).ok_or_else(|| SymbolError::NotFound(name.to_string()))?;
    let arity = env.symbols().get(symbol).arity();
    if current.is_empty() {
        return Ok(env.make_id(symbol));
    }
    if arity != current.arity() {
        return Err(TreeError::ArityMismatch { expected: current.arity(), found: arity });
    }
    let replacement = env.make_id(symbol);
    for n in 0..arity {
        let child = env.arena().argument(current, n);
        env.arena_mut().set_argument(replacement, n, child);
    }
    env.arena_mut().destroy(current);
    Ok(replacement)
}

/// An owned expression tree: a root handle plus lazily computed, lazily
/// invalidated structural statistics.
#[derive(Debug)]
pub struct Tree {
    root: NodeId,
    description: Cell<Option<TreeDescription>>,
    width: Cell<Option<usize>>,
}

impl Tree {
    /// Wrap a root handle. The tree takes ownership: destroying or
    /// replacing content through the tree frees the wrapped nodes.
    #[must_use]
    pub fn new(root: NodeId) -> Tree {
        Tree { root, description: Cell::new(None), width: Cell::new(None) }
    }

    /// The root handle.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether every reachable node is non-empty.
    #[must_use]
    pub fn is_valid<C>(&self, env: &Environment<C>) -> bool {
        traverse::is_valid_subtree(env.arena(), self.root)
    }

    /// Arity of the root node.
    #[must_use]
    pub fn arity(&self) -> Arity {
        self.root.arity()
    }

    /// Structural statistics, computed on first use and cached until the
    /// next mutation. An empty tree describes as all zeros.
    pub fn describe<C>(&self, env: &Environment<C>) -> TreeDescription {
        if let Some(description) = self.description.get() {
            return description;
        }
        let description = describe_subtree(env, self.root);
        self.description.set(Some(description));
        description
    }

    /// Leaf count, computed by the memoized width pass and cached until
    /// the next mutation.
    pub fn width<C>(&self, env: &Environment<C>) -> usize {
        if let Some(width) = self.width.get() {
            return width;
        }
        let width = subtree_width(env.arena(), self.root);
        self.width.set(Some(width));
        width
    }

    /// Render as a parenthesized prefix expression.
    ///
    /// # Errors
    ///
    /// Fails if a node references an unregistered symbol.
    pub fn render<C>(&self, env: &Environment<C>) -> Result<String, SymbolError> {
        render(env, self.root)
    }

    /// Cursor over the `n`-th node in level order.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NodeOutOfRange`] if the tree has fewer nodes.
    pub fn subtree<'t, C>(
        &'t mut self,
        env: &Environment<C>,
        n: usize,
    ) -> TreeResult<Subtree<'t>> {
        self.subtree_filtered(env, n, &NodeFilter::default())
    }

    /// Cursor over the `n`-th node matching `filter` in level order.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NodeOutOfRange`] if fewer than `n + 1` matching
    /// nodes exist.
    pub fn subtree_filtered<'t, C>(
        &'t mut self,
        env: &Environment<C>,
        n: usize,
        filter: &NodeFilter,
    ) -> TreeResult<Subtree<'t>> {
        let (_, path) = nth_node_path(env.arena(), self.root, n, filter)?;
        Ok(Subtree::new(self, path))
    }

    /// Cursor over the `n`-th leaf in level order.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NodeOutOfRange`] if the tree has fewer leaves.
    pub fn terminal<'t, C>(&'t mut self, env: &Environment<C>, n: usize) -> TreeResult<Subtree<'t>> {
        self.subtree_filtered(env, n, &NodeFilter::terminals())
    }

    /// Cursor over the `n`-th internal node in level order.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NodeOutOfRange`] if the tree has fewer internal
    /// nodes.
    pub fn nonterminal<'t, C>(
        &'t mut self,
        env: &Environment<C>,
        n: usize,
    ) -> TreeResult<Subtree<'t>> {
        self.subtree_filtered(env, n, &NodeFilter::nonterminals())
    }

    /// Cursor over the root's `n`-th child slot.
    ///
    /// # Errors
    ///
    /// Fails on an empty root or `n >= arity`.
    pub fn argument<'t, C>(&'t mut self, _env: &Environment<C>, n: Arity) -> TreeResult<Subtree<'t>> {
        if self.root.is_empty() {
            return Err(TreeError::EmptyNode);
        }
        if n >= self.root.arity() {
            return Err(TreeError::ArgumentOutOfRange { arity: self.root.arity(), requested: n });
        }
        Ok(Subtree::new(self, vec![n]))
    }

    /// Replace the root node with one declared by `name`, keeping the
    /// children. The arities must match.
    ///
    /// # Errors
    ///
    /// Fails if the symbol is missing or declares a different arity.
    pub fn set_symbol<C>(&mut self, env: &mut Environment<C>, name: &str) -> TreeResult<()> {
        self.root = replace_symbol(env, self.root, name)?;
        self.reset_cache();
        Ok(())
    }

    /// Exchange the subtrees under the `n1`-th and `n2`-th nodes of this
    /// tree.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NodeOutOfRange`] if either node number is out
    /// of range. Exchanging a node with one of its own descendants is a
    /// contract violation and panics.
    pub fn swap_subtrees<C>(
        &mut self,
        env: &mut Environment<C>,
        n1: usize,
        n2: usize,
    ) -> TreeResult<()> {
        let filter = NodeFilter::default();
        let (id1, path1) = nth_node_path(env.arena(), self.root, n1, &filter)?;
        let (id2, path2) = nth_node_path(env.arena(), self.root, n2, &filter)?;
        if path1 == path2 {
            return Ok(());
        }
        assert!(
            !is_prefix(&path1, &path2) && !is_prefix(&path2, &path1),
            "cannot swap a subtree with its own descendant"
        );
        self.put_slot(env, &path1, id2);
        self.put_slot(env, &path2, id1);
        Ok(())
    }

    /// Deep copy into a new tree.
    pub fn copy<C>(&self, env: &mut Environment<C>) -> Tree {
        Tree::new(env.arena_mut().copy_subtree(self.root))
    }

    /// Destroy every node and consume the tree.
    pub fn destroy<C>(self, env: &mut Environment<C>) {
        env.arena_mut().destroy_subtree(self.root);
    }

    /// Release ownership of the root handle without destroying anything.
    #[must_use]
    pub fn into_root(self) -> NodeId {
        self.root
    }

    /// Resolve a child-index path to the handle stored there.
    pub(crate) fn get_slot<C>(&self, env: &Environment<C>, path: &[Arity]) -> NodeId {
        let mut id = self.root;
        for &n in path {
            id = env.arena().argument(id, n);
        }
        id
    }

    /// Overwrite the slot addressed by `path` and invalidate the caches.
    /// The previous content is not destroyed.
    pub(crate) fn put_slot<C>(&mut self, env: &mut Environment<C>, path: &[Arity], id: NodeId) {
        match path.split_last() {
            None => self.root = id,
            Some((&last, parent_path)) => {
                let parent = self.get_slot(env, parent_path);
                env.arena_mut().set_argument(parent, last, id);
            }
        }
        self.reset_cache();
    }

    fn reset_cache(&self) {
        self.description.set(None);
        self.width.set(None);
    }
}

fn is_prefix(prefix: &[Arity], path: &[Arity]) -> bool {
    path.len() >= prefix.len() && &path[..prefix.len()] == prefix
}

/// Non-owning cursor over one slot of a [`Tree`].
///
/// Structural mutation through the cursor invalidates the cursor's local
/// statistics and the owning tree's, since ancestor statistics are derived
/// from the whole subtree.
#[derive(Debug)]
pub struct Subtree<'t> {
    tree: &'t mut Tree,
    path: Vec<Arity>,
    description: Cell<Option<TreeDescription>>,
    width: Cell<Option<usize>>,
}

impl<'t> Subtree<'t> {
    fn new(tree: &'t mut Tree, path: Vec<Arity>) -> Subtree<'t> {
        Subtree { tree, path, description: Cell::new(None), width: Cell::new(None) }
    }

    /// The handle currently stored in the cursor's slot.
    #[must_use]
    pub fn id<C>(&self, env: &Environment<C>) -> NodeId {
        self.tree.get_slot(env, &self.path)
    }

    /// Arity of the node in the slot.
    #[must_use]
    pub fn arity<C>(&self, env: &Environment<C>) -> Arity {
        self.id(env).arity()
    }

    /// Structural statistics of the subtree under the slot, cached on the
    /// cursor until its next mutation.
    pub fn describe<C>(&self, env: &Environment<C>) -> TreeDescription {
        if let Some(description) = self.description.get() {
            return description;
        }
        let description = describe_subtree(env, self.id(env));
        self.description.set(Some(description));
        description
    }

    /// Leaf count of the subtree under the slot.
    pub fn width<C>(&self, env: &Environment<C>) -> usize {
        if let Some(width) = self.width.get() {
            return width;
        }
        let width = subtree_width(env.arena(), self.id(env));
        self.width.set(Some(width));
        width
    }

    /// Render the subtree under the slot.
    ///
    /// # Errors
    ///
    /// Fails if a node references an unregistered symbol.
    pub fn render<C>(&self, env: &Environment<C>) -> Result<String, SymbolError> {
        render(env, self.id(env))
    }

    /// Narrow the cursor to the current node's `n`-th child slot.
    ///
    /// # Errors
    ///
    /// Fails on an empty slot or `n >= arity`.
    pub fn into_argument<C>(self, env: &Environment<C>, n: Arity) -> TreeResult<Subtree<'t>> {
        let id = self.id(env);
        if id.is_empty() {
            return Err(TreeError::EmptyNode);
        }
        if n >= id.arity() {
            return Err(TreeError::ArgumentOutOfRange { arity: id.arity(), requested: n });
        }
        let mut path = self.path;
        path.push(n);
        Ok(Subtree::new(self.tree, path))
    }

    /// Deep-copy the subtree under the slot into a new tree.
    pub fn copy_to_tree<C>(&self, env: &mut Environment<C>) -> Tree {
        let id = self.tree.get_slot(env, &self.path);
        Tree::new(env.arena_mut().copy_subtree(id))
    }

    /// Destroy the subtree under the slot, leaving the slot empty.
    pub fn destroy<C>(&mut self, env: &mut Environment<C>) {
        let id = self.tree.get_slot(env, &self.path);
        env.arena_mut().destroy_subtree(id);
        self.tree.put_slot(env, &self.path, NodeId::EMPTY);
        self.reset_cache();
    }

    /// Destroy the current content and graft `tree`'s nodes into the slot,
    /// consuming the tree.
    pub fn replace<C>(&mut self, env: &mut Environment<C>, tree: Tree) {
        let old = self.tree.get_slot(env, &self.path);
        env.arena_mut().destroy_subtree(old);
        self.tree.put_slot(env, &self.path, tree.into_root());
        self.reset_cache();
    }

    /// Exchange the subtrees under this cursor and `other`, a cursor over
    /// a different tree. Both trees' caches are invalidated.
    pub fn swap<C>(&mut self, env: &mut Environment<C>, other: &mut Subtree<'_>) {
        let a = self.tree.get_slot(env, &self.path);
        let b = other.tree.get_slot(env, &other.path);
        self.tree.put_slot(env, &self.path, b);
        other.tree.put_slot(env, &other.path, a);
        self.reset_cache();
        other.reset_cache();
    }

    /// Replace the node in the slot with one declared by `name`, keeping
    /// the children. The arities must match.
    ///
    /// # Errors
    ///
    /// Fails if the symbol is missing or declares a different arity.
    pub fn set_symbol<C>(&mut self, env: &mut Environment<C>, name: &str) -> TreeResult<()> {
        let current = self.tree.get_slot(env, &self.path);
        let replacement = replace_symbol(env, current, name)?;
        self.tree.put_slot(env, &self.path, replacement);
        self.reset_cache();
        Ok(())
    }

    fn reset_cache(&self) {
        self.description.set(None);
        self.width.set(None);
    }
}
