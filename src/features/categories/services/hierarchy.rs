use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::features::categories::dtos::CategoryTreeDto;
use crate::features::categories::models::CategoryWithCounts;

pub fn self_parent_error() -> AppError {
    AppError::BadRequest("A category cannot be its own parent".to_string())
}

pub fn cycle_error() -> AppError {
    AppError::BadRequest("Cannot move a category under one of its own descendants".to_string())
}

pub fn parent_not_found(parent_id: Uuid) -> AppError {
    AppError::NotFound(format!("Parent category {} not found", parent_id))
}

/// Upward walk over parent pointers.
///
/// The walk never yields an id twice and never yields its origin, so it
/// terminates on corrupt cyclic data. Storage is left to the caller:
/// `next_ancestor` names the row to load, `step` feeds back that row's
/// parent.
#[derive(Debug)]
pub struct AncestorWalk {
    visited: HashSet<Uuid>,
    next: Option<Uuid>,
    revisited: Option<Uuid>,
}

impl AncestorWalk {
    pub fn new(origin: Uuid, parent: Option<Uuid>) -> Self {
        Self {
            visited: HashSet::from([origin]),
            next: parent,
            revisited: None,
        }
    }

    /// Next id to load, or `None` once a root or an already-seen id is hit
    pub fn next_ancestor(&mut self) -> Option<Uuid> {
        let id = self.next.take()?;
        if !self.visited.insert(id) {
            self.revisited = Some(id);
            return None;
        }
        Some(id)
    }

    /// Record the parent of the ancestor just loaded
    pub fn step(&mut self, parent: Option<Uuid>) {
        self.next = parent;
    }

    /// The id that ended the walk by being seen twice, if any
    pub fn revisited(&self) -> Option<Uuid> {
        self.revisited
    }
}

/// Parent pointer source for [`check_reparent`].
#[async_trait]
pub trait ParentLookup: Send {
    /// `None` for an unknown id, `Some(parent_id)` otherwise
    async fn parent_of(&mut self, id: Uuid) -> Result<Option<Option<Uuid>>, AppError>;
}

/// Validate moving `category_id` under `new_parent`.
///
/// Rejects a self parent, an unknown parent and a parent that sits below
/// `category_id`. Any id seen twice on the way up counts as a cycle, so
/// corrupt data fails closed.
pub async fn check_reparent<L>(
    lookup: &mut L,
    category_id: Uuid,
    new_parent: Uuid,
) -> Result<(), AppError>
where
    L: ParentLookup + ?Sized,
{
    if new_parent == category_id {
        tracing::warn!(category_id = %category_id, "Rejected self-parenting");
        return Err(self_parent_error());
    }

    let mut walk = AncestorWalk::new(category_id, Some(new_parent));
    while let Some(id) = walk.next_ancestor() {
        match lookup.parent_of(id).await? {
            Some(parent) => walk.step(parent),
            None if id == new_parent => return Err(parent_not_found(new_parent)),
            None => break,
        }
    }

    if let Some(revisited) = walk.revisited() {
        tracing::warn!(
            category_id = %category_id,
            new_parent = %new_parent,
            revisited = %revisited,
            "Rejected re-parent that would create a cycle"
        );
        return Err(cycle_error());
    }

    Ok(())
}

/// Level-by-level assembly of the nested category tree.
///
/// Nodes live in an arena and are linked to their parent by index; `finish`
/// nests them without recursion. Each level is fed from one batched child
/// query over `frontier()`.
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<Option<CategoryTreeDto>>,
    parents: Vec<Option<usize>>,
    index: HashMap<Uuid, usize>,
    frontier: Vec<Uuid>,
    depth: usize,
    max_depth: usize,
}

impl TreeBuilder {
    pub fn new(max_depth: usize) -> Self {
        Self {
            nodes: Vec::new(),
            parents: Vec::new(),
            index: HashMap::new(),
            frontier: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    pub fn add_roots(&mut self, rows: Vec<CategoryWithCounts>) {
        self.frontier.clear();
        for row in rows {
            self.push(row, None);
        }
        self.depth = 1;
    }

    /// Ids whose children should be fetched next, or `None` when the tree
    /// is complete or the depth bound is reached
    pub fn frontier(&self) -> Option<&[Uuid]> {
        if self.frontier.is_empty() || self.depth >= self.max_depth {
            return None;
        }
        Some(&self.frontier)
    }

    /// Attach one level of children. Rows already in the tree, or whose
    /// parent is not part of it, are skipped.
    pub fn add_level(&mut self, rows: Vec<CategoryWithCounts>) {
        self.frontier.clear();
        for row in rows {
            let parent = row
                .category
                .parent_id
                .and_then(|id| self.index.get(&id).copied());
            if parent.is_some() {
                self.push(row, parent);
            }
        }
        self.depth += 1;
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn finish(mut self) -> Vec<CategoryTreeDto> {
        // Children always sit after their parent in the arena, so a reverse
        // pass sees every subtree complete before moving it.
        for i in (0..self.nodes.len()).rev() {
            let Some(parent) = self.parents[i] else {
                continue;
            };
            if let Some(mut node) = self.nodes[i].take() {
                node.children.reverse();
                if let Some(Some(parent_node)) = self.nodes.get_mut(parent) {
                    parent_node.children.push(node);
                }
            }
        }

        self.nodes
            .into_iter()
            .flatten()
            .map(|mut root| {
                root.children.reverse();
                root
            })
            .collect()
    }

    fn push(&mut self, row: CategoryWithCounts, parent: Option<usize>) {
        let id = row.category.id;
        if self.index.contains_key(&id) {
            return;
        }
        self.index.insert(id, self.nodes.len());
        self.nodes.push(Some(row.into()));
        self.parents.push(parent);
        self.frontier.push(id);
    }
}
