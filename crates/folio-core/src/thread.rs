//! Reply threading: turning a book's flat comment rows into a forest.
//!
//! Two inputs are combined: every comment of the book, and the store's own
//! list of root comments. The root list is the authoritative fact; the
//! in-memory `parent_id` pointers are only used to place replies and to
//! detect broken ancestry.
//!
//! Broken ancestry is repaired, never reported. A reply whose parent chain
//! runs into a missing comment or loops back on itself is promoted to a root
//! so that nothing stored is ever hidden from the rendered thread.
//!
//! Reply chains can be arbitrarily deep, so nothing here recurses per level:
//! building, walking and dropping a forest all use explicit stacks, and every
//! comment's ancestry is settled once.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::comment::Comment;

// ─── Tree node ───────────────────────────────────────────────────────────────

/// A comment together with its full reply subtree.
#[derive(Debug, Serialize)]
pub struct CommentNode {
  pub comment: Comment,
  /// Direct replies, oldest first.
  pub replies: Vec<CommentNode>,
}

impl CommentNode {
  fn leaf(comment: Comment) -> Self {
    Self { comment, replies: Vec::new() }
  }

  /// Number of comments in this subtree, including this one.
  pub fn subtree_len(&self) -> usize {
    let mut len = 0;
    self.walk(&mut |_| len += 1);
    len
  }

  /// Find a comment anywhere in this subtree.
  pub fn find(&self, comment_id: Uuid) -> Option<&CommentNode> {
    let mut stack = vec![self];
    while let Some(node) = stack.pop() {
      if node.comment.comment_id == comment_id {
        return Some(node);
      }
      stack.extend(node.replies.iter().rev());
    }
    None
  }

  /// Visit every comment in this subtree, parents before replies, siblings
  /// oldest first.
  pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Comment)) {
    let mut stack = vec![self];
    while let Some(node) = stack.pop() {
      visit(&node.comment);
      stack.extend(node.replies.iter().rev());
    }
  }
}

impl Drop for CommentNode {
  // Flatten the subtree first; the default drop glue recurses once per level.
  fn drop(&mut self) {
    let mut pending = std::mem::take(&mut self.replies);
    while let Some(mut node) = pending.pop() {
      pending.append(&mut node.replies);
    }
  }
}

/// Total number of comments in a forest.
pub fn forest_len(forest: &[CommentNode]) -> usize {
  forest.iter().map(CommentNode::subtree_len).sum()
}

/// Ids of every comment in `forest` that `viewer` has liked.
pub fn liked_by(forest: &[CommentNode], viewer: Uuid) -> BTreeSet<Uuid> {
  let mut liked = BTreeSet::new();
  for root in forest {
    root.walk(&mut |c| {
      if c.is_liked_by(viewer) {
        liked.insert(c.comment_id);
      }
    });
  }
  liked
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// The result of [`build_forest`].
#[derive(Debug, Default)]
pub struct Forest {
  pub roots:    Vec<CommentNode>,
  /// Comments that were shown as roots because their ancestry was broken.
  pub promoted: Vec<Uuid>,
}

/// Build the display forest for one book.
///
/// - `comments`: every comment of the book, in any order, possibly with
///   duplicates.
/// - `roots`: the store's authoritative root list, possibly with duplicates.
///
/// Roots come out in the order of `roots` (first occurrence wins), followed by
/// promoted comments ordered by creation time. Replies are ordered by
/// creation time, ties broken by id. Every distinct comment appears exactly
/// once. Runs in time linear in the number of comments, whatever the depth.
pub fn build_forest(comments: Vec<Comment>, roots: Vec<Comment>) -> Forest {
  // De-duplicate by id, first occurrence wins.
  let mut order: Vec<Uuid> = Vec::with_capacity(comments.len());
  let mut by_id: HashMap<Uuid, Comment> = HashMap::with_capacity(comments.len());
  for c in comments {
    if !by_id.contains_key(&c.comment_id) {
      order.push(c.comment_id);
      by_id.insert(c.comment_id, c);
    }
  }

  let mut root_ids: Vec<Uuid> = Vec::with_capacity(roots.len());
  let mut root_set: HashSet<Uuid> = HashSet::with_capacity(roots.len());
  for r in roots {
    if !root_set.insert(r.comment_id) {
      continue;
    }
    root_ids.push(r.comment_id);
    if !by_id.contains_key(&r.comment_id) {
      order.push(r.comment_id);
    }
    // The stored root row beats a stale in-memory parent pointer.
    by_id.insert(r.comment_id, r);
  }

  // Orphan repair.
  let anchored = settle_ancestry(&order, &by_id, &root_set);
  let mut promoted: Vec<Uuid> = order
    .iter()
    .copied()
    .filter(|id| !root_set.contains(id))
    .filter(|id| anchored.get(id) == Some(&false))
    .collect();
  promoted.sort_by_key(|id| by_id[id].chronological_key());

  let final_roots: Vec<Uuid> =
    root_ids.iter().chain(promoted.iter()).copied().collect();
  let final_root_set: HashSet<Uuid> = final_roots.iter().copied().collect();

  // parent → direct children. Roots are never attached as replies.
  let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
  for id in &order {
    if final_root_set.contains(id) {
      continue;
    }
    if let Some(parent) = by_id[id].parent_id {
      children.entry(parent).or_default().push(*id);
    }
  }
  for kids in children.values_mut() {
    kids.sort_by_key(|id| by_id[id].chronological_key());
  }

  let roots = assemble(final_roots, by_id, &children);
  Forest { roots, promoted }
}

/// Decide for every non-root comment whether its ancestor chain reaches an
/// authoritative root. A missing ancestor, a repeated id, or a chain that
/// ends without reaching a listed root all count as not anchored.
///
/// Every comment on a walked chain shares the chain's outcome, so each one
/// is recorded the first time it is walked and never walked again.
fn settle_ancestry(
  order: &[Uuid],
  by_id: &HashMap<Uuid, Comment>,
  root_set: &HashSet<Uuid>,
) -> HashMap<Uuid, bool> {
  let mut settled: HashMap<Uuid, bool> = HashMap::with_capacity(order.len());

  for &start in order {
    if root_set.contains(&start) || settled.contains_key(&start) {
      continue;
    }

    let mut path: Vec<Uuid> = Vec::new();
    let mut on_path: HashSet<Uuid> = HashSet::new();
    let mut current = start;
    let anchored = loop {
      path.push(current);
      on_path.insert(current);

      let Some(parent) = by_id.get(&current).and_then(|c| c.parent_id) else {
        break false;
      };
      if root_set.contains(&parent) {
        break true;
      }
      if let Some(&known) = settled.get(&parent) {
        break known;
      }
      if on_path.contains(&parent) || !by_id.contains_key(&parent) {
        break false;
      }
      current = parent;
    };

    for id in path {
      settled.insert(id, anchored);
    }
  }

  settled
}

/// Lay out the subtrees under `roots`, taking each comment out of `by_id` as
/// it is placed so no comment can be placed twice.
///
/// Comments are first placed in pre-order with the index of their parent,
/// then nodes are assembled from the last placed to the first, so every
/// reply is complete before it is handed to its parent.
fn assemble(
  roots: Vec<Uuid>,
  mut by_id: HashMap<Uuid, Comment>,
  children: &HashMap<Uuid, Vec<Uuid>>,
) -> Vec<CommentNode> {
  let mut slots: Vec<Option<CommentNode>> = Vec::with_capacity(by_id.len());
  let mut parents: Vec<Option<usize>> = Vec::with_capacity(by_id.len());

  for root in roots {
    let mut stack: Vec<(Uuid, Option<usize>)> = vec![(root, None)];
    while let Some((id, parent)) = stack.pop() {
      let Some(comment) = by_id.remove(&id) else {
        continue;
      };
      let index = slots.len();
      slots.push(Some(CommentNode::leaf(comment)));
      parents.push(parent);
      if let Some(kids) = children.get(&id) {
        stack.extend(kids.iter().rev().map(|kid| (*kid, Some(index))));
      }
    }
  }

  // Replies arrive youngest sibling first; each node flips its list once all
  // of its replies have arrived, which is when the node itself is reached.
  let mut forest = Vec::new();
  for index in (0..slots.len()).rev() {
    let Some(mut node) = slots[index].take() else {
      continue;
    };
    node.replies.reverse();
    match parents[index] {
      Some(parent) => {
        if let Some(parent) = slots[parent].as_mut() {
          parent.replies.push(node);
        }
      }
      None => forest.push(node),
    }
  }
  forest.reverse();
  forest
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::{DateTime, TimeZone, Utc};

  use super::*;

  fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
  }

  fn id(n: u128) -> Uuid { Uuid::from_u128(n) }

  fn comment(n: u128, parent: Option<u128>, secs: i64) -> Comment {
    Comment {
      comment_id: id(n),
      book_id:    id(1000),
      author_id:  id(2000),
      parent_id:  parent.map(id),
      content:    format!("comment {n}"),
      created_at: at(secs),
      liked_by:   Vec::new(),
    }
  }

  /// The store's root query: rows whose stored parent is empty.
  fn stored_roots(all: &[Comment]) -> Vec<Comment> {
    all.iter().filter(|c| c.is_root()).cloned().collect()
  }

  fn root_ids(forest: &Forest) -> Vec<Uuid> {
    forest.roots.iter().map(|n| n.comment.comment_id).collect()
  }

  fn reply_ids(node: &CommentNode) -> Vec<Uuid> {
    node.replies.iter().map(|n| n.comment.comment_id).collect()
  }

  #[test]
  fn empty_input_yields_empty_forest() {
    let forest = build_forest(Vec::new(), Vec::new());
    assert!(forest.roots.is_empty());
    assert!(forest.promoted.is_empty());
  }

  #[test]
  fn intact_chain_nests_at_correct_depth() {
    let all = vec![
      comment(3, Some(2), 30),
      comment(1, None, 10),
      comment(2, Some(1), 20),
    ];
    let forest = build_forest(all.clone(), stored_roots(&all));

    assert_eq!(root_ids(&forest), vec![id(1)]);
    let c1 = &forest.roots[0];
    assert_eq!(reply_ids(c1), vec![id(2)]);
    assert_eq!(reply_ids(&c1.replies[0]), vec![id(3)]);
    assert!(c1.replies[0].replies[0].replies.is_empty());
    assert!(forest.promoted.is_empty());
    assert_eq!(forest_len(&forest.roots), 3);
  }

  #[test]
  fn siblings_ordered_by_time_then_id() {
    let all = vec![
      comment(1, None, 0),
      comment(5, Some(1), 20),
      comment(4, Some(1), 10),
      comment(3, Some(1), 10),
    ];
    let forest = build_forest(all.clone(), stored_roots(&all));
    assert_eq!(reply_ids(&forest.roots[0]), vec![id(3), id(4), id(5)]);
  }

  #[test]
  fn duplicate_rows_are_collapsed() {
    let all = vec![
      comment(1, None, 0),
      comment(2, Some(1), 5),
      comment(2, Some(1), 5),
      comment(1, None, 0),
    ];
    let roots = vec![comment(1, None, 0), comment(1, None, 0)];
    let forest = build_forest(all, roots);

    assert_eq!(root_ids(&forest), vec![id(1)]);
    assert_eq!(reply_ids(&forest.roots[0]), vec![id(2)]);
    assert_eq!(forest_len(&forest.roots), 2);
  }

  #[test]
  fn missing_parent_is_promoted() {
    let all = vec![comment(1, None, 0), comment(2, Some(99), 5)];
    let forest = build_forest(all.clone(), stored_roots(&all));

    assert_eq!(root_ids(&forest), vec![id(1), id(2)]);
    assert_eq!(forest.promoted, vec![id(2)]);
  }

  #[test]
  fn every_descendant_of_a_broken_chain_is_promoted() {
    // 2 → 99 (missing); 3 → 2
    let all = vec![comment(3, Some(2), 10), comment(2, Some(99), 5)];
    let forest = build_forest(all.clone(), stored_roots(&all));

    assert_eq!(root_ids(&forest), vec![id(2), id(3)]);
    assert!(forest.roots.iter().all(|n| n.replies.is_empty()));
    assert_eq!(forest_len(&forest.roots), 2);
  }

  #[test]
  fn self_parent_is_promoted() {
    let all = vec![comment(1, None, 0), comment(7, Some(7), 3)];
    let forest = build_forest(all.clone(), stored_roots(&all));

    assert_eq!(root_ids(&forest), vec![id(1), id(7)]);
    assert!(forest.roots[1].replies.is_empty());
  }

  #[test]
  fn cycle_members_are_promoted_once_each() {
    // 2 → 3 → 2, and 4 hangs off the cycle.
    let all = vec![
      comment(2, Some(3), 1),
      comment(3, Some(2), 2),
      comment(4, Some(2), 3),
    ];
    let forest = build_forest(all.clone(), stored_roots(&all));

    assert_eq!(root_ids(&forest), vec![id(2), id(3), id(4)]);
    assert_eq!(forest_len(&forest.roots), 3);
  }

  #[test]
  fn declared_root_missing_from_stored_roots_is_kept() {
    // The root query raced with an insert and did not see comment 2.
    let all = vec![comment(1, None, 0), comment(2, None, 5), comment(3, Some(2), 6)];
    let roots = vec![comment(1, None, 0)];
    let forest = build_forest(all, roots);

    assert_eq!(root_ids(&forest), vec![id(1), id(2), id(3)]);
    assert_eq!(forest.promoted, vec![id(2), id(3)]);
    assert_eq!(forest_len(&forest.roots), 3);
  }

  #[test]
  fn stored_root_wins_over_stale_parent_pointer() {
    // In memory, 2 still claims parent 1; the store says 2 is a root.
    let all = vec![comment(1, None, 0), comment(2, Some(1), 5), comment(3, Some(2), 6)];
    let roots = vec![comment(1, None, 0), comment(2, None, 5)];
    let forest = build_forest(all, roots);

    assert_eq!(root_ids(&forest), vec![id(1), id(2)]);
    assert!(forest.roots[0].replies.is_empty());
    assert_eq!(reply_ids(&forest.roots[1]), vec![id(3)]);
    assert!(forest.roots[1].comment.parent_id.is_none());
    assert_eq!(forest_len(&forest.roots), 3);
  }

  #[test]
  fn stored_root_absent_from_flat_rows_is_still_shown() {
    let all = vec![comment(2, Some(1), 5)];
    let roots = vec![comment(1, None, 0)];
    let forest = build_forest(all, roots);

    assert_eq!(root_ids(&forest), vec![id(1)]);
    assert_eq!(reply_ids(&forest.roots[0]), vec![id(2)]);
  }

  #[test]
  fn node_count_matches_distinct_input() {
    let cases: Vec<Vec<Comment>> = vec![
      vec![comment(1, None, 0)],
      vec![comment(1, Some(1), 0), comment(2, Some(1), 1)],
      vec![
        comment(1, None, 0),
        comment(2, Some(1), 1),
        comment(3, Some(2), 2),
        comment(4, Some(5), 3),
        comment(5, Some(4), 4),
        comment(6, Some(42), 5),
        comment(7, Some(6), 6),
        comment(3, Some(2), 2),
      ],
      (1..=40)
        .map(|n| comment(n, (n > 1).then(|| (n * 7) % 41), n as i64))
        .collect(),
    ];

    for all in cases {
      let distinct: HashSet<Uuid> = all.iter().map(|c| c.comment_id).collect();
      let forest = build_forest(all.clone(), stored_roots(&all));

      let mut seen = Vec::new();
      for root in &forest.roots {
        root.walk(&mut |c| seen.push(c.comment_id));
      }
      let seen_set: HashSet<Uuid> = seen.iter().copied().collect();
      assert_eq!(seen.len(), distinct.len(), "duplicated or lost node");
      assert_eq!(seen_set, distinct);
    }
  }

  #[test]
  fn each_root_owns_only_its_descendants() {
    let all = vec![
      comment(1, None, 0),
      comment(2, None, 1),
      comment(3, Some(1), 2),
      comment(4, Some(2), 3),
    ];
    let forest = build_forest(all.clone(), stored_roots(&all));

    assert_eq!(reply_ids(&forest.roots[0]), vec![id(3)]);
    assert_eq!(reply_ids(&forest.roots[1]), vec![id(4)]);
    assert!(forest.roots[0].find(id(4)).is_none());
  }

  #[test]
  fn liked_by_collects_across_depths() {
    let viewer = id(5000);
    let mut c1 = comment(1, None, 0);
    let c2 = comment(2, Some(1), 1);
    let mut c3 = comment(3, Some(2), 2);
    c1.liked_by = vec![viewer];
    c3.liked_by = vec![id(6000), viewer];

    let all = vec![c1, c2, c3];
    let forest = build_forest(all.clone(), stored_roots(&all));
    let liked = liked_by(&forest.roots, viewer);

    assert_eq!(liked, BTreeSet::from([id(1), id(3)]));
    assert!(liked_by(&forest.roots, id(7000)).is_empty());
  }

  #[test]
  fn serialises_replies_inline() {
    let all = vec![comment(1, None, 0), comment(2, Some(1), 1)];
    let forest = build_forest(all.clone(), stored_roots(&all));
    let json = serde_json::to_value(&forest.roots).unwrap();

    assert_eq!(json[0]["comment"]["content"], "comment 1");
    assert_eq!(json[0]["replies"][0]["comment"]["content"], "comment 2");
    assert_eq!(json[0]["replies"][0]["replies"], serde_json::json!([]));
  }

  #[test]
  fn deep_chain_builds_without_recursion() {
    const DEPTH: u128 = 50_000;
    let viewer = id(9_000_000);
    let all: Vec<Comment> = (1..=DEPTH)
      .map(|n| {
        let mut c = comment(n, (n > 1).then(|| n - 1), n as i64);
        if n == DEPTH {
          c.liked_by = vec![viewer];
        }
        c
      })
      .collect();
    let forest = build_forest(all.clone(), stored_roots(&all));

    assert_eq!(root_ids(&forest), vec![id(1)]);
    assert!(forest.promoted.is_empty());
    assert_eq!(forest_len(&forest.roots), DEPTH as usize);
    assert_eq!(liked_by(&forest.roots, viewer), BTreeSet::from([id(DEPTH)]));
    assert!(forest.roots[0].find(id(DEPTH)).is_some());

    // Every level holds exactly the next comment of the chain.
    let mut node = &forest.roots[0];
    let mut depth = 1;
    while let Some(reply) = node.replies.first() {
      assert_eq!(node.replies.len(), 1);
      assert_eq!(reply.comment.parent_id, Some(node.comment.comment_id));
      node = reply;
      depth += 1;
    }
    assert_eq!(depth, DEPTH);
  }

  #[test]
  fn deep_broken_chain_promotes_every_link() {
    // 1 → 2 → … → 20 000 → 0 (missing): every link is orphaned.
    const DEPTH: u128 = 20_000;
    let all: Vec<Comment> = (1..=DEPTH)
      .map(|n| comment(n, Some(if n == DEPTH { 0 } else { n + 1 }), n as i64))
      .collect();
    let forest = build_forest(all.clone(), Vec::new());

    assert_eq!(forest.promoted.len(), DEPTH as usize);
    assert_eq!(forest.roots.len(), DEPTH as usize);
    assert!(forest.roots.iter().all(|n| n.replies.is_empty()));
  }

  #[test]
  fn deep_cycle_is_promoted_whole() {
    // A 10 000-long loop with a chain hanging off it.
    const LOOP: u128 = 10_000;
    let mut all: Vec<Comment> = (1..=LOOP)
      .map(|n| comment(n, Some(if n == LOOP { 1 } else { n + 1 }), n as i64))
      .collect();
    all.push(comment(LOOP + 1, Some(5), 0));
    let forest = build_forest(all.clone(), Vec::new());

    assert_eq!(forest.promoted.len(), LOOP as usize + 1);
    assert_eq!(forest_len(&forest.roots), LOOP as usize + 1);
  }
}
