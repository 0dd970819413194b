//! Pure layout algorithms over a pane tree

use std::collections::{HashMap, HashSet};

use super::node::{PaneNode, Rect, SIZE_EPSILON, SplitDirection, effective_sizes};
use crate::domain::SessionId;

/// Default cap on split nesting
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Error type for layout mutations and validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("Split would exceed the maximum layout depth of {max_depth}")]
    MaxDepthExceeded { max_depth: usize },

    #[error("Terminal {0} is already placed in the layout")]
    DuplicateTerminal(SessionId),

    #[error("Terminal {0} is not in the layout")]
    TargetNotFound(SessionId),

    #[error("Split has {0} children, needs at least 2")]
    TooFewChildren(usize),

    #[error("Split has {children} children but {sizes} sizes")]
    SizeMismatch { children: usize, sizes: usize },

    #[error("Split sizes sum to {0}, expected 100")]
    BadSizeSum(f64),
}

/// Map every terminal to its screen region.
///
/// A split partitions its rectangle along its direction, proportionally to
/// `sizes`, with offsets accumulated so children neither overlap nor leave
/// gaps.
pub fn bounds(tree: &PaneNode) -> HashMap<SessionId, Rect> {
    let mut out = HashMap::new();
    let mut stack = vec![(tree, Rect::FULL)];

    while let Some((node, rect)) = stack.pop() {
        match node {
            PaneNode::Terminal { terminal_id } => {
                out.insert(*terminal_id, rect);
            }
            PaneNode::Split {
                direction,
                children,
                sizes,
            } => {
                let sizes = effective_sizes(children.len(), sizes);
                let mut offset = 0.0;
                for (child, size) in children.iter().zip(sizes) {
                    let child_rect = match direction {
                        SplitDirection::Horizontal => {
                            let width = rect.width * size / 100.0;
                            let r = Rect {
                                top: rect.top,
                                left: rect.left + offset,
                                width,
                                height: rect.height,
                            };
                            offset += width;
                            r
                        }
                        SplitDirection::Vertical => {
                            let height = rect.height * size / 100.0;
                            let r = Rect {
                                top: rect.top + offset,
                                left: rect.left,
                                width: rect.width,
                                height,
                            };
                            offset += height;
                            r
                        }
                    };
                    stack.push((child, child_rect));
                }
            }
        }
    }

    out
}

/// Replace the leaf for `target` with a 50/50 split of `target` and `new_terminal`.
///
/// An absent `target` returns the tree unchanged. Fails if `new_terminal` is
/// already placed or the split would nest deeper than `max_depth`.
pub fn split(
    tree: &PaneNode,
    target: SessionId,
    direction: SplitDirection,
    new_terminal: SessionId,
    max_depth: usize,
) -> Result<PaneNode, LayoutError> {
    let Some(path) = tree.path_to(target) else {
        return Ok(tree.clone());
    };

    if tree.contains(new_terminal) {
        return Err(LayoutError::DuplicateTerminal(new_terminal));
    }
    if path.len() + 1 > max_depth {
        return Err(LayoutError::MaxDepthExceeded { max_depth });
    }

    let mut next = tree.clone();
    if let Some(leaf) = next.node_at_mut(&path) {
        *leaf = PaneNode::Split {
            direction,
            children: vec![PaneNode::terminal(target), PaneNode::terminal(new_terminal)],
            sizes: vec![50.0, 50.0],
        };
    }
    Ok(next)
}

/// Remove the leaf for `terminal_id`.
///
/// The freed share is spread over the remaining siblings in proportion to
/// their sizes; a split left with one child is replaced by that child.
/// Returns `None` when the removed leaf was the root. An absent id returns
/// the tree unchanged.
pub fn close(tree: &PaneNode, terminal_id: SessionId) -> Option<PaneNode> {
    let Some(path) = tree.path_to(terminal_id) else {
        return Some(tree.clone());
    };
    let Some((&index, parent_path)) = path.split_last() else {
        return None;
    };

    let mut next = tree.clone();
    if let Some(parent) = next.node_at_mut(parent_path) {
        let collapsed = match parent {
            PaneNode::Split {
                children, sizes, ..
            } => {
                let mut remaining_sizes = effective_sizes(children.len(), sizes);
                children.remove(index);
                remaining_sizes.remove(index);
                *sizes = redistribute(&remaining_sizes);

                if children.len() == 1 {
                    children.pop()
                } else {
                    None
                }
            }
            PaneNode::Terminal { .. } => None,
        };

        if let Some(only_child) = collapsed {
            *parent = only_child;
        }
    }
    Some(next)
}

/// Scale sizes so they add up to exactly 100, keeping their ratios.
fn redistribute(sizes: &[f64]) -> Vec<f64> {
    if sizes.is_empty() {
        return Vec::new();
    }

    let total: f64 = sizes.iter().sum();
    let mut scaled: Vec<f64> = if total > SIZE_EPSILON {
        sizes.iter().map(|s| s * 100.0 / total).collect()
    } else {
        vec![100.0 / sizes.len() as f64; sizes.len()]
    };

    // Absorb floating point drift in the last entry
    let head: f64 = scaled[..scaled.len() - 1].iter().sum();
    if let Some(last) = scaled.last_mut() {
        *last = 100.0 - head;
    }
    scaled
}

/// Check every structural invariant of a pane tree.
pub fn validate(tree: &PaneNode) -> Result<(), LayoutError> {
    let mut seen = HashSet::new();
    let mut stack = vec![tree];

    while let Some(node) = stack.pop() {
        match node {
            PaneNode::Terminal { terminal_id } => {
                if !seen.insert(*terminal_id) {
                    return Err(LayoutError::DuplicateTerminal(*terminal_id));
                }
            }
            PaneNode::Split {
                children, sizes, ..
            } => {
                if children.len() < 2 {
                    return Err(LayoutError::TooFewChildren(children.len()));
                }
                if children.len() != sizes.len() {
                    return Err(LayoutError::SizeMismatch {
                        children: children.len(),
                        sizes: sizes.len(),
                    });
                }
                let sum: f64 = sizes.iter().sum();
                if (sum - 100.0).abs() > SIZE_EPSILON {
                    return Err(LayoutError::BadSizeSum(sum));
                }
                stack.extend(children.iter());
            }
        }
    }

    Ok(())
}
