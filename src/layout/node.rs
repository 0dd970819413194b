//! Layout tree types

use serde::{Deserialize, Serialize};

use crate::domain::SessionId;

/// Tolerance used when checking that split sizes add up to 100
pub const SIZE_EPSILON: f64 = 1e-6;

/// Axis along which a split lays out its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    /// Children are columns, left to right
    Horizontal,
    /// Children are rows, top to bottom
    Vertical,
}

impl std::str::FromStr for SplitDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "horizontal" | "h" => Ok(SplitDirection::Horizontal),
            "vertical" | "v" => Ok(SplitDirection::Vertical),
            other => Err(format!("Unknown split direction: {}", other)),
        }
    }
}

/// A node of a workspace's pane tree. Sizes are percentages of the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaneNode {
    #[serde(rename_all = "camelCase")]
    Terminal { terminal_id: SessionId },
    Split {
        direction: SplitDirection,
        children: Vec<PaneNode>,
        sizes: Vec<f64>,
    },
}

impl PaneNode {
    pub fn terminal(terminal_id: SessionId) -> Self {
        PaneNode::Terminal { terminal_id }
    }

    /// Terminal ids in depth-first, left-to-right order
    pub fn terminal_ids(&self) -> Vec<SessionId> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                PaneNode::Terminal { terminal_id } => ids.push(*terminal_id),
                PaneNode::Split { children, .. } => stack.extend(children.iter().rev()),
            }
        }
        ids
    }

    pub fn contains(&self, terminal_id: SessionId) -> bool {
        self.path_to(terminal_id).is_some()
    }

    /// Number of split levels above the deepest leaf (a lone leaf has depth 0)
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            max = max.max(depth);
            if let PaneNode::Split { children, .. } = node {
                stack.extend(children.iter().map(|c| (c, depth + 1)));
            }
        }
        max
    }

    /// Child indices leading from this node to the leaf for `terminal_id`
    pub(super) fn path_to(&self, terminal_id: SessionId) -> Option<Vec<usize>> {
        let mut stack = vec![(self, Vec::new())];
        while let Some((node, path)) = stack.pop() {
            match node {
                PaneNode::Terminal { terminal_id: id } if *id == terminal_id => return Some(path),
                PaneNode::Terminal { .. } => {}
                PaneNode::Split { children, .. } => {
                    for (i, child) in children.iter().enumerate() {
                        let mut child_path = path.clone();
                        child_path.push(i);
                        stack.push((child, child_path));
                    }
                }
            }
        }
        None
    }

    pub(super) fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut PaneNode> {
        let mut node = self;
        for &i in path {
            node = match node {
                PaneNode::Split { children, .. } => children.get_mut(i)?,
                PaneNode::Terminal { .. } => return None,
            };
        }
        Some(node)
    }
}

/// Sizes for `n` children, substituting an equal share for any missing entry
pub(super) fn effective_sizes(n: usize, sizes: &[f64]) -> Vec<f64> {
    let share = if n == 0 { 0.0 } else { 100.0 / n as f64 };
    (0..n).map(|i| sizes.get(i).copied().unwrap_or(share)).collect()
}

/// A screen region in percentage units of the workspace display area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// The whole display area
    pub const FULL: Rect = Rect {
        top: 0.0,
        left: 0.0,
        width: 100.0,
        height: 100.0,
    };

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True if the interiors of the two rectangles intersect
    pub fn overlaps(&self, other: &Rect) -> bool {
        let eps = SIZE_EPSILON;
        self.left + eps < other.left + other.width
            && other.left + eps < self.left + self.width
            && self.top + eps < other.top + other.height
            && other.top + eps < self.top + self.height
    }
}
