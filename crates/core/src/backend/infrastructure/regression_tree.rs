use serde::{Deserialize, Serialize};

/// A pixel-difference feature: intensity at pool point `a` minus the
/// intensity at pool point `b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitFeature {
    pub a: u32,
    pub b: u32,
}

impl SplitFeature {
    pub fn value(&self, intensities: &[f32]) -> f32 {
        intensities[self.a as usize] - intensities[self.b as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: SplitFeature,
        threshold: f32,
        left: u32,
        right: u32,
    },
    /// Flattened `(dx0, dy0, dx1, dy1, ...)` shape delta in box-normalised
    /// coordinates.
    Leaf { delta: Vec<f32> },
}

/// A regression tree; node 0 is the root.
///
/// At a split, a feature value above the threshold goes left, anything
/// else goes right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Leaf index and delta reached for the given pool intensities.
    pub fn leaf(&self, intensities: &[f32]) -> (usize, &[f32]) {
        let mut node_idx = 0usize;
        loop {
            match &self.nodes[node_idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node_idx = if feature.value(intensities) > *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
                TreeNode::Leaf { delta } => return (node_idx, delta.as_slice()),
            }
        }
    }

    pub fn predict(&self, intensities: &[f32]) -> &[f32] {
        self.leaf(intensities).1
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        self.depth_from(0)
    }

    fn depth_from(&self, node_idx: usize) -> usize {
        match &self.nodes[node_idx] {
            TreeNode::Split { left, right, .. } => {
                1 + self
                    .depth_from(*left as usize)
                    .max(self.depth_from(*right as usize))
            }
            TreeNode::Leaf { .. } => 0,
        }
    }
}

/// A pixel location anchored to a landmark of the current shape estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolPoint {
    pub anchor: u32,
    pub dx: f32,
    pub dy: f32,
}

/// One cascade level: its feature pool and the trees fit against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeLevel {
    pub pool: Vec<PoolPoint>,
    pub trees: Vec<RegressionTree>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f32) -> RegressionTree {
        RegressionTree::new(vec![
            TreeNode::Split {
                feature: SplitFeature { a: 0, b: 1 },
                threshold,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf {
                delta: vec![-0.1, -0.1],
            },
            TreeNode::Leaf {
                delta: vec![0.1, 0.1],
            },
        ])
    }

    #[test]
    fn test_greater_than_threshold_goes_left() {
        let tree = stump(50.0);
        assert_eq!(tree.predict(&[200.0, 100.0]), &[-0.1, -0.1]);
        assert_eq!(tree.predict(&[120.0, 100.0]), &[0.1, 0.1]);
    }

    #[test]
    fn test_equal_to_threshold_goes_right() {
        let tree = stump(0.0);
        assert_eq!(tree.leaf(&[10.0, 10.0]).0, 2);
    }

    #[test]
    fn test_depth_counts_splits() {
        assert_eq!(stump(0.0).depth(), 1);
        let leaf_only = RegressionTree::new(vec![TreeNode::Leaf { delta: vec![0.0] }]);
        assert_eq!(leaf_only.depth(), 0);
        assert_eq!(leaf_only.num_nodes(), 1);
    }
}
