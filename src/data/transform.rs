// ============================================================
// Layer 4 — Batch Transforms
// ============================================================
// Optional per-batch feature augmentation, chosen once per run:
//
//   Identity  — features pass through untouched
//   AddEgoIds — appends one node-feature column that is 1.0 for
//               the endpoints of the batch's seed edges and 0.0
//               for every sampled context node, so the model can
//               tell "the transaction being scored" apart from
//               its neighbourhood
//
// Because the column is appended, the node input width of the
// model depends on the transform; the model is therefore sized
// from a real sample batch rather than from the raw dataset.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    AddEgoIds,
}

impl Transform {
    pub fn from_ego_flag(ego: bool) -> Self {
        if ego { Transform::AddEgoIds } else { Transform::Identity }
    }

    /// How many node-feature columns this transform appends.
    pub fn extra_node_features(&self) -> usize {
        match self {
            Transform::Identity  => 0,
            Transform::AddEgoIds => 1,
        }
    }

    /// Apply to the local node feature rows of one sampled batch.
    pub fn apply(&self, node_features: &mut [Vec<f32>], seed_nodes: impl Iterator<Item = usize>) {
        match self {
            Transform::Identity => {}
            Transform::AddEgoIds => {
                for row in node_features.iter_mut() {
                    row.push(0.0);
                }
                for node in seed_nodes {
                    if let Some(flag) = node_features[node].last_mut() {
                        *flag = 1.0;
                    }
                }
            }
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_a_no_op() {
        let mut rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        Transform::Identity.apply(&mut rows, [0usize].into_iter());
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_ego_ids_mark_seed_endpoints_only() {
        let mut rows = vec![vec![5.0]; 4];
        Transform::AddEgoIds.apply(&mut rows, [0usize, 2, 2].into_iter());
        assert_eq!(rows, vec![vec![5.0, 1.0], vec![5.0, 0.0], vec![5.0, 1.0], vec![5.0, 0.0]]);
    }

    #[test]
    fn test_flag_selection() {
        assert_eq!(Transform::from_ego_flag(true), Transform::AddEgoIds);
        assert_eq!(Transform::from_ego_flag(false).extra_node_features(), 0);
    }
}
