// ============================================================
// Layer 5 — Message Passing Primitives
// ============================================================
// Graph convolutions are built from three tensor operations:
//
//   gather   x[src]                  — select rows by edge endpoint
//   scatter  Σ_{e: dst(e)=i} m_e     — sum edge messages per node
//   segment softmax over the edges sharing a destination
//
// Burn has no scatter op, but `select_assign` sums the assigned
// rows into the destination, which is exactly scatter-add.

use burn::{prelude::*, tensor::activation::relu};

/// Sum the rows of `src` into `num_nodes` buckets given by `index`.
/// `src` is `[edges, width]`, `index` is `[edges]`; output `[num_nodes, width]`.
pub fn scatter_sum<B: Backend>(
    src:       Tensor<B, 2>,
    index:     Tensor<B, 1, Int>,
    num_nodes: usize,
) -> Tensor<B, 2> {
    let [_, width] = src.dims();
    Tensor::zeros([num_nodes, width], &src.device()).select_assign(0, index, src)
}

/// Number of edges pointing at each node, as a `[num_nodes, 1]` column.
pub fn in_degree<B: Backend>(index: Tensor<B, 1, Int>, num_nodes: usize) -> Tensor<B, 2> {
    let [edges] = index.dims();
    let ones = Tensor::ones([edges, 1], &index.device());
    scatter_sum(ones, index, num_nodes)
}

/// Softmax of `logits` (`[edges, heads]`) over the edges that share a
/// destination. Each segment is shifted by its own maximum, so every
/// destination with at least one edge gets weights summing to 1.
pub fn segment_softmax<B: Backend>(
    logits:    Tensor<B, 2>,
    index:     Tensor<B, 1, Int>,
    num_nodes: usize,
) -> Tensor<B, 2> {
    let shift = segment_max(logits.clone(), index.clone(), num_nodes).select(0, index.clone());
    let exp   = (logits - shift).exp();
    let denom = scatter_sum(exp.clone(), index.clone(), num_nodes).select(0, index);
    exp / denom.add_scalar(1e-16)
}

/// Per-destination, per-column maximum of `values`; `[num_nodes, width]`.
/// Destinations without edges get 0. Computed on the host: Burn has no
/// scatter-max.
fn segment_max<B: Backend>(
    values:    Tensor<B, 2>,
    index:     Tensor<B, 1, Int>,
    num_nodes: usize,
) -> Tensor<B, 2> {
    let [_, width] = values.dims();
    let device = values.device();

    let dst: Vec<i64>  = index.into_data().convert::<i64>().iter::<i64>().collect();
    let rows: Vec<f32> = values.into_data().convert::<f32>().iter::<f32>().collect();

    let mut max = vec![f32::NEG_INFINITY; num_nodes * width];
    for (&node, row) in dst.iter().zip(rows.chunks(width.max(1))) {
        let base = node as usize * width;
        for (slot, &v) in max[base..base + width].iter_mut().zip(row) {
            *slot = slot.max(v);
        }
    }
    for v in max.iter_mut().filter(|v| v.is_infinite()) {
        *v = 0.0;
    }

    Tensor::<B, 1>::from_floats(max.as_slice(), &device).reshape([num_nodes, width])
}

/// `max(x, 0) + slope * min(x, 0)`
pub fn leaky_relu<B: Backend, const D: usize>(x: Tensor<B, D>, slope: f64) -> Tensor<B, D> {
    relu(x.clone()) - relu(x.neg()).mul_scalar(slope)
}
