// ============================================================
// Layer 5 — Graph Convolutions
// ============================================================
// One message-passing operator per model family. All of them
// map node states [nodes, hidden] to [nodes, hidden] given one
// relation whose edge features were already embedded to
// [edges, hidden].
//
//   GinConv  h_i' = MLP( h_i + Σ_j relu(h_j + W e_ij) )
//
//   GatConv  per head k:
//              a_ij = softmax_j( leaky_relu(
//                       s_k·Wh_j + d_k·Wh_i + r_k·W_e e_ij ) )
//              h_i' = ‖_k Σ_j a_ij (Wh_j + W_e e_ij)
//
//   PnaConv  m_ij = W_pre [h_i, h_j, e_ij]
//            aggregators: mean, std, sum
//            scalers:     identity, amplification, attenuation
//                         (log(deg+1)/δ and δ/log(deg+1))
//            h_i' = W_lin W_post [h_i, scaled aggregates]
//
// GnnConv holds exactly one of them, picked by ModelFamily.

use anyhow::{bail, ensure, Result};
use burn::{
    module::Param,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, Distribution},
};

use crate::data::batcher::RelationInput;
use crate::domain::family::ModelFamily;
use crate::ml::message::{in_degree, leaky_relu, scatter_sum, segment_softmax};

// ─── GIN ──────────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct GinConv<B: Backend> {
    edge_lin: Linear<B>,
    mlp_in:   Linear<B>,
    mlp_out:  Linear<B>,
}

impl<B: Backend> GinConv<B> {
    pub fn new(hidden: usize, device: &B::Device) -> Self {
        Self {
            edge_lin: LinearConfig::new(hidden, hidden).init(device),
            mlp_in:   LinearConfig::new(hidden, hidden).init(device),
            mlp_out:  LinearConfig::new(hidden, hidden).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>, rel: &RelationInput<B>) -> Tensor<B, 2> {
        let [num_nodes, _] = x.dims();
        let msg = relu(
            x.clone().select(0, rel.src.clone()) + self.edge_lin.forward(rel.edge_attr.clone()),
        );
        let agg = scatter_sum(msg, rel.dst.clone(), num_nodes);
        self.mlp_out.forward(relu(self.mlp_in.forward(x + agg)))
    }
}

// ─── GAT ──────────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct GatConv<B: Backend> {
    lin:      Linear<B>,
    lin_edge: Linear<B>,
    att_src:  Param<Tensor<B, 2>>,
    att_dst:  Param<Tensor<B, 2>>,
    att_edge: Param<Tensor<B, 2>>,
    bias:     Param<Tensor<B, 1>>,
    heads:    usize,
    head_dim: usize,
}

impl<B: Backend> GatConv<B> {
    /// `hidden` must be divisible by `heads`; heads are concatenated.
    pub fn new(hidden: usize, heads: usize, device: &B::Device) -> Result<Self> {
        ensure!(heads > 0, "gat needs at least one attention head");
        ensure!(
            hidden % heads == 0,
            "n_hidden ({hidden}) must be divisible by n_heads ({heads})"
        );
        let head_dim = hidden / heads;
        let bound    = (6.0 / (heads + head_dim) as f64).sqrt();
        let att = || {
            Param::from_tensor(Tensor::random(
                [heads, head_dim],
                Distribution::Uniform(-bound, bound),
                device,
            ))
        };

        Ok(Self {
            lin:      LinearConfig::new(hidden, hidden).with_bias(false).init(device),
            lin_edge: LinearConfig::new(hidden, hidden).with_bias(false).init(device),
            att_src:  att(),
            att_dst:  att(),
            att_edge: att(),
            bias:     Param::from_tensor(Tensor::zeros([hidden], device)),
            heads,
            head_dim,
        })
    }

    pub fn forward(&self, x: Tensor<B, 2>, rel: &RelationInput<B>) -> Tensor<B, 2> {
        let [num_nodes, _] = x.dims();
        let [num_edges]    = rel.src.dims();
        let (heads, dim)   = (self.heads, self.head_dim);

        let h  = self.lin.forward(x).reshape([num_nodes, heads, dim]);
        let he = self.lin_edge.forward(rel.edge_attr.clone()).reshape([num_edges, heads, dim]);

        let s_src  = head_scores(h.clone(), self.att_src.val());
        let s_dst  = head_scores(h.clone(), self.att_dst.val());
        let s_edge = head_scores(he.clone(), self.att_edge.val());

        let logits = leaky_relu(
            s_src.select(0, rel.src.clone()) + s_dst.select(0, rel.dst.clone()) + s_edge,
            0.2,
        );
        let alpha = segment_softmax(logits, rel.dst.clone(), num_nodes)
            .reshape([num_edges, heads, 1]);

        let msg = (h.select(0, rel.src.clone()) + he) * alpha;
        let out = scatter_sum(msg.reshape([num_edges, heads * dim]), rel.dst.clone(), num_nodes);
        out + self.bias.val().unsqueeze::<2>()
    }
}

/// Per-head dot product of `[n, heads, dim]` states with `[heads, dim]` weights.
fn head_scores<B: Backend>(states: Tensor<B, 3>, att: Tensor<B, 2>) -> Tensor<B, 2> {
    let [n, heads, _] = states.dims();
    (states * att.unsqueeze::<3>()).sum_dim(2).reshape([n, heads])
}

// ─── PNA ──────────────────────────────────────────────────────────────────────

const PNA_AGGREGATORS: usize = 3;
const PNA_SCALERS: usize = 3;

#[derive(Module, Debug)]
pub struct PnaConv<B: Backend> {
    pre:  Linear<B>,
    post: Linear<B>,
    lin:  Linear<B>,
    avg_log_degree: f64,
}

impl<B: Backend> PnaConv<B> {
    pub fn new(hidden: usize, avg_log_degree: f64, device: &B::Device) -> Self {
        let post_in = hidden + hidden * PNA_AGGREGATORS * PNA_SCALERS;
        Self {
            pre:  LinearConfig::new(3 * hidden, hidden).init(device),
            post: LinearConfig::new(post_in, hidden).init(device),
            lin:  LinearConfig::new(hidden, hidden).init(device),
            avg_log_degree: avg_log_degree.max(1e-6),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>, rel: &RelationInput<B>) -> Tensor<B, 2> {
        let [num_nodes, _] = x.dims();
        let (src, dst) = (rel.src.clone(), rel.dst.clone());

        let msg = self.pre.forward(Tensor::cat(
            vec![
                x.clone().select(0, dst.clone()),
                x.clone().select(0, src),
                rel.edge_attr.clone(),
            ],
            1,
        ));

        let degree  = in_degree(dst.clone(), num_nodes).clamp_min(1.0);
        let sum     = scatter_sum(msg.clone(), dst.clone(), num_nodes);
        let mean    = sum.clone() / degree.clone();
        let mean_sq = scatter_sum(msg.powf_scalar(2.0), dst, num_nodes) / degree.clone();
        let std     = (mean_sq - mean.clone().powf_scalar(2.0))
            .clamp_min(0.0)
            .add_scalar(1e-5)
            .sqrt();
        let aggr = Tensor::cat(vec![mean, std, sum], 1);

        let log_deg     = degree.add_scalar(1.0).log();
        let amplified   = aggr.clone() * log_deg.clone().div_scalar(self.avg_log_degree);
        let attenuated  = aggr.clone() * log_deg.recip().mul_scalar(self.avg_log_degree);

        let out = self.post.forward(Tensor::cat(vec![x, aggr, amplified, attenuated], 1));
        self.lin.forward(out)
    }
}

// ─── GnnConv ──────────────────────────────────────────────────────────────────

/// The convolution of one relation in one layer. Exactly one field is set.
#[derive(Module, Debug)]
pub struct GnnConv<B: Backend> {
    gin: Option<GinConv<B>>,
    gat: Option<GatConv<B>>,
    pna: Option<PnaConv<B>>,
}

impl<B: Backend> GnnConv<B> {
    pub fn new(
        family:         ModelFamily,
        hidden:         usize,
        heads:          Option<usize>,
        avg_log_degree: f64,
        device:         &B::Device,
    ) -> Result<Self> {
        let conv = match family {
            ModelFamily::Gin => Self { gin: Some(GinConv::new(hidden, device)), gat: None, pna: None },
            ModelFamily::Gat => {
                let Some(heads) = heads else {
                    bail!("model family 'gat' requires n_heads");
                };
                Self { gin: None, gat: Some(GatConv::new(hidden, heads, device)?), pna: None }
            }
            ModelFamily::Pna => Self {
                gin: None,
                gat: None,
                pna: Some(PnaConv::new(hidden, avg_log_degree, device)),
            },
        };
        Ok(conv)
    }

    pub fn forward(&self, x: Tensor<B, 2>, rel: &RelationInput<B>) -> Tensor<B, 2> {
        match (&self.gin, &self.gat, &self.pna) {
            (Some(conv), _, _) => conv.forward(x, rel),
            (_, Some(conv), _) => conv.forward(x, rel),
            (_, _, Some(conv)) => conv.forward(x, rel),
            // Unreachable through `new`; an empty conv passes states through.
            (None, None, None) => x,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestBackend;

    fn relation(hidden: usize) -> (Tensor<TestBackend, 2>, RelationInput<TestBackend>) {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::random([4, hidden], Distribution::Default, &device);
        let rel = RelationInput {
            src: Tensor::from_ints([0, 1, 2, 3, 0], &device),
            dst: Tensor::from_ints([1, 2, 3, 0, 2], &device),
            edge_attr: Tensor::random([5, hidden], Distribution::Default, &device),
        };
        (x, rel)
    }

    #[test]
    fn test_every_family_keeps_node_shape() {
        let device = Default::default();
        for family in [ModelFamily::Gin, ModelFamily::Gat, ModelFamily::Pna] {
            let conv = GnnConv::<TestBackend>::new(family, 8, Some(2), 1.2, &device).unwrap();
            let (x, rel) = relation(8);
            assert_eq!(conv.forward(x, &rel).dims(), [4, 8], "family {family}");
        }
    }

    #[test]
    fn test_gat_requires_heads() {
        let err = GnnConv::<TestBackend>::new(ModelFamily::Gat, 8, None, 1.0, &Default::default())
            .unwrap_err();
        assert!(err.to_string().contains("n_heads"));
    }

    #[test]
    fn test_gat_rejects_indivisible_hidden() {
        assert!(GatConv::<TestBackend>::new(10, 4, &Default::default()).is_err());
    }

    #[test]
    fn test_pna_handles_isolated_nodes() {
        let device = Default::default();
        let conv = PnaConv::<TestBackend>::new(4, 1.0, &device);
        let x = Tensor::<TestBackend, 2>::ones([3, 4], &device);
        // Node 2 receives nothing
        let rel = RelationInput {
            src: Tensor::from_ints([0], &device),
            dst: Tensor::from_ints([1], &device),
            edge_attr: Tensor::ones([1, 4], &device),
        };
        let out: Vec<f32> = conv.forward(x, &rel).into_data().to_vec::<f32>().unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
    }
}
