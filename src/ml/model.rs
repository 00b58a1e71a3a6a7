use anyhow::{ensure, Result};
use burn::{
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::{GraphBatch, RelationInput};
use crate::domain::{family::ModelFamily, graph::GraphMetadata};
use crate::infra::config::HyperParams;
use crate::ml::conv::GnnConv;

const HEAD_HIDDEN: [usize; 2] = [50, 25];
const NUM_CLASSES: usize = 2;

#[derive(Config, Debug)]
pub struct EdgeClassifierConfig {
    pub family:         ModelFamily,
    pub node_in:        usize,
    pub edge_in:        usize,
    pub n_hidden:       usize,
    pub n_gnn_layers:   usize,
    pub dropout:        f64,
    pub final_dropout:  f64,
    pub n_heads:        Option<usize>,
    #[config(default = true)]
    pub edge_updates:   bool,
    #[config(default = 1.0)]
    pub avg_log_degree: f64,
}

/// The parts of a model that decide the shape of its parameters.
/// Stored in checkpoints and compared before restoring weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArchitecture {
    pub family:       ModelFamily,
    pub node_in:      usize,
    pub edge_in:      usize,
    pub n_hidden:     usize,
    pub n_gnn_layers: usize,
    pub n_heads:      Option<usize>,
    pub edge_updates: bool,
    pub relations:    usize,
}

impl EdgeClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<EdgeClassifier<B>> {
        ensure!(self.n_hidden > 0, "n_hidden must be positive");
        let heads = if self.family.uses_heads() { self.n_heads } else { None };

        let layers = (0..self.n_gnn_layers)
            .map(|_| self.build_layer(heads, device))
            .collect::<Result<Vec<_>>>()?;

        Ok(EdgeClassifier {
            node_emb: LinearConfig::new(self.node_in, self.n_hidden).init(device),
            edge_emb: LinearConfig::new(self.edge_in, self.n_hidden).init(device),
            layers,
            head:     self.build_head(device),
            dropout:  DropoutConfig::new(self.dropout).init(),
        })
    }

    pub fn architecture(&self, relations: usize) -> ModelArchitecture {
        ModelArchitecture {
            family:       self.family,
            node_in:      self.node_in,
            edge_in:      self.edge_in,
            n_hidden:     self.n_hidden,
            n_gnn_layers: self.n_gnn_layers,
            n_heads:      if self.family.uses_heads() { self.n_heads } else { None },
            edge_updates: self.edge_updates,
            relations,
        }
    }

    fn build_layer<B: Backend>(
        &self,
        heads:  Option<usize>,
        device: &B::Device,
    ) -> Result<MessageLayer<B>> {
        let conv = GnnConv::new(self.family, self.n_hidden, heads, self.avg_log_degree, device)?;
        let edge_mlps = if self.edge_updates {
            vec![EdgeMlp {
                lin_in:  LinearConfig::new(3 * self.n_hidden, self.n_hidden).init(device),
                lin_out: LinearConfig::new(self.n_hidden, self.n_hidden).init(device),
            }]
        } else {
            Vec::new()
        };
        Ok(MessageLayer {
            convs: vec![conv],
            norm:  LayerNormConfig::new(self.n_hidden).init(device),
            edge_mlps,
        })
    }

    fn build_head<B: Backend>(&self, device: &B::Device) -> EdgeHead<B> {
        let [h1, h2] = HEAD_HIDDEN;
        EdgeHead {
            lin1:    LinearConfig::new(3 * self.n_hidden, h1).init(device),
            lin2:    LinearConfig::new(h1, h2).init(device),
            lin3:    LinearConfig::new(h2, NUM_CLASSES).init(device),
            dropout: DropoutConfig::new(self.final_dropout).init(),
        }
    }
}

/// Size a model from a sample batch and the run's hyper-parameters.
pub fn build_model<B: Backend>(
    sample:         &GraphBatch<B>,
    family:         ModelFamily,
    hyper:          &HyperParams,
    edge_updates:   bool,
    avg_log_degree: f64,
    device:         &B::Device,
) -> Result<(EdgeClassifier<B>, EdgeClassifierConfig)> {
    let config = EdgeClassifierConfig::new(
        family,
        sample.node_dim(),
        sample.edge_dim(),
        hyper.n_hidden,
        hyper.n_gnn_layers,
        hyper.dropout,
        hyper.final_dropout,
    )
    .with_n_heads(hyper.n_heads)
    .with_edge_updates(edge_updates)
    .with_avg_log_degree(avg_log_degree);

    let model = config.init(device)?;
    tracing::info!(
        "Model ready: {} with {} layers, n_hidden={}, node_in={}, edge_in={}",
        family,
        config.n_gnn_layers,
        config.n_hidden,
        config.node_in,
        config.edge_in
    );
    Ok((model, config))
}

// ─── Modules ──────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EdgeMlp<B: Backend> {
    lin_in:  Linear<B>,
    lin_out: Linear<B>,
}

impl<B: Backend> EdgeMlp<B> {
    fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.lin_out.forward(relu(self.lin_in.forward(x)))
    }
}

/// One round of message passing. `convs` and `edge_mlps` hold one
/// entry per relation; the node norm is shared because there is a
/// single node type.
#[derive(Module, Debug)]
pub struct MessageLayer<B: Backend> {
    convs:     Vec<GnnConv<B>>,
    norm:      LayerNorm<B>,
    edge_mlps: Vec<EdgeMlp<B>>,
}

#[derive(Module, Debug)]
pub struct EdgeHead<B: Backend> {
    lin1:    Linear<B>,
    lin2:    Linear<B>,
    lin3:    Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> EdgeHead<B> {
    fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.dropout.forward(relu(self.lin1.forward(x)));
        let x = self.dropout.forward(relu(self.lin2.forward(x)));
        self.lin3.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct EdgeClassifier<B: Backend> {
    node_emb: Linear<B>,
    edge_emb: Linear<B>,
    layers:   Vec<MessageLayer<B>>,
    head:     EdgeHead<B>,
    dropout:  Dropout,
}

impl<B: Backend> EdgeClassifier<B> {
    /// Number of relations each layer expects.
    pub fn relation_count(&self) -> usize {
        self.layers.first().map_or(1, |l| l.convs.len())
    }

    /// Replicate every per-relation module once per relation of `metadata`.
    /// Relation outputs are averaged in `forward`.
    pub fn to_hetero(mut self, metadata: &GraphMetadata) -> Self {
        let relations = metadata.relations.len();
        for layer in self.layers.iter_mut() {
            if let Some(conv) = layer.convs.first().cloned() {
                layer.convs = vec![conv; relations];
            }
            if let Some(mlp) = layer.edge_mlps.first().cloned() {
                layer.edge_mlps = vec![mlp; relations];
            }
        }
        tracing::debug!(
            "Converted model to {} relations: {:?}",
            relations,
            metadata.relations.iter().map(|r| r.name()).collect::<Vec<_>>()
        );
        self
    }

    /// Logits `[seeds, 2]` for the seed edges of `relations[0]`.
    ///
    /// `relations` carries raw edge features; `seed_positions` indexes
    /// the rows of the first relation that are being classified.
    pub fn forward(
        &self,
        x:              Tensor<B, 2>,
        relations:      &[RelationInput<B>],
        seed_positions: Tensor<B, 1, Int>,
    ) -> Result<Tensor<B, 2>> {
        ensure!(
            relations.len() == self.relation_count(),
            "model expects {} relation(s) but the batch provides {}",
            self.relation_count(),
            relations.len()
        );

        let mut x = self.node_emb.forward(x);
        let mut edges: Vec<RelationInput<B>> = relations
            .iter()
            .map(|r| RelationInput {
                src:       r.src.clone(),
                dst:       r.dst.clone(),
                edge_attr: self.edge_emb.forward(r.edge_attr.clone()),
            })
            .collect();
        let k = edges.len() as f64;

        for layer in &self.layers {
            let combined = layer
                .convs
                .iter()
                .zip(&edges)
                .map(|(conv, rel)| conv.forward(x.clone(), rel))
                .reduce(|a, b| a + b)
                .map(|sum| sum.div_scalar(k))
                .unwrap_or_else(|| x.clone());

            x = (x.clone() + relu(layer.norm.forward(combined))).div_scalar(2.0);
            x = self.dropout.forward(x);

            for (mlp, rel) in layer.edge_mlps.iter().zip(edges.iter_mut()) {
                let joined = Tensor::cat(
                    vec![
                        x.clone().select(0, rel.src.clone()),
                        x.clone().select(0, rel.dst.clone()),
                        rel.edge_attr.clone(),
                    ],
                    1,
                );
                rel.edge_attr = rel.edge_attr.clone() + mlp.forward(joined).div_scalar(2.0);
            }
        }

        let primary  = &edges[0];
        let seed_src = primary.src.clone().select(0, seed_positions.clone());
        let seed_dst = primary.dst.clone().select(0, seed_positions.clone());
        let features = Tensor::cat(
            vec![
                x.clone().select(0, seed_src),
                x.select(0, seed_dst),
                primary.edge_attr.clone().select(0, seed_positions),
            ],
            1,
        );
        Ok(self.head.forward(features))
    }
}
