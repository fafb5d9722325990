// ============================================================
// Layer 5 — Hier2Hier Model
// ============================================================
// The tree-to-sequence architecture, in three stages:
//
//   NodeEncoder         — embeds each node's tag and runs a
//                         character-level GRU over its content
//                         symbols (attributes folded in), then
//                         projects to propagated_info_len.
//   HierarchyPropagator — a stack of propagation hops. Each
//                         hop gathers transformed parent info
//                         and fanout-averaged child info
//                         through the selector arrays and
//                         overlays both onto the node state
//                         with gated (GRU-style) cells. This
//                         is how information crosses the XML
//                         connectivity graph instead of
//                         flowing only along a sequence.
//   OutputDecoder       — a GRU cell with dot-product
//                         attention over the propagated node
//                         states, producing the serialized
//                         output token stream.
//
// Reference: Burn Book §3 (Building Blocks)
//            Cho et al. (2014) GRU
//            Bahdanau et al. (2015) attention

use anyhow::Result;
use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

use crate::data::batcher::TreeBatch;
use crate::domain::xml_tree::PAD_ID;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct Hier2HierConfig {
    pub input_vocab_size:       usize,
    pub output_vocab_size:      usize,
    /// Width of a content symbol embedding.
    pub symbol_vec_len:         usize,
    /// Hidden width of the per-node content GRU.
    pub node_text_vec_len:      usize,
    /// Width of node information while being propagated.
    pub propagated_info_len:    usize,
    /// Number of propagation hops across the tree.
    pub propagator_stack_depth: usize,
    /// Width of the output decoder GRU cell.
    pub decoder_state_width:    usize,
    /// Hard cap on greedy decoding length.
    pub max_output_len:         usize,
    pub input_dropout_p:        f64,
    pub dropout_p:              f64,
}

impl Hier2HierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Hier2HierModel<B> {
        Hier2HierModel {
            encoder: TreeEncoder {
                node_encoder: NodeEncoder {
                    tag_embedding: EmbeddingConfig::new(
                        self.input_vocab_size, self.propagated_info_len,
                    ).init(device),
                    symbol_embedding: EmbeddingConfig::new(
                        self.input_vocab_size, self.symbol_vec_len,
                    ).init(device),
                    text_gru: GruCellConfig::new(
                        self.symbol_vec_len, self.node_text_vec_len,
                    ).init(device),
                    project: LinearConfig::new(
                        self.propagated_info_len + self.node_text_vec_len,
                        self.propagated_info_len,
                    ).init(device),
                },
                propagator: HierarchyPropagator {
                    transform_parent: LinearConfig::new(
                        self.propagated_info_len, self.propagated_info_len,
                    ).init(device),
                    transform_children: LinearConfig::new(
                        self.propagated_info_len, self.propagated_info_len,
                    ).init(device),
                    overlay_parent: GruCellConfig::new(
                        self.propagated_info_len, self.propagated_info_len,
                    ).init(device),
                    overlay_children: GruCellConfig::new(
                        self.propagated_info_len, self.propagated_info_len,
                    ).init(device),
                    input_dropout: DropoutConfig::new(self.input_dropout_p).init(),
                    dropout:       DropoutConfig::new(self.dropout_p).init(),
                    stack_depth:   self.propagator_stack_depth,
                },
            },
            decoder: OutputDecoder {
                token_embedding: EmbeddingConfig::new(
                    self.output_vocab_size, self.decoder_state_width,
                ).init(device),
                attn_query: LinearConfig::new(
                    self.decoder_state_width, self.propagated_info_len,
                ).init(device),
                init_state: LinearConfig::new(
                    self.propagated_info_len, self.decoder_state_width,
                ).init(device),
                cell: GruCellConfig::new(
                    self.decoder_state_width + self.propagated_info_len,
                    self.decoder_state_width,
                ).init(device),
                head: LinearConfig::new(
                    self.decoder_state_width, self.output_vocab_size,
                ).init(device),
                max_output_len: self.max_output_len,
            },
        }
    }
}

// ─── GruCell ──────────────────────────────────────────────────────────────────
// A single-step gated recurrent cell. burn ships a sequence-level
// Gru but the propagator and decoder both need one explicit step
// at a time, so the cell is built from its gate linearities.

#[derive(Config, Debug)]
pub struct GruCellConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl GruCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        let joined = self.d_input + self.d_hidden;
        GruCell {
            update_gate: LinearConfig::new(joined, self.d_hidden).init(device),
            reset_gate:  LinearConfig::new(joined, self.d_hidden).init(device),
            candidate:   LinearConfig::new(joined, self.d_hidden).init(device),
            d_hidden:    self.d_hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    pub update_gate: Linear<B>,
    pub reset_gate:  Linear<B>,
    pub candidate:   Linear<B>,
    pub d_hidden:    usize,
}

impl<B: Backend> GruCell<B> {
    /// One gated update: input and state share all leading
    /// dimensions, the last dimension is the feature axis.
    pub fn forward<const D: usize>(
        &self,
        input: Tensor<B, D>,
        state: Tensor<B, D>,
    ) -> Tensor<B, D> {
        let joined = Tensor::cat(vec![input.clone(), state.clone()], D - 1);
        let update = activation::sigmoid(self.update_gate.forward(joined.clone()));
        let reset  = activation::sigmoid(self.reset_gate.forward(joined));

        let gated     = Tensor::cat(vec![input, state.clone() * reset], D - 1);
        let candidate = activation::tanh(self.candidate.forward(gated));

        state * (update.clone().neg().add_scalar(1.0)) + candidate * update
    }
}

// ─── NodeEncoder ──────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct NodeEncoder<B: Backend> {
    pub tag_embedding:    Embedding<B>,
    pub symbol_embedding: Embedding<B>,
    pub text_gru:         GruCell<B>,
    pub project:          Linear<B>,
}

impl<B: Backend> NodeEncoder<B> {
    /// tag_ids: [batch, nodes], content_ids/mask: [batch, nodes, symbols]
    /// → node info: [batch, nodes, propagated_info_len]
    pub fn forward(
        &self,
        tag_ids:      Tensor<B, 2, Int>,
        content_ids:  Tensor<B, 3, Int>,
        content_mask: Tensor<B, 3>,
    ) -> Tensor<B, 3> {
        let [batch, nodes, symbols] = content_ids.dims();

        let tag_info = self.tag_embedding.forward(tag_ids);

        // Run the content GRU over every node at once by folding
        // nodes into the batch dimension.
        let flat_ids  = content_ids.reshape([batch * nodes, symbols]);
        let flat_mask = content_mask.reshape([batch * nodes, symbols]);
        let embedded  = self.symbol_embedding.forward(flat_ids);
        let sym_len   = embedded.dims()[2];

        let mut state = Tensor::<B, 2>::zeros(
            [batch * nodes, self.text_gru.d_hidden],
            &embedded.device(),
        );
        for step in 0..symbols {
            let symbol = embedded
                .clone()
                .slice([0..batch * nodes, step..step + 1, 0..sym_len])
                .squeeze::<2>(1);
            let mask = flat_mask
                .clone()
                .slice([0..batch * nodes, step..step + 1]);
            let next = self.text_gru.forward(symbol, state.clone());
            // Padded symbol positions keep the old state.
            state = next * mask.clone() + state * (mask.neg().add_scalar(1.0));
        }

        let text_len  = state.dims()[1];
        let text_info = state.reshape([batch, nodes, text_len]);
        activation::tanh(self.project.forward(Tensor::cat(vec![tag_info, text_info], 2)))
    }
}

// ─── HierarchyPropagator ──────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct HierarchyPropagator<B: Backend> {
    pub transform_parent:   Linear<B>,
    pub transform_children: Linear<B>,
    pub overlay_parent:     GruCell<B>,
    pub overlay_children:   GruCell<B>,
    pub input_dropout:      Dropout,
    pub dropout:            Dropout,
    pub stack_depth:        usize,
}

impl<B: Backend> HierarchyPropagator<B> {
    /// Propagate node information across the connectivity graph.
    /// Every hop moves information one edge further, so after
    /// `stack_depth` hops a node has heard from ancestors and
    /// descendants that many levels away.
    pub fn forward(
        &self,
        node_info:  Tensor<B, 3>,
        parent_idx: Tensor<B, 2, Int>,
        child_idx:  Tensor<B, 3, Int>,
        child_mask: Tensor<B, 3>,
        fanout:     Tensor<B, 2>,
        node_mask:  Tensor<B, 2>,
    ) -> Tensor<B, 3> {
        let [batch, nodes, _info] = node_info.dims();
        let max_fanout = child_idx.dims()[2];

        let mut info = self.input_dropout.forward(node_info);

        // Averaging factor and child-presence gate are loop
        // invariants.
        let denom = fanout.clone().clamp_min(1.0).unsqueeze_dim::<3>(2);
        let has_children = fanout.greater_elem(0.0).float().unsqueeze_dim::<3>(2);

        for _ in 0..self.stack_depth {
            // Parent info, transformed then overlaid via GRU.
            let parent_info = self.transform_parent.forward(
                gather_nodes(info.clone(), parent_idx.clone()),
            );

            // Children info: transformed, masked, summed over
            // fanout slots, then normalized by child count.
            let mut children_sum = info.zeros_like();
            for slot in 0..max_fanout {
                let idx = child_idx
                    .clone()
                    .slice([0..batch, 0..nodes, slot..slot + 1])
                    .squeeze::<2>(2);
                let mask = child_mask.clone().slice([0..batch, 0..nodes, slot..slot + 1]);
                let child_info = self.transform_children.forward(
                    gather_nodes(info.clone(), idx),
                );
                children_sum = children_sum + child_info * mask;
            }
            let children_mean = children_sum / denom.clone();

            info = self.overlay_parent.forward(parent_info, info);

            // Nodes without children keep their state on the
            // child overlay.
            let updated = self.overlay_children.forward(children_mean, info.clone());
            info = updated * has_children.clone()
                + info * (has_children.clone().neg().add_scalar(1.0));

            info = self.dropout.forward(info);
        }

        info * node_mask.unsqueeze_dim::<3>(2)
    }
}

/// Gather node rows through a selector: out[b, i, :] = x[b, idx[b, i], :]
fn gather_nodes<B: Backend>(x: Tensor<B, 3>, idx: Tensor<B, 2, Int>) -> Tensor<B, 3> {
    let [batch, nodes, info] = x.dims();
    let index = idx.unsqueeze_dim::<3>(2).expand([batch, nodes, info]);
    x.gather(1, index)
}

// ─── TreeEncoder ──────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct TreeEncoder<B: Backend> {
    pub node_encoder: NodeEncoder<B>,
    pub propagator:   HierarchyPropagator<B>,
}

impl<B: Backend> TreeEncoder<B> {
    /// Encode a batch of trees into propagated node states.
    pub fn forward(&self, batch: &TreeBatch<B>) -> Tensor<B, 3> {
        let node_info = self.node_encoder.forward(
            batch.tag_ids.clone(),
            batch.content_ids.clone(),
            batch.content_mask.clone(),
        );
        self.propagator.forward(
            node_info,
            batch.parent_idx.clone(),
            batch.child_idx.clone(),
            batch.child_mask.clone(),
            batch.fanout.clone(),
            batch.node_mask.clone(),
        )
    }
}

// ─── OutputDecoder ────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct OutputDecoder<B: Backend> {
    pub token_embedding: Embedding<B>,
    pub attn_query:      Linear<B>,
    pub init_state:      Linear<B>,
    pub cell:            GruCell<B>,
    pub head:            Linear<B>,
    pub max_output_len:  usize,
}

impl<B: Backend> OutputDecoder<B> {
    /// Initial decoder state: masked mean of the node states.
    fn initial_state(&self, node_states: Tensor<B, 3>, node_mask: Tensor<B, 2>) -> Tensor<B, 2> {
        let mask3  = node_mask.clone().unsqueeze_dim::<3>(2);
        let summed = (node_states * mask3).sum_dim(1).squeeze::<2>(1);
        let count  = node_mask.sum_dim(1).clamp_min(1.0);
        activation::tanh(self.init_state.forward(summed / count))
    }

    /// Dot-product attention over node states.
    fn attend(
        &self,
        node_states: Tensor<B, 3>,
        node_mask:   Tensor<B, 2>,
        state:       Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let query  = self.attn_query.forward(state).unsqueeze_dim::<3>(2);
        let scores = node_states.clone().matmul(query).squeeze::<2>(2);
        // Padded nodes get a large negative score so softmax
        // sends their weight to zero.
        let scores = scores - (node_mask.neg().add_scalar(1.0)) * 1.0e9;
        let weights = activation::softmax(scores, 1);
        (node_states * weights.unsqueeze_dim::<3>(2))
            .sum_dim(1)
            .squeeze::<2>(1)
    }

    /// One decoder step. `tokens` is [batch, 1].
    fn step(
        &self,
        node_states: &Tensor<B, 3>,
        node_mask:   &Tensor<B, 2>,
        tokens:      Tensor<B, 2, Int>,
        state:       Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let embedded = self.token_embedding.forward(tokens).squeeze::<2>(1);
        let context  = self.attend(node_states.clone(), node_mask.clone(), state.clone());
        let state    = self.cell.forward(Tensor::cat(vec![embedded, context], 1), state);
        let logits   = self.head.forward(state.clone());
        (logits, state)
    }

    /// Teacher-forced unroll: feed the ground-truth token at
    /// every step. decoder_input: [batch, steps] starting with
    /// SOS. Returns logits [batch, steps, vocab].
    pub fn forward_teacher(
        &self,
        node_states: Tensor<B, 3>,
        node_mask:   Tensor<B, 2>,
        decoder_input: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let [batch, steps] = decoder_input.dims();
        let mut state  = self.initial_state(node_states.clone(), node_mask.clone());
        let mut logits = Vec::with_capacity(steps);

        for step in 0..steps {
            let tokens = decoder_input.clone().slice([0..batch, step..step + 1]);
            let (step_logits, next_state) =
                self.step(&node_states, &node_mask, tokens, state);
            state = next_state;
            logits.push(step_logits);
        }

        Tensor::stack(logits, 1)
    }

    /// Free-running unroll: feed back the argmax of each step.
    /// Used for the non-teacher-forced half of training.
    pub fn forward_free(
        &self,
        node_states: Tensor<B, 3>,
        node_mask:   Tensor<B, 2>,
        sos_id:      u32,
        steps:       usize,
    ) -> Tensor<B, 3> {
        let batch  = node_mask.dims()[0];
        let device = node_mask.device();
        let mut state  = self.initial_state(node_states.clone(), node_mask.clone());
        let mut tokens = Tensor::<B, 2, Int>::full([batch, 1], sos_id as i32, &device);
        let mut logits = Vec::with_capacity(steps);

        for _ in 0..steps {
            let (step_logits, next_state) =
                self.step(&node_states, &node_mask, tokens, state);
            state  = next_state;
            tokens = step_logits.clone().argmax(1);
            logits.push(step_logits);
        }

        Tensor::stack(logits, 1)
    }

    /// Greedy decoding for inference: emit argmax tokens until
    /// every sequence is past EOS or max_output_len is reached.
    /// Returns per-sample token ids, truncated at EOS
    /// (exclusive).
    pub fn decode_greedy(
        &self,
        node_states: Tensor<B, 3>,
        node_mask:   Tensor<B, 2>,
        sos_id:      u32,
        eos_id:      u32,
    ) -> Result<Vec<Vec<u32>>> {
        let batch  = node_mask.dims()[0];
        let device = node_mask.device();
        let mut state  = self.initial_state(node_states.clone(), node_mask.clone());
        let mut tokens = Tensor::<B, 2, Int>::full([batch, 1], sos_id as i32, &device);
        let mut emitted: Vec<Tensor<B, 2, Int>> = Vec::new();

        for _ in 0..self.max_output_len {
            let (step_logits, next_state) =
                self.step(&node_states, &node_mask, tokens, state);
            state  = next_state;
            tokens = step_logits.argmax(1);
            emitted.push(tokens.clone());
        }

        // Pull everything back to the host in one transfer.
        let all: Vec<i32> = Tensor::cat(emitted, 1)
            .into_data()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read decoded tokens back from device: {e:?}"))?;
        let steps = all.len() / batch.max(1);

        Ok((0..batch)
            .map(|row| {
                all[row * steps..(row + 1) * steps]
                    .iter()
                    .map(|&id| id as u32)
                    .take_while(|&id| id != eos_id)
                    .collect()
            })
            .collect())
    }
}

// ─── Hier2HierModel ───────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct Hier2HierModel<B: Backend> {
    pub encoder: TreeEncoder<B>,
    pub decoder: OutputDecoder<B>,
}

impl<B: Backend> Hier2HierModel<B> {
    /// Full forward pass over a batch, teacher-forced or
    /// free-running. Returns logits [batch, steps, vocab]
    /// aligned with batch.target_out.
    pub fn forward_logits(&self, batch: &TreeBatch<B>, teacher_forcing: bool, sos_id: u32) -> Tensor<B, 3> {
        let node_states = self.encoder.forward(batch);
        if teacher_forcing {
            self.decoder.forward_teacher(
                node_states,
                batch.node_mask.clone(),
                batch.decoder_input.clone(),
            )
        } else {
            let steps = batch.decoder_input.dims()[1];
            self.decoder.forward_free(
                node_states,
                batch.node_mask.clone(),
                sos_id,
                steps,
            )
        }
    }

    /// Greedy inference over a batch of encoded inputs.
    pub fn predict(&self, batch: &TreeBatch<B>, sos_id: u32, eos_id: u32) -> Result<Vec<Vec<u32>>> {
        let node_states = self.encoder.forward(batch);
        self.decoder.decode_greedy(node_states, batch.node_mask.clone(), sos_id, eos_id)
    }
}

/// Cross-entropy over every non-PAD target position.
/// logits: [batch, steps, vocab], targets: [batch, steps].
pub fn sequence_loss<B: Backend>(
    logits:  Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
) -> Tensor<B, 1> {
    let [batch, steps, vocab] = logits.dims();
    let flat_logits  = logits.reshape([batch * steps, vocab]);
    let flat_targets = targets.reshape([batch * steps]);
    burn::nn::loss::CrossEntropyLossConfig::new()
        .with_pad_tokens(Some(vec![PAD_ID as usize]))
        .init(&flat_logits.device())
        .forward(flat_logits, flat_targets)
}
