// ============================================================
// Layer 4 — Tree Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<TreeSample>
// into GPU-ready tensors.
//
// Unlike a flat-sequence batcher, tree samples differ in three
// dimensions at once: node count, fanout, and per-node content
// length. The batcher pads every sample up to the batch maxima
// and carries float masks alongside so the model can ignore
// the padding:
//
//   tag_ids       [batch, nodes]            Int
//   content_ids   [batch, nodes, symbols]   Int
//   content_mask  [batch, nodes, symbols]   Float (1=real)
//   parent_idx    [batch, nodes]            Int
//   child_idx     [batch, nodes, fanout]    Int
//   child_mask    [batch, nodes, fanout]    Float
//   fanout        [batch, nodes]            Float
//   node_mask     [batch, nodes]            Float
//   decoder_input [batch, steps]            Int (SOS..., shifted)
//   target_out    [batch, steps]            Int (..., EOS)
//
// Padded node rows select themselves as parent, so every
// gather stays in bounds without branching.
//
// Reference: Burn Book §4 (Batcher)

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;

use crate::data::dataset::TreeSample;
use crate::domain::xml_tree::PAD_ID;

/// A batch of tree samples ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct TreeBatch<B: Backend> {
    pub tag_ids:       Tensor<B, 2, Int>,
    pub content_ids:   Tensor<B, 3, Int>,
    pub content_mask:  Tensor<B, 3>,
    pub parent_idx:    Tensor<B, 2, Int>,
    pub child_idx:     Tensor<B, 3, Int>,
    pub child_mask:    Tensor<B, 3>,
    pub fanout:        Tensor<B, 2>,
    pub node_mask:     Tensor<B, 2>,
    pub decoder_input: Tensor<B, 2, Int>,
    pub target_out:    Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct TreeBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TreeBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TreeSample, TreeBatch<B>> for TreeBatcher<B> {
    fn batch(&self, items: Vec<TreeSample>) -> TreeBatch<B> {
        let batch_size = items.len();

        // Batch maxima. Fanout/content are clamped to 1 so the
        // padded dimensions never collapse to zero width.
        let n = items.iter().map(TreeSample::node_count).max().unwrap_or(1).max(1);
        let f = items.iter().map(TreeSample::max_fanout).max().unwrap_or(0).max(1);
        let t = items.iter().map(TreeSample::max_content_len).max().unwrap_or(0).max(1);
        let l = items.iter().map(|s| s.target_ids.len()).max().unwrap_or(2).saturating_sub(1).max(1);

        let mut tag_flat     = Vec::with_capacity(batch_size * n);
        let mut content_flat = Vec::with_capacity(batch_size * n * t);
        let mut cmask_flat   = Vec::with_capacity(batch_size * n * t);
        let mut parent_flat  = Vec::with_capacity(batch_size * n);
        let mut child_flat   = Vec::with_capacity(batch_size * n * f);
        let mut chmask_flat  = Vec::with_capacity(batch_size * n * f);
        let mut fanout_flat  = Vec::with_capacity(batch_size * n);
        let mut nmask_flat   = Vec::with_capacity(batch_size * n);
        let mut dec_in_flat  = Vec::with_capacity(batch_size * l);
        let mut tgt_flat     = Vec::with_capacity(batch_size * l);

        for sample in &items {
            let count = sample.node_count();
            for node in 0..n {
                if node < count {
                    tag_flat.push(sample.tag_ids[node] as i32);
                    parent_flat.push(sample.parent[node] as i32);
                    fanout_flat.push(sample.children[node].len() as f32);
                    nmask_flat.push(1.0f32);

                    for slot in 0..t {
                        match sample.content_ids[node].get(slot) {
                            Some(&id) => {
                                content_flat.push(id as i32);
                                cmask_flat.push(1.0);
                            }
                            None => {
                                content_flat.push(PAD_ID as i32);
                                cmask_flat.push(0.0);
                            }
                        }
                    }
                    for slot in 0..f {
                        match sample.children[node].get(slot) {
                            Some(&child) => {
                                child_flat.push(child as i32);
                                chmask_flat.push(1.0);
                            }
                            None => {
                                child_flat.push(0);
                                chmask_flat.push(0.0);
                            }
                        }
                    }
                } else {
                    // Padded node: self-loop parent, empty content.
                    tag_flat.push(PAD_ID as i32);
                    parent_flat.push(node as i32);
                    fanout_flat.push(0.0);
                    nmask_flat.push(0.0);
                    content_flat.extend(std::iter::repeat(PAD_ID as i32).take(t));
                    cmask_flat.extend(std::iter::repeat(0.0f32).take(t));
                    child_flat.extend(std::iter::repeat(0i32).take(f));
                    chmask_flat.extend(std::iter::repeat(0.0f32).take(f));
                }
            }

            // Shifted decoder teacher sequence:
            //   input  = target[..len-1]  (starts with SOS)
            //   output = target[1..]      (ends with EOS)
            let steps = sample.target_ids.len().saturating_sub(1);
            for step in 0..l {
                if step < steps {
                    dec_in_flat.push(sample.target_ids[step] as i32);
                    tgt_flat.push(sample.target_ids[step + 1] as i32);
                } else {
                    dec_in_flat.push(PAD_ID as i32);
                    tgt_flat.push(PAD_ID as i32);
                }
            }
        }

        let device = &self.device;
        TreeBatch {
            tag_ids: Tensor::<B, 1, Int>::from_ints(tag_flat.as_slice(), device)
                .reshape([batch_size, n]),
            content_ids: Tensor::<B, 1, Int>::from_ints(content_flat.as_slice(), device)
                .reshape([batch_size, n, t]),
            content_mask: Tensor::<B, 1>::from_floats(cmask_flat.as_slice(), device)
                .reshape([batch_size, n, t]),
            parent_idx: Tensor::<B, 1, Int>::from_ints(parent_flat.as_slice(), device)
                .reshape([batch_size, n]),
            child_idx: Tensor::<B, 1, Int>::from_ints(child_flat.as_slice(), device)
                .reshape([batch_size, n, f]),
            child_mask: Tensor::<B, 1>::from_floats(chmask_flat.as_slice(), device)
                .reshape([batch_size, n, f]),
            fanout: Tensor::<B, 1>::from_floats(fanout_flat.as_slice(), device)
                .reshape([batch_size, n]),
            node_mask: Tensor::<B, 1>::from_floats(nmask_flat.as_slice(), device)
                .reshape([batch_size, n]),
            decoder_input: Tensor::<B, 1, Int>::from_ints(dec_in_flat.as_slice(), device)
                .reshape([batch_size, l]),
            target_out: Tensor::<B, 1, Int>::from_ints(tgt_flat.as_slice(), device)
                .reshape([batch_size, l]),
        }
    }
}
