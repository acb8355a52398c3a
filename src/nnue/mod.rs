//! NNUE evaluator: incremental accumulator + clipped-ReLU feed-forward,
//! per `spec.md` §4.6. Weight-file loading is external glue (`spec.md`
//! §1, §6); this module owns the in-memory network shape, the
//! incremental update hooked into `Board::set_bb`, and the forward pass.

pub mod accumulator;
pub mod network;

pub use accumulator::{NnueAccumulator, feature_index, forward};
pub use network::{EVAL_MAX, EVAL_MIN, NnueNetwork, active_network, default_network, set_network_from_path};
