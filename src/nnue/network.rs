//! NNUE network weights: feature transformer + stacked feed-forward layers.
//!
//! Layout mirrors `spec.md` §4.6 / §6: a dense little-endian sequence of
//! 16-bit quantized weights, feature transformer first, then L1->L2,
//! L2->L3, L3->output, biases interleaved per layer. Loading the file from
//! a `EvalFile` path is external glue (out of scope per `spec.md` §1); this
//! module only owns the in-memory shape and the forward pass.

use std::io::{self, Read};
use std::sync::{Arc, OnceLock, RwLock};

pub const FEATURES: usize = 768; // 12 pieces * 64 squares, perspective-relative
pub const L1: usize = 256;
pub const L2: usize = 32;
pub const L3: usize = 32;

/// Clipped-ReLU ceiling in the fixed-point domain used by the feature
/// transformer output (matches common NNUE quantization conventions).
pub const QA: i32 = 255;
pub const QB: i32 = 64;
pub const SCALE: i32 = 400;

/// Clamp bounds so an impossible NNUE score can never pollute the TT.
pub const EVAL_MIN: i32 = -30000;
pub const EVAL_MAX: i32 = 30000;

#[derive(Clone)]
pub struct NnueNetwork {
    /// [feature][L1], column-major add/sub during incremental updates.
    pub ft_weights: Vec<i16>,
    pub ft_bias: Vec<i16>,
    /// Concatenated perspective pair (2*L1) -> L2.
    pub l1_weights: Vec<i16>,
    pub l1_bias: Vec<i16>,
    pub l2_weights: Vec<i16>,
    pub l2_bias: Vec<i16>,
    pub l3_weights: Vec<i16>,
    pub l3_bias: i16,
}

impl NnueNetwork {
    fn feature_count() -> usize {
        FEATURES * L1
    }

    /// Builds a structurally valid but untrained network: deterministic,
    /// small-magnitude pseudo-random weights. Stands in for `EvalFile`/
    /// `embedded_nnue` until a real trained network ships; see DESIGN.md.
    fn placeholder() -> Self {
        use rand::{RngCore, SeedableRng, rngs::StdRng};
        let mut rng = StdRng::seed_from_u64(0x4E4E_5545_5F30_2E31); // "NNUE_0.1"

        let mut next_small = |rng: &mut StdRng, scale: i32| -> i16 {
            let raw = (rng.next_u32() % (2 * scale as u32 + 1)) as i32 - scale;
            raw as i16
        };

        let ft_weights = (0..Self::feature_count())
            .map(|_| next_small(&mut rng, 8))
            .collect();
        let ft_bias = (0..L1).map(|_| next_small(&mut rng, 4)).collect();
        let l1_weights = (0..(2 * L1 * L2)).map(|_| next_small(&mut rng, 6)).collect();
        let l1_bias = (0..L2).map(|_| next_small(&mut rng, 4)).collect();
        let l2_weights = (0..(L2 * L3)).map(|_| next_small(&mut rng, 6)).collect();
        let l2_bias = (0..L3).map(|_| next_small(&mut rng, 4)).collect();
        let l3_weights = (0..L3).map(|_| next_small(&mut rng, 6)).collect();
        let l3_bias = next_small(&mut rng, 4);

        Self {
            ft_weights,
            ft_bias,
            l1_weights,
            l1_bias,
            l2_weights,
            l2_bias,
            l3_weights,
            l3_bias,
        }
    }

    /// Parses the dense little-endian i16 layout described in `spec.md` §6.
    pub fn from_reader<R: Read>(mut r: R) -> io::Result<Self> {
        let mut read_i16_vec = |n: usize, r: &mut R| -> io::Result<Vec<i16>> {
            let mut buf = vec![0u8; n * 2];
            r.read_exact(&mut buf)?;
            Ok(buf.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect())
        };

        let ft_weights = read_i16_vec(Self::feature_count(), &mut r)?;
        let ft_bias = read_i16_vec(L1, &mut r)?;
        let l1_weights = read_i16_vec(2 * L1 * L2, &mut r)?;
        let l1_bias = read_i16_vec(L2, &mut r)?;
        let l2_weights = read_i16_vec(L2 * L3, &mut r)?;
        let l2_bias = read_i16_vec(L3, &mut r)?;
        let l3_weights = read_i16_vec(L3, &mut r)?;
        let l3_bias = read_i16_vec(1, &mut r)?[0];

        Ok(Self {
            ft_weights,
            ft_bias,
            l1_weights,
            l1_bias,
            l2_weights,
            l2_bias,
            l3_weights,
            l3_bias,
        })
    }

    /// Loads a network from a file path (the `EvalFile` UCI option's target).
    pub fn from_path(path: &str) -> io::Result<Self> {
        let f = std::fs::File::open(path)?;
        Self::from_reader(io::BufReader::new(f))
    }
}

static DEFAULT_NETWORK: OnceLock<NnueNetwork> = OnceLock::new();

/// The network used when no `EvalFile` has been set. Under `embedded_nnue`
/// this is where a real shipped network would be decoded from
/// `include_bytes!`; lacking trained weights in this pack, a deterministic
/// placeholder of the right shape is substituted (see DESIGN.md).
pub fn default_network() -> &'static NnueNetwork {
    DEFAULT_NETWORK.get_or_init(NnueNetwork::placeholder)
}

static ACTIVE_NETWORK: OnceLock<RwLock<Arc<NnueNetwork>>> = OnceLock::new();

fn active_lock() -> &'static RwLock<Arc<NnueNetwork>> {
    ACTIVE_NETWORK.get_or_init(|| RwLock::new(Arc::new(default_network().clone())))
}

/// The network driving evaluation right now: the `EvalFile` network if
/// `setoption name EvalFile` loaded one successfully, otherwise the
/// embedded placeholder. Cloning the `Arc` is cheap and lock-free for
/// readers once loaded.
pub fn active_network() -> Arc<NnueNetwork> {
    active_lock().read().expect("nnue network lock poisoned").clone()
}

/// Implements the `EvalFile` UCI option: load a network from disk and make
/// it the active one. On failure the previously active network (or the
/// embedded placeholder) remains in effect, per `spec.md` §7's
/// parse-failure policy (diagnose, never abort).
pub fn set_network_from_path(path: &str) -> io::Result<()> {
    let net = NnueNetwork::from_path(path)?;
    *active_lock().write().expect("nnue network lock poisoned") = Arc::new(net);
    Ok(())
}

#[inline(always)]
pub fn clipped_relu(x: i32) -> i32 {
    x.clamp(0, QA)
}
