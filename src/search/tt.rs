//! Lock-free, replace-by-depth transposition table (`spec.md` §3 "TTEntry"
//! / §4.8). Three entries share a cache-line-sized bucket; every field is
//! its own atomic, written with `Ordering::Relaxed` and no bucket lock —
//! a torn read just degrades to a signature mismatch and a missed probe,
//! which is the tradeoff the spec calls out as acceptable.

use crate::board::Piece;
use crate::moves::types::{
    CAPTURE, EN_PASSANT, KINGSIDE_CASTLE, Move, PROMOTION, QUEENSIDE_CASTLE,
};
use crate::square::Square;
use std::sync::atomic::{AtomicI16, AtomicU8, AtomicU16, AtomicU32, Ordering};

pub const MATE_THRESHOLD: i32 = 30000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    Exact = 0,
    LowerBound = 1, // beta cutoff / fail-high
    UpperBound = 2, // fail-low
    Empty = 3,
}

impl NodeType {
    fn from_u8(v: u8) -> Self {
        match v & 0b11 {
            0 => NodeType::Exact,
            1 => NodeType::LowerBound,
            2 => NodeType::UpperBound,
            _ => NodeType::Empty,
        }
    }
}

/// Packs a `Move` into 32 bits: `from(6) to(6) piece(3) promo(3) flags(4)
/// spare(10)`. Wide enough that the hash move can be replayed without
/// consulting the board, unlike a bare 16-bit (from, to) pair.
#[inline]
fn pack_move(mv: Move) -> u32 {
    let promo = match mv.promotion {
        None => 0u32,
        Some(Piece::Knight) => 1,
        Some(Piece::Bishop) => 2,
        Some(Piece::Rook) => 3,
        Some(Piece::Queen) => 4,
        Some(Piece::Pawn) | Some(Piece::King) => 0,
    };
    (mv.from.index() as u32)
        | ((mv.to.index() as u32) << 6)
        | ((mv.piece as u32) << 12)
        | (promo << 15)
        | ((mv.flags as u32) << 18)
}

#[inline]
fn unpack_move(bits: u32) -> Option<Move> {
    if bits == 0 {
        return None;
    }
    let from = Square::from_index((bits & 0x3f) as u8);
    let to = Square::from_index(((bits >> 6) & 0x3f) as u8);
    let piece = Piece::from_u8(((bits >> 12) & 0x7) as u8);
    let promo = match (bits >> 15) & 0x7 {
        1 => Some(Piece::Knight),
        2 => Some(Piece::Bishop),
        3 => Some(Piece::Rook),
        4 => Some(Piece::Queen),
        _ => None,
    };
    let flags = ((bits >> 18) & 0xf) as u8;
    Some(Move {
        from,
        to,
        piece,
        promotion: promo,
        flags,
    })
}

/// Signature is the top 16 bits of the Zobrist key; the bucket index is
/// derived from a disjoint low range, so signature and index never
/// collide on the same bits (`spec.md` §4.8).
#[inline]
fn signature(key: u64) -> u16 {
    (key >> 48) as u16
}

struct TTSlot {
    key_sig: AtomicU16,
    mv: AtomicU32,
    score: AtomicI16,
    eval: AtomicI16,
    depth: AtomicU8,
    /// bits 0-1 = NodeType, bits 2-7 = generation.
    meta: AtomicU8,
}

impl TTSlot {
    fn empty() -> Self {
        Self {
            key_sig: AtomicU16::new(0),
            mv: AtomicU32::new(0),
            score: AtomicI16::new(0),
            eval: AtomicI16::new(0),
            depth: AtomicU8::new(0),
            meta: AtomicU8::new(NodeType::Empty as u8),
        }
    }

    fn generation(&self) -> u8 {
        self.meta.load(Ordering::Relaxed) >> 2
    }

    fn bound(&self) -> NodeType {
        NodeType::from_u8(self.meta.load(Ordering::Relaxed))
    }
}

/// Three slots plus padding so each bucket occupies a full cache line,
/// matching `spec.md`'s "32-byte aligned" `TTBucket" in spirit (widened
/// to whole atomic words per field rather than hand-packed bytes; see
/// DESIGN.md).
#[repr(align(64))]
struct TTBucket {
    slots: [TTSlot; 3],
}

impl TTBucket {
    fn empty() -> Self {
        Self {
            slots: [TTSlot::empty(), TTSlot::empty(), TTSlot::empty()],
        }
    }
}

pub struct TranspositionTable {
    buckets: Vec<TTBucket>,
    mask: usize,
    generation: AtomicU8,
}

/// `TTEntry` as handed back to callers: the fields a probe cares about,
/// already mate-distance-reversed (`spec.md` §4.8 "On probe").
#[derive(Clone, Copy, Debug)]
pub struct TTEntry {
    pub best_move: Option<Move>,
    pub score: i32,
    pub static_eval: i32,
    pub depth: u8,
    pub bound: NodeType,
}

impl TranspositionTable {
    pub fn new(size_mb: usize) -> Self {
        let bucket_size = std::mem::size_of::<TTBucket>().max(1);
        let requested = (size_mb.max(1) * 1024 * 1024) / bucket_size;
        let mut capacity = 1usize;
        while capacity * 2 <= requested.max(1) {
            capacity *= 2;
        }
        let mut buckets = Vec::with_capacity(capacity);
        buckets.resize_with(capacity, TTBucket::empty);
        Self {
            buckets,
            mask: capacity - 1,
            generation: AtomicU8::new(0),
        }
    }

    #[inline]
    fn bucket_index(&self, key: u64) -> usize {
        (key as usize) & self.mask
    }

    pub fn new_search(&mut self) {
        self.bump_generation();
    }

    /// `&self` form of `new_search`, for the multi-threaded driver where
    /// the table is shared behind an `Arc` and no thread holds `&mut`
    /// access (`spec.md` §4.10): every thread's `SearchSharedState` calls
    /// this once per `go` before workers start probing/storing.
    pub fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            *bucket = TTBucket::empty();
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Fraction of buckets with at least one non-empty slot, in permille,
    /// for the UCI `hashfull` info field.
    pub fn hashfull(&self) -> usize {
        let sample = self.buckets.len().min(1000).max(1);
        let mut used = 0usize;
        for bucket in self.buckets.iter().take(sample) {
            if bucket
                .slots
                .iter()
                .any(|s| s.bound() != NodeType::Empty)
            {
                used += 1;
            }
        }
        used * 1000 / sample
    }

    /// §4.8 step 1: adjusts a search-relative score to an absolute,
    /// storable one (mate scores biased by distance-from-root).
    pub fn score_to_tt(score: i32, ply: i32) -> i32 {
        if score >= MATE_THRESHOLD {
            score + ply
        } else if score <= -MATE_THRESHOLD {
            score - ply
        } else {
            score
        }
    }

    /// Reverses `score_to_tt` on probe.
    pub fn score_from_tt(score: i32, ply: i32) -> i32 {
        if score >= MATE_THRESHOLD {
            score - ply
        } else if score <= -MATE_THRESHOLD {
            score + ply
        } else {
            score
        }
    }

    pub fn save(
        &self,
        key: u64,
        mv: Option<Move>,
        score: i32,
        static_eval: i32,
        depth: u8,
        bound: NodeType,
        ply: i32,
    ) {
        let sig = signature(key);
        let generation = self.generation.load(Ordering::Relaxed);
        let bucket = &self.buckets[self.bucket_index(key)];

        // §4.8 step 2: pick the replacement slot, preferring a same-key
        // or empty slot, else the one minimizing depth - 4*generation-age.
        let mut replace_idx = 0usize;
        let mut replace_quality = i32::MAX;
        let mut found_match = false;
        for (i, slot) in bucket.slots.iter().enumerate() {
            let slot_sig = slot.key_sig.load(Ordering::Relaxed);
            if slot_sig == sig && slot_sig != 0 {
                replace_idx = i;
                found_match = true;
                break;
            }
            if slot.bound() == NodeType::Empty {
                replace_idx = i;
                found_match = true;
                break;
            }
            let age = generation.wrapping_sub(slot.generation()) as i32;
            let quality = slot.depth.load(Ordering::Relaxed) as i32 - 4 * age;
            if quality < replace_quality {
                replace_quality = quality;
                replace_idx = i;
            }
        }
        let _ = found_match;

        let slot = &bucket.slots[replace_idx];
        let stored_score = Self::score_to_tt(score, ply).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        let stored_eval = static_eval.clamp(i16::MIN as i32, i16::MAX as i32) as i16;

        // Preserve the existing move if this store carries none (e.g. an
        // all-node fail-low that still wants to refresh depth/bound).
        let existing_mv = slot.mv.load(Ordering::Relaxed);
        let mv_bits = mv.map(pack_move).unwrap_or(existing_mv);

        slot.key_sig.store(sig, Ordering::Relaxed);
        slot.mv.store(mv_bits, Ordering::Relaxed);
        slot.score.store(stored_score, Ordering::Relaxed);
        slot.eval.store(stored_eval, Ordering::Relaxed);
        slot.depth.store(depth, Ordering::Relaxed);
        slot.meta
            .store((bound as u8) | (generation << 2), Ordering::Relaxed);
    }

    pub fn probe(&self, key: u64, ply: i32) -> Option<TTEntry> {
        let sig = signature(key);
        let bucket = &self.buckets[self.bucket_index(key)];
        for slot in bucket.slots.iter() {
            if slot.key_sig.load(Ordering::Relaxed) == sig && slot.bound() != NodeType::Empty {
                // refresh generation so useful entries survive ageing
                let cur_gen = self.generation.load(Ordering::Relaxed);
                slot.meta
                    .store((slot.bound() as u8) | (cur_gen << 2), Ordering::Relaxed);

                let raw_score = slot.score.load(Ordering::Relaxed) as i32;
                return Some(TTEntry {
                    best_move: unpack_move(slot.mv.load(Ordering::Relaxed)),
                    score: Self::score_from_tt(raw_score, ply),
                    static_eval: slot.eval.load(Ordering::Relaxed) as i32,
                    depth: slot.depth.load(Ordering::Relaxed),
                    bound: slot.bound(),
                });
            }
        }
        None
    }

    /// `spec.md` §4.8 `CheckEntry`: true iff a matching entry exists whose
    /// stored depth meets `depth`.
    pub fn check_entry(&self, key: u64, depth: u8) -> bool {
        let sig = signature(key);
        let bucket = &self.buckets[self.bucket_index(key)];
        bucket.slots.iter().any(|s| {
            s.key_sig.load(Ordering::Relaxed) == sig
                && s.bound() != NodeType::Empty
                && s.depth.load(Ordering::Relaxed) >= depth
        })
    }
}

// Flags referenced only to keep `pack_move`'s contract obvious in
// review; the actual validation happens in the move picker's
// pseudo-legality check once the reconstructed move is offered back.
#[allow(dead_code)]
const _FLAG_REFERENCE: [u8; 4] = [CAPTURE, EN_PASSANT, KINGSIDE_CASTLE, QUEENSIDE_CASTLE];
#[allow(dead_code)]
const _PROMOTION_REFERENCE: u8 = PROMOTION;
