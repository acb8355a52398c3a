//! Random keys used to hash a position into the Polyglot opening-book
//! lookup scheme (distinct from this engine's own Zobrist keys in
//! `hash::zobrist`, which cover its own search/TT needs).
//!
//! The real Polyglot format ships a fixed, publicly documented 781-entry
//! random table so any two compliant tools hash the same position to the
//! same key. We don't have that table memorized byte-for-byte, and making
//! one up and presenting it as "the" Polyglot table would silently corrupt
//! interop with real `.bin` books produced by other tools. Instead this is
//! a deterministically generated placeholder (splitmix64, same technique
//! `hash::zobrist` uses for its `deterministic_zobrist` feature) so the
//! hash is at least internally stable across runs. See DESIGN.md for the
//! compatibility note.
//!
//! Layout (matching the Polyglot spec so `polyglot_hash.rs`'s indexing is
//! correct even though the *values* are a placeholder):
//! - `[0..768)`:   piece keys, indexed `64 * piece_kind + square`
//! - `[768..772)`: castling rights, King/Queen for White then Black
//! - `[772..780)`: en passant file, a..h
//! - `[780]`:      side to move

const fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

const fn generate_randoms() -> [u64; 781] {
    let mut table = [0u64; 781];
    let mut state = 0xD1B5_4A32_D192_ED03u64;
    let mut i = 0;
    while i < 781 {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        table[i] = splitmix64(state);
        i += 1;
    }
    table
}

pub const POLYGLOT_RANDOMS: [u64; 781] = generate_randoms();
