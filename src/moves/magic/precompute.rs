//! Builds magic bitboard tables from scratch: one rook and one bishop
//! `MagicEntry` per square. Reuses `attacks.rs`'s scan-ray generators as the
//! ground truth for "what does this piece actually attack" and
//! `search.rs`'s random-sparse-number search to find a collision-free magic
//! multiplier for each square's relevant blocker mask.

use crate::moves::magic::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use crate::moves::magic::search::find_magic_number_for_square;
use crate::moves::magic::structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
use rand::{RngCore, SeedableRng, rngs::StdRng};

/// Seeds the magic-number search.
pub enum MagicTableSeed {
    /// Deterministic seed, for reproducible tests and the `deterministic_magic` feature.
    Fixed(u64),
    /// Seeded from OS entropy via the thread-local RNG.
    Random,
}

fn make_rng(seed: &MagicTableSeed) -> StdRng {
    match seed {
        MagicTableSeed::Fixed(s) => StdRng::seed_from_u64(*s),
        MagicTableSeed::Random => {
            let mut bytes = [0u8; 32];
            rand::rng().fill_bytes(&mut bytes);
            StdRng::from_seed(bytes)
        }
    }
}

/// Enumerates every subset of `mask`'s set bits via the Carry-Rippler trick.
fn enumerate_blocker_subsets(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1usize << mask.count_ones());
    let mut subset = 0u64;
    loop {
        subsets.push(subset);
        if subset == mask {
            break;
        }
        subset = subset.wrapping_sub(mask) & mask;
    }
    subsets
}

fn build_entry<R: RngCore>(
    square: usize,
    scan: fn(usize, u64) -> u64,
    rng: &mut R,
) -> Result<MagicEntry, String> {
    // The relevant occupancy mask is just every square this piece could ever
    // attack to on an empty board; a blocker anywhere else can't change the
    // attack set since the ray already terminates at the board edge there.
    let mask = scan(square, 0);
    let blockers = enumerate_blocker_subsets(mask);
    let attacks: Vec<u64> = blockers.iter().map(|&b| scan(square, b)).collect();
    let shift = 64 - mask.count_ones();

    let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)?;

    let mut table = vec![0u64; 1usize << mask.count_ones()];
    for (&b, &a) in blockers.iter().zip(attacks.iter()) {
        let index = (b.wrapping_mul(magic) >> shift) as usize;
        table[index] = a;
    }

    Ok(MagicEntry {
        magic,
        shift,
        mask,
        table: table.into_boxed_slice(),
    })
}

/// Generates fresh rook and bishop magic tables for all 64 squares.
pub fn generate_magic_tables(seed: MagicTableSeed) -> Result<MagicTables, String> {
    let mut rng = make_rng(&seed);

    let mut rook_entries = Vec::with_capacity(64);
    for square in 0..64 {
        rook_entries.push(build_entry(square, rook_attacks_per_square, &mut rng)?);
    }

    let mut bishop_entries = Vec::with_capacity(64);
    for square in 0..64 {
        bishop_entries.push(build_entry(square, bishop_attacks_per_square, &mut rng)?);
    }

    Ok(MagicTables {
        rook: RookMagicTables { entries: rook_entries },
        bishop: BishopMagicTables { entries: bishop_entries },
    })
}
