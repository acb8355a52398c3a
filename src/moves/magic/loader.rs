//! Entry point for obtaining a ready-to-use `MagicTables`.

use super::precompute::{MagicTableSeed, generate_magic_tables};
use super::structs::MagicTables;

#[cfg(feature = "deterministic_magic")]
const DETERMINISTIC_SEED: u64 = 0x5EED_5EED_5EED_5EED;

/// Builds the magic bitboard tables used by sliding-piece move generation.
///
/// Regenerates from scratch on every call (search takes well under a second
/// even at debug optimization levels); callers load this once at startup
/// and pass the result around by reference for the lifetime of the engine.
pub fn load_magic_tables() -> MagicTables {
    generate_magic_tables(magic_seed()).expect("failed to generate magic bitboard tables")
}

#[cfg(feature = "deterministic_magic")]
fn magic_seed() -> MagicTableSeed {
    MagicTableSeed::Fixed(DETERMINISTIC_SEED)
}

#[cfg(not(feature = "deterministic_magic"))]
fn magic_seed() -> MagicTableSeed {
    MagicTableSeed::Random
}
