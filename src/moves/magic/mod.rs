//! Magic bitboard tables for sliding-piece (rook/bishop/queen) attack lookup.

pub mod attacks;
pub mod loader;
pub mod precompute;
pub mod search;
pub mod structs;

pub use structs::MagicTables;

/// Knight attacks via the shared const lookup table, exposed alongside the
/// magic tables since callers that already hold a `MagicTables` reference
/// often want every piece's attack set from one module path.
#[inline(always)]
pub fn get_knight_attacks(square: usize) -> u64 {
    crate::moves::knight::KNIGHT_ATTACKS[square]
}

/// King attacks via the shared const lookup table.
#[inline(always)]
pub fn get_king_attacks(square: usize) -> u64 {
    crate::moves::king::KING_ATTACKS[square]
}
