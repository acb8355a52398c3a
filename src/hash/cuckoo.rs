//! Cuckoo-hash table for detecting an "upcoming" repetition inside a single
//! search line before it's actually reached on the board (van Kervinck's
//! technique, `spec.md` §4.9 draw detection). Every reversible, non-pawn
//! move has a unique slot across two candidate hash tables; a hit means
//! some earlier position in the current reversible-move window, reached by
//! exactly one more reversible move, repeats the position now on the board.
//!
//! Grounded on the original engine's `Cuckoo` table: same `H1`/`H2` hash
//! split, same displacement-insertion loop, same 3668-entry invariant.

use crate::board::{Board, Color, Piece};
use crate::hash::zobrist::zobrist_keys;
use crate::square::Square;
use once_cell::sync::OnceCell;

const TABLE_SIZE: usize = 8192;

#[inline]
fn h1(key: u64) -> usize {
    ((key >> 32) & 0x1fff) as usize
}

#[inline]
fn h2(key: u64) -> usize {
    ((key >> 48) & 0x1fff) as usize
}

/// A reversible move encoded as (color, piece, from, to), used to answer
/// "does the board already look like it did some moves ago, modulo
/// exactly one reversible move?".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CuckooMove {
    pub color: Color,
    pub piece: Piece,
    pub from: Square,
    pub to: Square,
}

pub struct CuckooTable {
    keys: [u64; TABLE_SIZE],
    moves: [Option<CuckooMove>; TABLE_SIZE],
}

fn reaches(piece: Piece, from: Square, to: Square, tables: &crate::moves::magic::MagicTables) -> bool {
    use crate::moves::king::KING_ATTACKS;
    use crate::moves::knight::KNIGHT_ATTACKS;
    let from_idx = from.index() as usize;
    let to_bb = 1u64 << to.index();
    match piece {
        Piece::Knight => KNIGHT_ATTACKS[from_idx] & to_bb != 0,
        Piece::King => KING_ATTACKS[from_idx] & to_bb != 0,
        Piece::Bishop => tables.bishop.get_attacks(from_idx, 0) & to_bb != 0,
        Piece::Rook => tables.rook.get_attacks(from_idx, 0) & to_bb != 0,
        Piece::Queen => tables.queen_attacks(from_idx, 0) & to_bb != 0,
        Piece::Pawn => false,
    }
}

impl CuckooTable {
    fn build() -> Self {
        let tables = crate::moves::magic::loader::load_magic_tables();
        let keys_table = zobrist_keys();
        let mut keys = [0u64; TABLE_SIZE];
        let mut moves: [Option<CuckooMove>; TABLE_SIZE] = [None; TABLE_SIZE];
        let mut count = 0usize;

        for &color in &[Color::White, Color::Black] {
            for &piece in &[
                Piece::Knight,
                Piece::Bishop,
                Piece::Rook,
                Piece::Queen,
                Piece::King,
            ] {
                for sq1 in 0u8..64 {
                    for sq2 in (sq1 + 1)..64 {
                        let from = Square::from_index(sq1);
                        let to = Square::from_index(sq2);
                        if !reaches(piece, from, to, &tables) {
                            continue;
                        }

                        let ci = color as usize;
                        let pi = piece as usize;
                        let mut key = keys_table.piece[ci][pi][sq1 as usize]
                            ^ keys_table.piece[ci][pi][sq2 as usize]
                            ^ keys_table.side_to_move;
                        let mut mv = Some(CuckooMove {
                            color,
                            piece,
                            from,
                            to,
                        });

                        let mut idx = h1(key);
                        loop {
                            std::mem::swap(&mut keys[idx], &mut key);
                            std::mem::swap(&mut moves[idx], &mut mv);
                            if mv.is_none() {
                                break;
                            }
                            idx = if idx == h1(key) { h2(key) } else { h1(key) };
                        }
                        count += 1;
                    }
                }
            }
        }
        debug_assert_eq!(
            count, 3668,
            "cuckoo table must hold exactly 3668 reversible moves"
        );

        Self { keys, moves }
    }

    /// Looks up `key` in both candidate slots; returns the reversible move
    /// stored there if present, so the caller can check it's legal from
    /// the current board before trusting the repetition.
    pub fn probe(&self, key: u64) -> Option<CuckooMove> {
        if self.keys[h1(key)] == key {
            return self.moves[h1(key)];
        }
        if self.keys[h2(key)] == key {
            return self.moves[h2(key)];
        }
        None
    }
}

static TABLE: OnceCell<CuckooTable> = OnceCell::new();

fn table() -> &'static CuckooTable {
    TABLE.get_or_init(CuckooTable::build)
}

/// True if some position within the current reversible-move window differs
/// from the one on the board now by a single reversible move that is still
/// legally playable - i.e. a three-fold repetition is unavoidable one move
/// from now, even though it hasn't actually occurred a third time yet.
/// `spec.md` §4.9: feeds draw detection so the search doesn't have to wait
/// for an actual third occurrence before scoring a line as a draw.
pub fn has_upcoming_repetition(board: &Board) -> bool {
    let occ = board.occupied();

    for &older in board.history.iter() {
        // `board.zobrist ^ older` already carries exactly one
        // `side_to_move` flip whenever `older` is an odd number of plies
        // back (every intervening flip but one cancels in pairs), which is
        // exactly the parity a single intervening reversible move has. The
        // cuckoo table's keys are built the same way (see `build` above),
        // so no extra XOR is needed here - adding one would cancel that
        // flip and the probe would never hit.
        let diff = board.zobrist ^ older;
        if let Some(mv) = table().probe(diff) {
            if mv.color != board.side_to_move {
                continue;
            }
            let from_bb = 1u64 << mv.from.index();
            let to_bb = 1u64 << mv.to.index();
            let piece_bb = board.piece_bb[mv.color as usize][mv.piece as usize];

            // The move's own inverse is itself, so it's playable right now
            // iff the piece sits on exactly one of the two squares and the
            // other is empty.
            let on_from = piece_bb & from_bb != 0 && occ & to_bb == 0;
            let on_to = piece_bb & to_bb != 0 && occ & from_bb == 0;
            if on_from || on_to {
                return true;
            }
        }
    }
    false
}
