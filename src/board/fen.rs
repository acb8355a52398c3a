//! FEN (Forsyth-Edwards Notation) parsing and serialization.

use super::fen_tables::{CHAR_TO_PC, PC_TO_CHAR};
use super::{
    Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, Piece, RIGHT_BK, RIGHT_BQ, RIGHT_WK,
    RIGHT_WQ,
};
use crate::bitboard::{RANK_1, RANK_8};
use crate::square::Square;

/// Resolves a standard `K`/`Q`/`k`/`q` castling glyph to the rook it
/// refers to: the outermost rook on that side's back rank (`original
/// implementation's BoardState.cpp FEN reader picks the msb rook for `K`/
/// `k`, the lsb rook for `Q`/`q`). Returns the rook's file, or `None` if
/// no rook sits on the back rank at all (a malformed but non-fatal FEN).
fn standard_rook_file(board: &Board, color: Color, kingside: bool) -> Option<u8> {
    let rank_mask = match color {
        Color::White => RANK_1,
        Color::Black => RANK_8,
    };
    let rooks = board.bb(color, Piece::Rook) & rank_mask;
    if rooks == 0 {
        return None;
    }
    let sq = if kingside {
        63 - rooks.leading_zeros() as u8
    } else {
        rooks.trailing_zeros() as u8
    };
    Some(sq % 8)
}

/// Resolves a Shredder-FEN file letter (`A`-`H`/`a`-`h`) against the
/// king's file to decide whether it names the kingside or queenside
/// right, and returns `(right_index, rook_file)`.
fn shredder_right(board: &Board, color: Color, file: u8) -> (usize, u8) {
    let king_bb = board.pieces(Piece::King, color);
    let king_file = (king_bb.trailing_zeros() as u8) % 8;
    let kingside = file > king_file;
    let right = match (color, kingside) {
        (Color::White, true) => RIGHT_WK,
        (Color::White, false) => RIGHT_WQ,
        (Color::Black, true) => RIGHT_BK,
        (Color::Black, false) => RIGHT_BQ,
    };
    (right, file)
}

impl Board {
    /// Resets `self` to the position described by `fen`, a standard
    /// six-field FEN string. The castling field accepts the conventional
    /// `KQkq` notation as well as X-FEN/Shredder-FEN rook-file letters
    /// (`A`-`H`/`a`-`h`), resolving each to the rook it names so Chess960
    /// positions round-trip correctly.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), String> {
        let mut fields = fen.split_whitespace();

        let placement = fields.next().ok_or("FEN missing piece placement field")?;
        let stm = fields.next().unwrap_or("w");
        let castling = fields.next().unwrap_or("-");
        let ep = fields.next().unwrap_or("-");
        let halfmove = fields.next().unwrap_or("0");
        let fullmove = fields.next().unwrap_or("1");

        let mut board = Board::new_empty();

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(format!(
                "FEN piece placement must have 8 ranks, got {}",
                ranks.len()
            ));
        }

        for (rank_from_top, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_from_top as u8;
            let mut file: u8 = 0;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as u8;
                    continue;
                }
                if file >= 8 {
                    return Err(format!("rank {} overflows 8 files", rank_from_top + 1));
                }
                let (piece, color) = CHAR_TO_PC[c as usize]
                    .ok_or_else(|| format!("invalid piece glyph '{c}' in FEN"))?;
                let sq = Square::new(file, rank);
                let bb = board.bb(color, piece) | (1u64 << sq.index());
                board.set_bb(color, piece, bb);
                file += 1;
            }
            if file != 8 {
                return Err(format!("rank {} does not cover 8 files", rank_from_top + 1));
            }
        }

        board.side_to_move = match stm {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(format!("invalid side-to-move field '{other}'")),
        };

        let mut rights = 0u8;
        let mut rook_file = [7u8, 0, 7, 0];
        if castling != "-" {
            for c in castling.chars() {
                let (bit, right_idx, file) = match c {
                    'K' => (
                        CASTLE_WK,
                        RIGHT_WK,
                        standard_rook_file(&board, Color::White, true)
                            .ok_or("no white rook on the back rank for 'K'")?,
                    ),
                    'Q' => (
                        CASTLE_WQ,
                        RIGHT_WQ,
                        standard_rook_file(&board, Color::White, false)
                            .ok_or("no white rook on the back rank for 'Q'")?,
                    ),
                    'k' => (
                        CASTLE_BK,
                        RIGHT_BK,
                        standard_rook_file(&board, Color::Black, true)
                            .ok_or("no black rook on the back rank for 'k'")?,
                    ),
                    'q' => (
                        CASTLE_BQ,
                        RIGHT_BQ,
                        standard_rook_file(&board, Color::Black, false)
                            .ok_or("no black rook on the back rank for 'q'")?,
                    ),
                    'A'..='H' => {
                        let (right_idx, file) =
                            shredder_right(&board, Color::White, c as u8 - b'A');
                        let bit = [CASTLE_WK, CASTLE_WQ][usize::from(right_idx != RIGHT_WK)];
                        (bit, right_idx, file)
                    }
                    'a'..='h' => {
                        let (right_idx, file) =
                            shredder_right(&board, Color::Black, c as u8 - b'a');
                        let bit = [CASTLE_BK, CASTLE_BQ][usize::from(right_idx != RIGHT_BK)];
                        (bit, right_idx, file)
                    }
                    other => return Err(format!("invalid castling glyph '{other}' in FEN")),
                };
                rights |= bit;
                rook_file[right_idx] = file;
            }
        }
        board.castling_rights = rights;
        board.castling_rook_file = rook_file;

        board.en_passant = if ep == "-" {
            None
        } else {
            Some(ep.parse::<Square>()?)
        };

        board.halfmove_clock = halfmove
            .parse()
            .map_err(|_| format!("invalid halfmove clock '{halfmove}'"))?;
        board.fullmove_number = fullmove
            .parse()
            .map_err(|_| format!("invalid fullmove number '{fullmove}'"))?;

        board.refresh_zobrist();
        board.history.clear();

        *self = board;
        Ok(())
    }

    /// Serializes the current position to a standard FEN string.
    pub fn to_fen(&self) -> String {
        let mut s = String::with_capacity(64);

        for rank_from_top in 0..8u8 {
            let rank = 7 - rank_from_top;
            let mut empty_run = 0u8;
            for file in 0..8u8 {
                let sq = Square::new(file, rank);
                match self.piece_at(sq) {
                    None => empty_run += 1,
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            s.push((b'0' + empty_run) as char);
                            empty_run = 0;
                        }
                        let idx = (color as usize) * 6 + (piece as usize);
                        s.push(PC_TO_CHAR[idx]);
                    }
                }
            }
            if empty_run > 0 {
                s.push((b'0' + empty_run) as char);
            }
            if rank_from_top != 7 {
                s.push('/');
            }
        }

        s.push(' ');
        s.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        s.push(' ');
        if self.castling_rights == 0 {
            s.push('-');
        } else {
            // Standard-corner rights (rook still on a/h) print as KQkq;
            // any other rook file prints as a Shredder-FEN file letter so
            // Chess960 positions keep round-tripping.
            if self.has_castling(CASTLE_WK) {
                s.push(if self.castling_rook_file[RIGHT_WK] == 7 {
                    'K'
                } else {
                    (b'A' + self.castling_rook_file[RIGHT_WK]) as char
                });
            }
            if self.has_castling(CASTLE_WQ) {
                s.push(if self.castling_rook_file[RIGHT_WQ] == 0 {
                    'Q'
                } else {
                    (b'A' + self.castling_rook_file[RIGHT_WQ]) as char
                });
            }
            if self.has_castling(CASTLE_BK) {
                s.push(if self.castling_rook_file[RIGHT_BK] == 7 {
                    'k'
                } else {
                    (b'a' + self.castling_rook_file[RIGHT_BK]) as char
                });
            }
            if self.has_castling(CASTLE_BQ) {
                s.push(if self.castling_rook_file[RIGHT_BQ] == 0 {
                    'q'
                } else {
                    (b'a' + self.castling_rook_file[RIGHT_BQ]) as char
                });
            }
        }

        s.push(' ');
        match self.en_passant {
            Some(sq) => s.push_str(&sq.to_string()),
            None => s.push('-'),
        }

        s.push(' ');
        s.push_str(&self.halfmove_clock.to_string());
        s.push(' ');
        s.push_str(&self.fullmove_number.to_string());

        s
    }
}
