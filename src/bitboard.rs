//! Bitboard helpers shared across move generation, SEE and the evaluator.

pub const FILE_A: u64 = 0x0101_0101_0101_0101;
pub const FILE_B: u64 = FILE_A << 1;
pub const FILE_G: u64 = FILE_A << 6;
pub const FILE_H: u64 = FILE_A << 7;
pub const RANK_1: u64 = 0xFF;
pub const RANK_2: u64 = RANK_1 << 8;
pub const RANK_4: u64 = RANK_1 << 24;
pub const RANK_5: u64 = RANK_1 << 32;
pub const RANK_7: u64 = RANK_1 << 48;
pub const RANK_8: u64 = RANK_1 << 56;

/// Extra bitboard operations kept as a trait so call sites read `bb.lsb()`
/// the same way they read `bb.count_ones()`.
pub trait BitboardExt {
    fn lsb(self) -> u8;
    fn pop_lsb(&mut self) -> u8;
}

impl BitboardExt for u64 {
    #[inline(always)]
    fn lsb(self) -> u8 {
        debug_assert!(self != 0, "lsb() of an empty bitboard");
        self.trailing_zeros() as u8
    }

    #[inline(always)]
    fn pop_lsb(&mut self) -> u8 {
        let sq = self.lsb();
        *self &= *self - 1;
        sq
    }
}

/// Exclusive ray between two squares on the same rank, file or diagonal;
/// zero if they are not aligned. Used by pin-mask and check-evasion logic.
pub fn between(a: u8, b: u8) -> u64 {
    BETWEEN[a as usize][b as usize]
}

/// The full line (both directions, including `a` and `b`) through two
/// aligned squares, or zero if they are not aligned. Used to confine a
/// pinned piece's legal destinations to the pin ray.
pub fn line_through(a: u8, b: u8) -> u64 {
    LINE[a as usize][b as usize]
}

fn ray_steps(from: i32, df: i32, dr: i32) -> Vec<u8> {
    let mut file = from % 8;
    let mut rank = from / 8;
    let mut squares = Vec::new();
    loop {
        file += df;
        rank += dr;
        if !(0..8).contains(&file) || !(0..8).contains(&rank) {
            break;
        }
        squares.push((rank * 8 + file) as u8);
    }
    squares
}

fn compute_between_and_line() -> ([[u64; 64]; 64], [[u64; 64]; 64]) {
    let mut between = [[0u64; 64]; 64];
    let mut line = [[0u64; 64]; 64];
    const DIRS: [(i32, i32); 8] = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];
    for a in 0..64i32 {
        for &(df, dr) in &DIRS {
            let ray = ray_steps(a, df, dr);
            let mut acc = 0u64;
            for &b in &ray {
                between[a as usize][b as usize] = acc;
                acc |= 1u64 << b;
            }
            if let Some(&last) = ray.last() {
                let full = (1u64 << a) | acc;
                for &b in &ray {
                    line[a as usize][b as usize] |= full;
                }
                let _ = last;
            }
        }
    }
    (between, line)
}

static BETWEEN_LINE: std::sync::OnceLock<([[u64; 64]; 64], [[u64; 64]; 64])> =
    std::sync::OnceLock::new();

fn tables() -> &'static ([[u64; 64]; 64], [[u64; 64]; 64]) {
    BETWEEN_LINE.get_or_init(compute_between_and_line)
}
