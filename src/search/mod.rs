//! Search: move ordering, static evaluation, the transposition table and the
//! iterative-deepening alpha-beta driver.

pub mod context;
pub mod eval;
pub mod history;
pub mod pesto;
pub mod picker;
pub mod search;
pub mod see;
pub mod shared;
pub mod tb;
pub mod tt;
