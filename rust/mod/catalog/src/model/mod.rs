mod difficulty;
mod game;
mod league;
mod product;

pub use difficulty::*;
pub use game::*;
pub use league::*;
pub use product::*;
