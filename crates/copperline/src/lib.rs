mod board;
mod cursor;
mod part;
mod river;

pub mod emit;
pub mod geom;
pub mod route;

pub use board::{Board, DesignRules, Layer, Net};
pub use cursor::Cursor;
pub use geom::Poly;
pub use part::{chamfered, train, Discrete0402, Footprint, Part, Qfn64};
pub use river::{enriver, River};
