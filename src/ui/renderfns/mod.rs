pub mod header;
pub mod utils;

pub use header::draw_header;
pub use utils::{balance_color, kind_color, truncate};
