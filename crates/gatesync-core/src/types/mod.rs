mod common;
mod list;
mod rule;

pub use common::*;
pub use list::*;
pub use rule::*;
