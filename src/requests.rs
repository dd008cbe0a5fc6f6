mod dependency;
mod info;

pub use dependency::*;
pub use info::*;
