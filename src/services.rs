mod constant;
mod fallible;
mod func;
mod interface;
mod providers;
mod service;
mod singleton;

pub use constant::*;
pub use fallible::*;
pub use func::*;
pub use interface::*;
pub use providers::*;
pub use service::*;
pub use singleton::*;
