mod banner;
mod cart;
mod catalog;
mod event;
mod match_detail;
mod session;
mod team;

pub use banner::*;
pub use cart::*;
pub use catalog::*;
pub use event::*;
pub use match_detail::*;
pub use session::*;
pub use team::*;
