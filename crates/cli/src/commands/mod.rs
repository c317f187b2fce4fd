pub mod backends;
pub mod inspect;
pub mod slice;
pub mod util;

pub use backends::*;
pub use inspect::*;
pub use slice::*;
pub use util::*;
