pub mod mnist;
pub mod split;

pub use mnist::load_mnist;
pub use split::{pick, Split};
