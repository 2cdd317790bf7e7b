pub mod bitmap;
pub mod ping;
pub mod subnet;

pub use bitmap::Bitmap;
pub use subnet::{Subnet, SubnetMask};
