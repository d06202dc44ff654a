#![no_std]

#[cfg(feature = "log")]
#[macro_use]
extern crate log;

mod bits;
mod error;
mod frame;
mod model;
mod slave;
mod store;

pub use error::*;
pub use frame::*;
pub use model::*;
pub use slave::*;
pub use store::*;
