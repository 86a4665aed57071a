pub mod repository;

mod album;
mod draft;
mod id_types;
pub use album::*;
pub use draft::*;
pub use id_types::*;

mod util;
