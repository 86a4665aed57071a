//! Password protection of albums: hashing primitive and the per-session access gate.

mod gate;
mod password;
pub use gate::*;
pub use password::*;
