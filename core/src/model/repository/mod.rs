//! Operations on the in-memory album forest.
//!
//! Albums are located by their id anywhere in the forest. The pure functions
//! return a new forest and leave their input untouched, the `*_in_place`
//! variants mutate a forest the caller owns.

pub mod album;

#[cfg(test)]
mod test;
