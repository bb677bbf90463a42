//! Row mapping for the `jobs` table.

mod read;
mod write;
