//! Simulation of a fixed-size address space, in which byte ranges
//! are allocated, freed, read and written through a small command
//! language.

pub mod app;
pub mod arena;
pub mod commands;
