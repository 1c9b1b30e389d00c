//! Base clearing algorithms and balance validation.

pub mod clearing;
