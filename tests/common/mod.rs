#![allow(dead_code)]

pub mod strategies;

pub use builders::*;
pub use strategies::*;
