//! Use cases: the grant application engine.

pub mod grants;
