//! Authorization core.
//!
//! `actor` resolves the request principal (role + primary-admin flag, fresh
//! from the store on every request); `policy` is the per-operation predicate
//! table every handler consults before writing.

mod actor;
pub mod policy;

pub use actor::{Actor, Role};
