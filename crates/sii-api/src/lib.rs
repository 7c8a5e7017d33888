pub mod coordinator;
pub mod error;
pub mod help;
pub mod helpers;
pub mod locations;
pub mod proximity;
pub mod routes;
pub mod state;

mod store;
mod validate;

#[cfg(test)]
pub(crate) mod testing;
