pub mod camera;
pub mod config;
pub mod host;
pub mod loops;
pub mod pose;
pub mod session;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;
