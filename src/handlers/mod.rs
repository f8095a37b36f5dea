//! HTTP handlers

pub mod health;
pub mod session;
pub mod auth;
pub mod dashboard;

#[cfg(test)]
mod tests;
