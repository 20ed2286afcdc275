//! Employees, their compensation, and the reporting hierarchy.

pub mod model;
pub mod repository;
pub mod routes;
pub mod service;

#[cfg(test)]
mod tests;
