pub mod config;
pub mod dimensions;
pub mod errors;
pub mod gallery;
pub mod grouping;
pub mod keys;
pub mod models;
pub mod remote;
pub mod scroll;
pub mod search;
