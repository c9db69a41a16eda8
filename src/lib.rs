pub mod cli;
pub mod config;
pub mod db;
pub mod ident;
pub mod indexer;
pub mod model;
pub mod scip;
pub mod util;
