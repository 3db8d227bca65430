//! Context-mixing predictor and arithmetic coder (spec.md 4): a from-scratch
//! port of the paq8-family model described there, replacing the crate's
//! original lpaq1-derived flat predictor.

pub mod apm;
pub mod bmp_model;
pub mod coder;
pub mod context_map;
pub mod exe_model;
pub mod jpeg_model;
pub mod logistic;
pub mod match_model;
pub mod mixer;
pub mod order_model;
pub mod picture_model;
pub mod predictor;
pub mod record_model;
pub mod ring;
pub mod run_map;
pub mod small_map;
pub mod sparse_model;
pub mod state_table;
pub mod statemap;
pub mod word_model;
