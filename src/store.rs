// src/store.rs
//! Cell storage backends sharing one `Storage` contract.

pub mod dense;
pub mod sparse;
pub mod storage_trait;
