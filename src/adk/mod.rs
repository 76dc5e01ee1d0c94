// SPDX-License-Identifier: MIT

//! Agent development kit: generation backends and the shared error types

pub mod error;
pub mod model;
