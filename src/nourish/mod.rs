// SPDX-License-Identifier: MIT

pub mod config;
pub mod safety;
pub mod server;
pub mod workflow;
