// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>
#![allow(clippy::too_many_arguments)]

pub mod app;
pub mod common;
pub mod data;
pub mod domain;
pub mod services;

// Short paths for scenario code.
pub use services::engine;
pub use services::engine::prelude;
