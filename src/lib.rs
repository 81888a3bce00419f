// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

pub mod client;
pub mod commands;
pub mod config;
pub mod core;
pub mod types;
