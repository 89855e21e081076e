// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod convert;
pub mod dto;
pub mod errors;
pub mod params;

pub use dto::*;
pub use errors::{ApiError, ApiErrorCode};

pub const CRATE_NAME: &str = "paylane-api";
pub const API_VERSION: &str = "v1";
