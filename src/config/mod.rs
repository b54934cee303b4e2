// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod core;
pub mod proxy;

pub use core::{auto_rate_limit, ScanOptions, DEFAULT_RETRIES, DEFAULT_TIMEOUT_SECS};
pub use proxy::ProxyConfig;
