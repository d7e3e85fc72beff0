//! Default tuning values shared across the sync engine.

use std::time::Duration;

/// Page size used when walking the upstream index endpoint.
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Worker pool size for the main pass of a sync.
pub const DEFAULT_WORKERS: usize = 6;

/// Number of smaller retry rounds appended to each pass.
pub const DEFAULT_RETRY_ROUNDS: u32 = 2;

/// Attempts per entity inside one worker call.
pub const DEFAULT_ATTEMPTS: u32 = 4;

/// Emit an in-flight progress snapshot every N completed entities.
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

/// How long a cached upstream payload stays fresh.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
