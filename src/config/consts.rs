/// Engine version stamp mixed into every fingerprint; bumping it
/// invalidates all cached artifacts at once.
pub const ENGINE_VERSION: &str = "0.1.0";

/// Fallback worker-pool size when system parallelism cannot be determined
pub const DEFAULT_CONCURRENCY_FALLBACK: usize = 4;
