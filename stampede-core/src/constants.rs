use std::time::Duration;

/// Default span that `rate` is measured against for constant-arrival-rate
/// scenarios.
pub const DEFAULT_TIME_UNIT: Duration = Duration::from_secs(1);

/// How long an aborted scenario waits for in-flight iterations before they are
/// forcibly torn down.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);
