use std::time::Duration;

/// Default batching window of time-threshold stages (100 milliseconds)
pub const DEFAULT_QUEUE_TIME_THRESHOLD: Duration = Duration::from_millis(100);
/// Default number of requests allowed in one combined wire call
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1;
/// Default number of network retries the error resolver allows per task
pub const DEFAULT_MAX_NETWORK_RETRIES: usize = 1;
/// Cache expiry meaning "never expires"
pub const NEVER_EXPIRES: Duration = Duration::MAX;
/// Query parameter carrying the RPC method name(s)
pub const APPLICATION_METHOD_QUERY: &str = "applicationMethod";
/// Strategy metadata flag enabling network retries in the error resolver
pub const RETRY_NETWORK_ERROR_KEY: &str = "retry_network_error";
/// JSON-RPC protocol version written into every request body
pub const JSONRPC_VERSION: &str = "2.0";
/// Capacity of the broadcast channel behind ad-hoc result subscriptions
pub const RESULT_BUS_CAPACITY: usize = 1024;
