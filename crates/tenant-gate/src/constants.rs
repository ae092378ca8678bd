//! Constants for tenant-gate

/// Role every authenticated transaction switches to before tenant queries
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// Session variable holding the caller's subject for row-level security policies
pub const CLAIM_SUB_SETTING: &str = "request.jwt.claim.sub";

/// Session variable holding the caller's email for row-level security policies
pub const CLAIM_EMAIL_SETTING: &str = "request.jwt.claim.email";

/// SQL query to check database connection health
pub const HEALTH_CHECK_QUERY: &str = "SELECT 1";

/// Window applied to a tenant whose claims carry a request limit but no window
pub const DEFAULT_APP_WINDOW_SECS: u64 = 60;

/// Upper bound for the `Retry-After` header value
pub const MAX_RETRY_AFTER_SECS: u64 = 86_400;

/// Maximum accepted size of a token endpoint form body
pub const MAX_FORM_BODY_BYTES: usize = 64 * 1024;

/// Maximum accepted size of an admin JSON body
pub const MAX_JSON_BODY_BYTES: usize = 1024 * 1024;

/// Default page size for paginated listings
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// HTTP header names (lowercase, as `HeaderName::from_static` requires)
pub mod headers {
    pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
    pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
    pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

    pub const APP_RATE_LIMIT_LIMIT: &str = "x-app-ratelimit-limit";
    pub const APP_RATE_LIMIT_REMAINING: &str = "x-app-ratelimit-remaining";
    pub const APP_RATE_LIMIT_RESET: &str = "x-app-ratelimit-reset";

    pub const FORWARDED_FOR: &str = "x-forwarded-for";
    pub const REAL_IP: &str = "x-real-ip";
}
