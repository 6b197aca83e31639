//! Domain-level constants.
//!
//! These constants define business rules shared by the SSO services.

// =============================================================================
// User Roles
// =============================================================================

/// Default role assigned to new users
pub const ROLE_USER: &str = "user";

/// Administrator role with elevated privileges
pub const ROLE_ADMIN: &str = "admin";

// =============================================================================
// Password hashing
// =============================================================================

/// Argon2 memory cost in KiB (argon2 crate default, ~19 MiB)
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;

/// Argon2 iteration count
pub const DEFAULT_HASH_ITERATIONS: u32 = 2;

/// Argon2 lanes
pub const DEFAULT_HASH_PARALLELISM: u32 = 1;

// =============================================================================
// Tokens
// =============================================================================

/// Default access token lifetime in seconds
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;
