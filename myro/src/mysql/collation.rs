//! <https://dev.mysql.com/doc/refman/8.0/en/charset-mysql.html>

/// Collation id, which also determines the character set.
///
/// Only the low 8 bits travel in the handshake, ids above 255 are truncated
/// by the protocol itself.
pub type CollationId = u16;

/// `latin1_swedish_ci`, the historical server default.
pub const LATIN1_SWEDISH_CI: CollationId = 8;
/// `utf8mb3_general_ci`.
pub const UTF8_GENERAL_CI: CollationId = 33;
/// `utf8mb4_general_ci`, the default collation requested by this client.
pub const UTF8MB4_GENERAL_CI: CollationId = 45;
/// `binary`, marks binary strings and blobs.
pub const BINARY: CollationId = 63;
/// `utf8mb4_0900_ai_ci`, the server default since 8.0.
pub const UTF8MB4_0900_AI_CI: CollationId = 255;
