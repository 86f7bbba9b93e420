use std::{fmt, ops};

/// Capability flags exchanged in the handshake.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/group__group__cs__capabilities__flags.html>
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u32);

macro_rules! flags {
    ($($(#[$doc:meta])* $name:ident = $bit:expr;)*) => {
        impl Capabilities {
            $(
                $(#[$doc])*
                pub const $name: Capabilities = Capabilities($bit);
            )*

            const NAMES: &'static [(&'static str, Capabilities)] = &[$((stringify!($name), Self::$name)),*];
        }
    };
}

flags! {
    /// Use the improved version of old password authentication.
    LONG_PASSWORD = 1;
    /// Send found rows instead of affected rows in EOF packet.
    FOUND_ROWS = 1 << 1;
    /// Get all column flags.
    LONG_FLAG = 1 << 2;
    /// Database name can be specified on connect in handshake response.
    CONNECT_WITH_DB = 1 << 3;
    /// Don't allow `database.table.column`.
    NO_SCHEMA = 1 << 4;
    /// Compression protocol supported.
    COMPRESS = 1 << 5;
    /// ODBC client.
    ODBC = 1 << 6;
    /// Can use `LOAD DATA LOCAL`.
    LOCAL_FILES = 1 << 7;
    /// Ignore spaces before `(`.
    IGNORE_SPACE = 1 << 8;
    /// New 4.1 protocol.
    PROTOCOL_41 = 1 << 9;
    /// Interactive client.
    INTERACTIVE = 1 << 10;
    /// Switch to SSL after sending the capability flags.
    SSL = 1 << 11;
    /// Do not issue SIGPIPE if network failures occur.
    IGNORE_SIGPIPE = 1 << 12;
    /// Client knows about transactions.
    TRANSACTIONS = 1 << 13;
    /// Old flag for 4.1 protocol.
    RESERVED = 1 << 14;
    /// New 4.1 authentication.
    SECURE_CONNECTION = 1 << 15;
    /// Enable multi statement support.
    MULTI_STATEMENTS = 1 << 16;
    /// Enable multi results.
    MULTI_RESULTS = 1 << 17;
    /// Multi results and OUT parameters in prepared statements.
    PS_MULTI_RESULTS = 1 << 18;
    /// Client supports plugin authentication.
    PLUGIN_AUTH = 1 << 19;
    /// Client supports connection attributes.
    CONNECT_ATTRS = 1 << 20;
    /// Length of auth response data is a length-encoded integer.
    PLUGIN_AUTH_LENENC_CLIENT_DATA = 1 << 21;
    /// Client can handle expired passwords.
    CAN_HANDLE_EXPIRED_PASSWORDS = 1 << 22;
    /// Expects the server to send session-state changes after an OK packet.
    SESSION_TRACK = 1 << 23;
    /// Client no longer needs EOF packets.
    DEPRECATE_EOF = 1 << 24;
}

impl Capabilities {
    /// Capabilities requested by this client before intersecting with the server.
    pub const CLIENT_DEFAULT: Capabilities = Capabilities(
        Self::LONG_PASSWORD.0
            | Self::LONG_FLAG.0
            | Self::PROTOCOL_41.0
            | Self::TRANSACTIONS.0
            | Self::SECURE_CONNECTION.0
            | Self::MULTI_RESULTS.0
            | Self::PS_MULTI_RESULTS.0
            | Self::PLUGIN_AUTH.0
            | Self::PLUGIN_AUTH_LENENC_CLIENT_DATA.0
            | Self::DEPRECATE_EOF.0,
    );

    /// Empty set.
    pub const fn empty() -> Capabilities {
        Capabilities(0)
    }

    /// Create from raw bits, unknown bits are preserved.
    pub const fn from_bits(bits: u32) -> Capabilities {
        Capabilities(bits)
    }

    /// Returns raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if all flags in `other` are set.
    pub const fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set flags in `other`.
    pub const fn insert(&mut self, other: Capabilities) {
        self.0 |= other.0;
    }

    /// Clear flags in `other`.
    pub const fn remove(&mut self, other: Capabilities) {
        self.0 &= !other.0;
    }

    /// Returns flags set in both.
    pub const fn intersection(self, other: Capabilities) -> Capabilities {
        Capabilities(self.0 & other.0)
    }
}

impl ops::BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Self) -> Self::Output {
        Capabilities(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl ops::BitAnd for Capabilities {
    type Output = Capabilities;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.intersection(rhs)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        let mut first = true;
        write!(f, "Capabilities(")?;
        for (name, flag) in Self::NAMES {
            if self.contains(*flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                rest &= !flag.0;
                first = false;
            }
        }
        if rest != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{rest:#x}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod test {
    use super::Capabilities;

    #[test]
    fn ssl_bit_position() {
        assert_eq!(Capabilities::SSL.bits(), 0x0000_0800);
        assert_eq!(Capabilities::PROTOCOL_41.bits(), 0x0000_0200);
    }

    #[test]
    fn set_operations() {
        let mut caps = Capabilities::PROTOCOL_41 | Capabilities::SSL;
        assert!(caps.contains(Capabilities::SSL));
        caps.remove(Capabilities::SSL);
        assert!(!caps.contains(Capabilities::SSL));
        assert_eq!(caps & Capabilities::SSL, Capabilities::empty());
        assert!(!Capabilities::CLIENT_DEFAULT.contains(Capabilities::SSL));
    }

    #[test]
    fn debug_names() {
        let caps = Capabilities::SSL | Capabilities::from_bits(1 << 30);
        assert_eq!(format!("{caps:?}"), "Capabilities(SSL | 0x40000000)");
    }
}
