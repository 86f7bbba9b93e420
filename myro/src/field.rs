//! Column metadata used to select and drive a codec.
use std::{fmt, ops};

use crate::mysql::{
    CollationId, TypeCode,
    collations::BINARY,
    types::{self, type_name},
};

/// Describes a column of a result set.
///
/// Immutable once constructed, usually produced from
/// [`ColumnDefinition`][crate::mysql::server::ColumnDefinition].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    ty: TypeCode,
    size: u64,
    flags: ColumnFlags,
    collation: CollationId,
    decimals: u8,
}

impl FieldInfo {
    /// Create new field with the given type and declared size.
    ///
    /// The field have no flags, binary collation, and no decimals.
    pub const fn new(ty: TypeCode, size: u64) -> FieldInfo {
        Self {
            ty,
            size,
            flags: ColumnFlags::empty(),
            collation: BINARY,
            decimals: 0,
        }
    }

    pub const fn with_flags(mut self, flags: ColumnFlags) -> FieldInfo {
        self.flags = flags;
        self
    }

    pub const fn with_collation(mut self, collation: CollationId) -> FieldInfo {
        self.collation = collation;
        self
    }

    pub const fn with_decimals(mut self, decimals: u8) -> FieldInfo {
        self.decimals = decimals;
        self
    }

    /// Wire type code.
    pub const fn ty(&self) -> TypeCode {
        self.ty
    }

    /// Declared display size, in characters for text columns.
    pub const fn size(&self) -> u64 {
        self.size
    }

    pub const fn flags(&self) -> ColumnFlags {
        self.flags
    }

    pub const fn collation(&self) -> CollationId {
        self.collation
    }

    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    pub const fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED)
    }

    /// Returns `true` if the column holds bytes instead of characters.
    pub const fn is_binary(&self) -> bool {
        self.collation == BINARY
    }

    pub const fn is_decimal(&self) -> bool {
        types::is_decimal(self.ty)
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("ty", &type_name(self.ty))
            .field("size", &self.size)
            .field("flags", &self.flags)
            .field("collation", &self.collation)
            .field("decimals", &self.decimals)
            .finish()
    }
}

/// Column definition flags.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/latest/group__group__cs__column__definition__flags.html>
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ColumnFlags(u16);

impl ColumnFlags {
    pub const NOT_NULL: ColumnFlags = ColumnFlags(1);
    pub const PRIMARY_KEY: ColumnFlags = ColumnFlags(1 << 1);
    pub const UNIQUE_KEY: ColumnFlags = ColumnFlags(1 << 2);
    pub const MULTIPLE_KEY: ColumnFlags = ColumnFlags(1 << 3);
    pub const BLOB: ColumnFlags = ColumnFlags(1 << 4);
    pub const UNSIGNED: ColumnFlags = ColumnFlags(1 << 5);
    pub const ZEROFILL: ColumnFlags = ColumnFlags(1 << 6);
    pub const BINARY: ColumnFlags = ColumnFlags(1 << 7);
    pub const ENUM: ColumnFlags = ColumnFlags(1 << 8);
    pub const AUTO_INCREMENT: ColumnFlags = ColumnFlags(1 << 9);
    pub const TIMESTAMP: ColumnFlags = ColumnFlags(1 << 10);
    pub const SET: ColumnFlags = ColumnFlags(1 << 11);

    pub const fn empty() -> ColumnFlags {
        ColumnFlags(0)
    }

    pub const fn from_bits(bits: u16) -> ColumnFlags {
        ColumnFlags(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: ColumnFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl ops::BitOr for ColumnFlags {
    type Output = ColumnFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        ColumnFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for ColumnFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnFlags({:#06x})", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mysql::{collations::UTF8MB4_GENERAL_CI, types::FLOAT};

    #[test]
    fn defaults() {
        let field = FieldInfo::new(FLOAT, 12);
        assert_eq!(field.ty(), FLOAT);
        assert_eq!(field.size(), 12);
        assert!(field.is_binary());
        assert!(!field.is_unsigned());
        assert!(!field.is_decimal());
    }

    #[test]
    fn builder() {
        let field = FieldInfo::new(types::LONG, 10)
            .with_flags(ColumnFlags::UNSIGNED | ColumnFlags::NOT_NULL)
            .with_collation(UTF8MB4_GENERAL_CI)
            .with_decimals(2);
        assert!(field.is_unsigned());
        assert!(field.flags().contains(ColumnFlags::NOT_NULL));
        assert!(!field.is_binary());
        assert_eq!(field.decimals(), 2);
    }
}
