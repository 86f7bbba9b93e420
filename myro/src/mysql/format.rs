/// MySQL value transmission format.
///
/// For specific information, see its variant documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Text protocol, used by `COM_QUERY` results.
    ///
    /// Every value, including numbers, is transmitted as its string
    /// representation, `NULL` is a single `0xFB` byte.
    Text,
    /// Binary protocol, used by prepared statement parameters and results.
    ///
    /// Fixed width integers and floating points use little endian layout,
    /// `NULL`s are carried in a bitmap instead of the value.
    Binary,
}

impl Format {
    /// Returns `true` if this is [`Format::Binary`].
    pub const fn is_binary(self) -> bool {
        matches!(self, Format::Binary)
    }
}
