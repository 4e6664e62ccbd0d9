//! Fixed-width binary records.

use std::fmt::Debug;

/// Fixed-width binary record.
///
/// Records are stored on disk as a raw concatenation of their native-endian byte representation,
/// without any header or delimiter, so a file of `n` records is exactly `n * WIDTH` bytes long.
pub trait Record: Copy + Ord + Send + Sync + Debug + 'static {
    /// On-disk width of a record in bytes.
    const WIDTH: usize;

    /// Byte representation of a record.
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;

    /// Decodes a record from its byte representation.
    fn from_bytes(bytes: Self::Bytes) -> Self;

    /// Encodes a record to its byte representation.
    fn to_bytes(self) -> Self::Bytes;
}

macro_rules! impl_record {
    ($($ty:ty),*) => {
        $(
            impl Record for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_ne_bytes(bytes)
                }

                fn to_bytes(self) -> Self::Bytes {
                    self.to_ne_bytes()
                }
            }
        )*
    };
}

impl_record!(u16, u32, u64, u128, i16, i32, i64, i128);
