/// A physical in-memory representation of a Parquet fixed-width type.
pub trait NativeType:
    Sized + Copy + std::fmt::Debug + Default + PartialEq + Send + Sync + 'static
{
    type Bytes: AsRef<[u8]> + for<'a> TryFrom<&'a [u8], Error = std::array::TryFromSliceError>;

    fn to_le_bytes(&self) -> Self::Bytes;

    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! native {
    ($type:ty) => {
        impl NativeType for $type {
            type Bytes = [u8; std::mem::size_of::<Self>()];

            #[inline]
            fn to_le_bytes(&self) -> Self::Bytes {
                Self::to_le_bytes(*self)
            }

            #[inline]
            fn from_le_bytes(bytes: Self::Bytes) -> Self {
                Self::from_le_bytes(bytes)
            }
        }
    };
}

native!(i32);
native!(i64);
native!(f32);
native!(f64);

/// INT96 is physically three little-endian `u32`s. It is surfaced raw.
impl NativeType for [u32; 3] {
    type Bytes = [u8; 12];

    #[inline]
    fn to_le_bytes(&self) -> Self::Bytes {
        let mut bytes = [0; 12];
        self.iter().enumerate().for_each(|(index, part)| {
            bytes[index * 4..(index + 1) * 4].copy_from_slice(&part.to_le_bytes())
        });
        bytes
    }

    #[inline]
    fn from_le_bytes(bytes: Self::Bytes) -> Self {
        let mut word = [0; 4];
        word.copy_from_slice(&bytes[0..4]);
        let a = u32::from_le_bytes(word);
        word.copy_from_slice(&bytes[4..8]);
        let b = u32::from_le_bytes(word);
        word.copy_from_slice(&bytes[8..12]);
        let c = u32::from_le_bytes(word);
        [a, b, c]
    }
}

/// Decodes a single value from an exactly-sized little-endian chunk.
#[inline]
pub fn decode<T: NativeType>(chunk: &[u8]) -> T {
    // infalible when called with `chunks_exact(size_of::<T>())`.
    let chunk: T::Bytes = match chunk.try_into() {
        Ok(v) => v,
        Err(_) => panic!("chunk width must equal the physical type width"),
    };
    T::from_le_bytes(chunk)
}
