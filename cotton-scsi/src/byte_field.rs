//! Fixed-width integer fields within byte buffers
//!
//! SCSI structures are big-endian; ATA payloads (IDENTIFY data, log
//! pages) are little-endian. Each accessor reads or writes exactly the
//! width of its integer type starting at `offset`, and panics (like any
//! slice index) if the buffer is too short.

fn field<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&buf[offset..offset + N]);
    bytes
}

macro_rules! accessors {
    ($ty:ty, $get_be:ident, $set_be:ident, $get_le:ident, $set_le:ident) => {
        #[doc = concat!("Read a big-endian `", stringify!($ty), "` at `offset`")]
        pub fn $get_be(buf: &[u8], offset: usize) -> $ty {
            <$ty>::from_be_bytes(field(buf, offset))
        }

        #[doc = concat!("Write a big-endian `", stringify!($ty), "` at `offset`")]
        pub fn $set_be(buf: &mut [u8], offset: usize, val: $ty) {
            let bytes = val.to_be_bytes();
            buf[offset..offset + bytes.len()].copy_from_slice(&bytes);
        }

        #[doc = concat!("Read a little-endian `", stringify!($ty), "` at `offset`")]
        pub fn $get_le(buf: &[u8], offset: usize) -> $ty {
            <$ty>::from_le_bytes(field(buf, offset))
        }

        #[doc = concat!("Write a little-endian `", stringify!($ty), "` at `offset`")]
        pub fn $set_le(buf: &mut [u8], offset: usize, val: $ty) {
            let bytes = val.to_le_bytes();
            buf[offset..offset + bytes.len()].copy_from_slice(&bytes);
        }
    };
}

accessors!(u16, get_be16, set_be16, get_le16, set_le16);
accessors!(u32, get_be32, set_be32, get_le32, set_le32);
accessors!(u64, get_be64, set_be64, get_le64, set_le64);
