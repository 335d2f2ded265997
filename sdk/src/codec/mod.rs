//! Value codec, serializer and deserializer

mod deserializer;
mod scalar;
mod serializer;

#[cfg(test)]
mod tests;

pub use deserializer::Deserializer;
pub use scalar::{
    decode_date, decode_datetime, decode_enum, decode_scalar, encode_enum, encode_scalar,
    format_datetime,
};
pub use serializer::Serializer;
