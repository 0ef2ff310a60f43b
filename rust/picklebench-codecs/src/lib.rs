//! Codec adapters: one [`Codec`] per serialization library, each producing a
//! pooled buffer and optionally wrapping it with the pickle compression.

pub mod bincode_codec;
pub mod bincode_zstd;
pub mod codec;
pub mod json;
pub mod protobuf;

use serde::{Serialize, de::DeserializeOwned};

pub use bincode_codec::BincodeCodec;
pub use bincode_zstd::BincodeZstdCodec;
pub use codec::Codec;
pub use json::JsonCodec;
pub use protobuf::ProtobufCodec;

/// The serialization libraries under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Bincode,
    /// bincode with the codec's own zstd compression.
    BincodeZstd,
    Json,
    Protobuf,
}

impl CodecKind {
    pub const ALL: [CodecKind; 4] = [
        CodecKind::Bincode,
        CodecKind::BincodeZstd,
        CodecKind::Json,
        CodecKind::Protobuf,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CodecKind::Bincode => "bincode",
            CodecKind::BincodeZstd => "bincode-zstd",
            CodecKind::Json => "json",
            CodecKind::Protobuf => "protobuf",
        }
    }

    /// Instantiates the adapter for values of type `T`.
    pub fn codec<T>(&self) -> Box<dyn Codec<T>>
    where
        T: Serialize + DeserializeOwned + prost::Message + Default,
    {
        log::debug!("creating {} codec", self.name());
        match self {
            CodecKind::Bincode => Box::new(BincodeCodec),
            CodecKind::BincodeZstd => Box::new(BincodeZstdCodec::default()),
            CodecKind::Json => Box::new(JsonCodec),
            CodecKind::Protobuf => Box::new(ProtobufCodec),
        }
    }
}

impl std::str::FromStr for CodecKind {
    type Err = picklebench_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CodecKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| picklebench_common::Error::invalid_arg("codec", format!("unknown codec '{s}'")))
    }
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
