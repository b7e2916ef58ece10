//! Generated gRPC types for the `ailogos.v1` method channel.

include!(concat!(env!("OUT_DIR"), concat!("/", "ailogos.v1", ".rs")));
