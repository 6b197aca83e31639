//! gRPC transport adapter.

mod auth_grpc;

pub use auth_grpc::{parse_grpc_timeout, AuthGrpcService};
