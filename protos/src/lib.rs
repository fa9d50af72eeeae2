//! Generated gRPC contracts for the sift services.
//!
//! The `.proto` sources live in `proto/` and are compiled by `tonic-build`
//! at build time. Services depend on this crate instead of carrying their
//! own copies of the contracts.

/// Auth service contract (register, login, validate, refresh)
pub mod auth {
    tonic::include_proto!("auth");
}

/// Storage service contract (get-by-id, register-by-id)
pub mod storage {
    tonic::include_proto!("storage");
}
