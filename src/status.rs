//! Canonical remote status codes and their HTTP projections.
//!
//! The remote authorization service reports outcomes in the canonical
//! code space (the same numbering gRPC uses), so outcomes travel as plain
//! integers. [`http_status`] projects any integer onto the HTTP status the
//! proxy should answer with; codes outside the known set fall back to 500.

use http::StatusCode;

/// Named outcome codes of the remote authorization service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CanonicalCode {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl CanonicalCode {
    /// Classify a raw wire code. `None` for anything outside the named set.
    pub fn from_code(code: i32) -> Option<CanonicalCode> {
        Some(match code {
            0 => CanonicalCode::Ok,
            1 => CanonicalCode::Cancelled,
            2 => CanonicalCode::Unknown,
            3 => CanonicalCode::InvalidArgument,
            4 => CanonicalCode::DeadlineExceeded,
            5 => CanonicalCode::NotFound,
            6 => CanonicalCode::AlreadyExists,
            7 => CanonicalCode::PermissionDenied,
            8 => CanonicalCode::ResourceExhausted,
            9 => CanonicalCode::FailedPrecondition,
            10 => CanonicalCode::Aborted,
            11 => CanonicalCode::OutOfRange,
            12 => CanonicalCode::Unimplemented,
            13 => CanonicalCode::Internal,
            14 => CanonicalCode::Unavailable,
            15 => CanonicalCode::DataLoss,
            16 => CanonicalCode::Unauthenticated,
            _ => return None,
        })
    }

    /// The raw wire value of this code.
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Map a raw canonical code to the HTTP status the proxy answers with.
///
/// Total over all of `i32`: unrecognized codes map to 500 so a confused
/// remote can never leave a request without a well-formed local reply.
pub fn http_status(code: i32) -> StatusCode {
    let raw: u16 = match CanonicalCode::from_code(code) {
        Some(CanonicalCode::Ok) => 200,
        // Nginx's nonstandard "client closed request"; http has no named constant.
        Some(CanonicalCode::Cancelled) => 499,
        Some(CanonicalCode::Unknown) => 500,
        Some(CanonicalCode::InvalidArgument) => 400,
        Some(CanonicalCode::DeadlineExceeded) => 504,
        Some(CanonicalCode::NotFound) => 404,
        Some(CanonicalCode::AlreadyExists) => 409,
        Some(CanonicalCode::PermissionDenied) => 403,
        Some(CanonicalCode::ResourceExhausted) => 429,
        Some(CanonicalCode::FailedPrecondition) => 400,
        Some(CanonicalCode::Aborted) => 409,
        Some(CanonicalCode::OutOfRange) => 400,
        Some(CanonicalCode::Unimplemented) => 501,
        Some(CanonicalCode::Internal) => 500,
        Some(CanonicalCode::Unavailable) => 503,
        Some(CanonicalCode::DataLoss) => 500,
        Some(CanonicalCode::Unauthenticated) => 401,
        None => 500,
    };
    StatusCode::from_u16(raw).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
