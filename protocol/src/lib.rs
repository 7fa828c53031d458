//! Wire types shared by the wallet client crates.
//!
//! `message` holds the request/response records of the REST backend and
//! `codec` the defensive decode step that turns loosely shaped JSON into
//! typed results.

pub mod codec;
pub mod message;

pub use codec::{
    CodecError, LenientList, decode_list, decode_list_lenient, decode_record, error_message,
    expect_record, expect_sequence, normalize_record, unwrap_envelope, unwrap_named, value_kind,
};
pub use message::{
    AdminUser, AuthPayload, Balance, Bet, CreateTicketRequest, DeleteAccountRequest, HealthStatus,
    LoginRequest, Notification, ProfilePictureRef, RegisterRequest, ResendCodeRequest,
    SupportTicket, Transaction, UpdatePasswordRequest, UpdateProfileRequest, UserProfile,
    VerifyEmailRequest, WalletAmountRequest,
};
