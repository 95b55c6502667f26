//! Wire types for the teamsite backend API.
//!
//! Everything here is plain serde data. Request types borrow where the caller
//! already owns the strings; response types own their data.

mod auth;
mod content;
mod lang;
mod member;

pub use auth::{
    AuthResponse, ChangePasswordRequest, EmailAvailability, LoginRequest, LogoutRequest,
    MessageResponse, RefreshRequest, RefreshResponse, RegisterRequest, TokenPair,
};
pub use content::{
    Admin, NewAdmin, NewMember, NewPublication, NewSocialLink, NewTeam, Publication, SocialLink,
    Team,
};
pub use lang::Lang;
pub use member::{Member, MemberEnvelope, MemberStatusUpdate, Profile};
