//! Entity definitions: user, profile, tag, and the many-to-many join.
//! The relational schema is auto-derived from these at startup, see
//! [`crate::schema`].

pub mod profile;
pub mod tag;
pub mod user;
pub mod user_tag;
