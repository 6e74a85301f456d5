//! Application use cases built on the authenticated gateway.

mod update_profile;

pub use update_profile::{PROFILE_PATH, Profile, UpdateProfile, UpdateProfileInput};
