pub mod authenticator;
pub mod binding;
pub mod enrollment;
pub mod face;
pub mod identity;
pub mod verification;
