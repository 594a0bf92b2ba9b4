pub mod account;
pub mod artifact;

pub use account::{current_period, period_of, UserAccount};
pub use artifact::{Artifact, NewArtifact};
