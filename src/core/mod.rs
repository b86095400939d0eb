use rand::distr::{Alphanumeric, SampleString};

/// Collaborator traits: validation and batch storage
pub mod item;

/// Import coordinator
pub mod job;

/// Outcome report of an import run
pub mod report;

/// Generates a random name consisting of alphanumeric characters.
///
/// # Returns
///
/// A `String` containing the generated random name.
fn build_name() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 8)
}
