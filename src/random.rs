//! Random database names.
//!
//! Tests sharing one server can each take a fresh database so their data
//! never collides.

use rand::Rng;

/// Characters a generated database name is drawn from.
pub const DB_NAME_CHARS: &str = "abcdefghijklmnopqrstuvwxyz";

/// Length of a generated database name.
pub const DB_NAME_LEN: usize = 15;

/// Generate a random database name of [`DB_NAME_LEN`] lowercase letters.
///
/// # Examples
///
/// ```
/// use ephemongo::random::{random_database, DB_NAME_LEN};
///
/// let name = random_database();
/// assert_eq!(name.len(), DB_NAME_LEN);
/// assert!(name.chars().all(|c| c.is_ascii_lowercase()));
/// ```
#[must_use]
pub fn random_database() -> String {
    let alphabet = DB_NAME_CHARS.as_bytes();
    let mut rng = rand::thread_rng();
    (0..DB_NAME_LEN)
        .map(|_| {
            let index = rng.gen_range(0..alphabet.len());
            alphabet.get(index).map_or('a', |byte| char::from(*byte))
        })
        .collect()
}
