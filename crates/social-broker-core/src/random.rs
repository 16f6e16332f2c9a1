// Random string generation for CSRF state, PKCE verifiers, and the
// placeholder password written on every reconcile.

use rand::Rng;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Generate a random URL-safe string of the given length.
pub fn generate_random_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// An opaque placeholder written to the password field of reconciled users.
/// Never a usable credential; regenerated on every reconcile.
pub fn generate_placeholder_password() -> String {
    format!("!social-{}", generate_random_string(40))
}
