use sha2::{Digest, Sha256};

/// The configured secret-panel credential pair.
///
/// Both fields are held as SHA-256 digests and compared in constant time,
/// so a login attempt costs the same whichever field is wrong.
pub struct Credentials {
    username: [u8; 32],
    password: [u8; 32],
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: digest(username),
            password: digest(password),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        let user_ok = constant_time_eq(&digest(username), &self.username);
        let pass_ok = constant_time_eq(&digest(password), &self.password);
        user_ok & pass_ok
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
