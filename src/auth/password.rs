use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2_sha256";
pub const SALT_LENGTH: usize = 16;
pub const KEY_LENGTH: usize = 32;

/// PBKDF2-SHA256 password hashes encoded as `pbkdf2_sha256$rounds$salt$hash`
/// (salt and hash hex-encoded). Verification uses the rounds stored in the
/// hash, so changing `iterations` only affects new hashes.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self { iterations: iterations.max(1) }
    }

    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let key = derive(password, &salt, self.iterations);
        format!("{}${}${}${}", SCHEME, self.iterations, hex::encode(salt), hex::encode(key))
    }

    /// Malformed hashes never verify.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let parts: Vec<&str> = encoded.split('$').collect();
        let [scheme, rounds, salt, expected] = parts[..] else {
            return false;
        };
        if scheme != SCHEME {
            return false;
        }
        let (Ok(rounds), Ok(salt), Ok(expected)) = (
            rounds.parse::<u32>(),
            hex::decode(salt),
            hex::decode(expected),
        ) else {
            return false;
        };
        if rounds == 0 || expected.len() != KEY_LENGTH {
            return false;
        }
        let actual = derive(password, &salt, rounds);
        actual[..].ct_eq(&expected[..]).into()
    }
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut key);
    key
}
