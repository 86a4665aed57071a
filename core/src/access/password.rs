use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("could not hash password")]
    Hash(#[from] bcrypt::BcryptError),
}

/// One-way comparison of a candidate password against a stored digest
pub trait PasswordVerifier {
    fn verify(&self, candidate: &str, digest: &str) -> bool;
}

pub trait PasswordHasher: PasswordVerifier {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        BcryptHasher { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        BcryptHasher::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordVerifier for BcryptHasher {
    fn verify(&self, candidate: &str, digest: &str) -> bool {
        match bcrypt::verify(candidate, digest) {
            Ok(matches) => matches,
            Err(err) => {
                warn!("could not verify against stored password hash: {}", err);
                false
            }
        }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }
}
