use crate::errors::AppError;
use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};

pub fn hash_password(password: &str) -> Result<String, BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, BcryptError> {
    verify(password, hash)
}

impl From<BcryptError> for AppError {
    fn from(err: BcryptError) -> Self {
        AppError::HashingError(format!("bcrypt error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_original_password() {
        let hashed = hash(" s3cret ", 4).unwrap();
        assert!(verify_password(" s3cret ", &hashed).unwrap());
        assert!(!verify_password("s3cret", &hashed).unwrap());
    }
}
