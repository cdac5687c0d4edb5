use std::future::Future;

use rand::{distributions::Alphanumeric, Rng};

use crate::api::error;

pub const SHORT_CODE_LEN: usize = 6;
pub const MAX_ATTEMPTS: usize = 10;

/// Random code over `[A-Za-z0-9]`.
pub fn generate() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHORT_CODE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
pub fn is_valid(code: &str) -> bool {
    code.len() == SHORT_CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Draws candidates from `generate` until `is_taken` reports a free one,
/// giving up after [`MAX_ATTEMPTS`] collisions in a row.
pub async fn mint_unique<G, F, Fut>(
    mut generate: G,
    mut is_taken: F,
) -> Result<String, error::SystemError>
where
    G: FnMut() -> String,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, error::SystemError>>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let code = generate();
        if !is_taken(code.clone()).await? {
            return Ok(code);
        }
        log::warn!("Short code collision on attempt {}/{}", attempt, MAX_ATTEMPTS);
    }

    Err(error::SystemError::CodeGenerationExhausted(MAX_ATTEMPTS))
}
