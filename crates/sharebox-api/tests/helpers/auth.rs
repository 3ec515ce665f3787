use sharebox_api::auth::issue_access_token;

pub const TEST_ACCESS_TOKEN_SECRET: &str = "test-secret-key-min-32-characters-long-for-testing";

/// Signed access token for `user_id`, valid for an hour.
pub fn token_for(user_id: &str) -> String {
    issue_access_token(TEST_ACCESS_TOKEN_SECRET, user_id, chrono::Duration::hours(1))
        .expect("Failed to issue test token")
}

pub fn bearer(user_id: &str) -> String {
    format!("Bearer {}", token_for(user_id))
}
