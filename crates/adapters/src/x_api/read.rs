//! X API read adapter: the authenticated account

use serde::Deserialize;
use threadsmith_domain::{AccountInfo, PostError};

use super::{XPoster, check_status};

#[derive(Deserialize)]
struct UserResponse {
    data: UserData,
}

#[derive(Deserialize)]
struct UserData {
    id: String,
    username: String,
}

impl XPoster {
    /// Look up the account the user token belongs to
    pub(super) async fn fetch_me(&self) -> Result<AccountInfo, PostError> {
        let url = format!("{}/2/users/me", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| PostError::Network(e.to_string()))?;

        let response = check_status(response, "get user").await?;

        let user_response: UserResponse = response
            .json()
            .await
            .map_err(|e| PostError::Api(e.to_string()))?;

        tracing::debug!(username = %user_response.data.username, "Verified X credentials");

        Ok(AccountInfo {
            id: user_response.data.id,
            username: user_response.data.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use threadsmith_domain::ThreadPoster;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_verify_credentials_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "id": "123456789",
                    "name": "Test User",
                    "username": "testuser"
                }
            })))
            .mount(&mock_server)
            .await;

        let poster = XPoster::with_base_url(
            SecretString::new("test-token".into()),
            mock_server.uri(),
            None,
            280,
        );

        let account = poster.verify_credentials().await.unwrap();

        assert_eq!(account.id, "123456789");
        assert_eq!(account.username, "testuser");
    }

    #[tokio::test]
    async fn test_verify_credentials_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let poster = XPoster::with_base_url(
            SecretString::new("bad-token".into()),
            mock_server.uri(),
            None,
            280,
        );

        let result = poster.verify_credentials().await;

        assert!(matches!(result, Err(PostError::Auth(_))));
    }
}
