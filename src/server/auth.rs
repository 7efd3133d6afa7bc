// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ServiceError;
use crate::server::ServerState;

/// The user resolved from the request's bearer token. Identity issuance
/// lives elsewhere; this only maps token to user id.
pub struct AuthedUser {
    pub user_id: i64,
}

impl FromRequestParts<ServerState> for AuthedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ServiceError::Unauthorized)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ServiceError::Unauthorized)?;
        let user = state
            .db
            .find_user_by_token(token)
            .map_err(ServiceError::from)?
            .ok_or(ServiceError::Unauthorized)?;
        Ok(AuthedUser {
            user_id: user.user_id,
        })
    }
}
