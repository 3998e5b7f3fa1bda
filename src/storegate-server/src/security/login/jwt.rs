// Copyright 2023 RobustMQ Team
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
use common_base::config::storegate_server::JwtConfig;
use common_base::error::common::CommonError;
use common_jwt::jwt_manager::{JwtTokenCodec, TokenCodec};
use jsonwebtoken::Algorithm;
use log::info;
use std::sync::Arc;

pub fn build_token_codec(jwt_config: &JwtConfig) -> Result<Arc<dyn TokenCodec>, CommonError> {
    let algorithm = str_to_algorithm(jwt_config.algorithm.as_str())?;
    let codec = JwtTokenCodec::new(jwt_config.secret.as_bytes(), algorithm)
        .map_err(|e| CommonError::InvalidConfig("jwt".to_string(), e.to_string()))?;
    info!("JWT token codec ready, signing with {:?}", codec.algorithm());
    Ok(Arc::new(codec))
}

fn str_to_algorithm(alg: &str) -> Result<Algorithm, CommonError> {
    match alg {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(CommonError::InvalidConfig(
            "jwt.algorithm".to_string(),
            format!("unknown algorithm {}", alg),
        )),
    }
}
