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

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Response<T> {
    pub code: u16,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

pub fn success_response<T: Serialize>(data: T) -> String {
    let resp = Response { code: 0, data };
    serde_json::to_string(&resp).unwrap_or_else(|_| r#"{"code":0,"data":null}"#.to_string())
}

pub fn error_response(code: u16, message: impl Into<String>) -> String {
    let resp = ErrorResponse {
        code,
        message: message.into(),
    };
    serde_json::to_string(&resp)
        .unwrap_or_else(|_| format!(r#"{{"code":{},"message":"error"}}"#, code))
}
