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

use std::sync::Arc;

use clap::{Parser, Subcommand};
use common_base::config::storegate_server::init_server_conf_by_path;
use common_base::error::common::CommonError;
use common_base::logs::init_log;
use log::{error, info};
use storegate_server::security::PasswordEncoder;
use storegate_server::server::http::server::{start_http_server, HttpServerState};

pub const DEFAULT_SERVER_CONFIG: &str = "config/storegate.toml";

#[derive(Parser, Debug)]
#[command(name = "storegate")]
#[command(about = "StoreGate authentication gateway", long_about = None)]
#[command(version)]
struct ArgsParams {
    /// Path to the server configuration file
    #[arg(short, long, default_value_t = String::from(DEFAULT_SERVER_CONFIG))]
    conf: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a bcrypt hash for seeding a user's password_hash
    HashPassword { password: String },
}

#[tokio::main]
async fn main() {
    let args = ArgsParams::parse();
    let result = match args.command {
        Some(Command::HashPassword { password }) => hash_password(&password),
        None => run(&args.conf).await,
    };
    if let Err(e) = result {
        error!("{}", e);
        eprintln!("storegate: {}", e);
        std::process::exit(1);
    }
}

fn hash_password(password: &str) -> Result<(), CommonError> {
    let hash = PasswordEncoder::new().encode(password)?;
    println!("{}", hash);
    Ok(())
}

async fn run(conf: &str) -> Result<(), CommonError> {
    let config = init_server_conf_by_path(conf)?;
    init_log(&config.log)?;
    info!("Loaded config from {}: {:?}", conf, config.jwt);
    let state = HttpServerState::from_config(config)?;
    start_http_server(Arc::new(state), config.http_port).await
}
