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

use clap::Parser;
use rand::Rng;

use crate::db::Database;
use crate::error::Fallible;
use crate::error::fail;
use crate::server::start_server;

const DEFAULT_DATABASE: &str = "cramdeck.sqlite3";

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Run the study session server.
    Serve {
        /// Path to the SQLite database.
        #[arg(long, default_value = DEFAULT_DATABASE)]
        database: String,
        /// Address to bind.
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: String,
    },
    /// Create a user and print their API token.
    AddUser {
        /// The user's name.
        name: String,
        /// Path to the SQLite database.
        #[arg(long, default_value = DEFAULT_DATABASE)]
        database: String,
    },
    /// Create a small demo question set for an existing user.
    Seed {
        /// The user's name.
        name: String,
        /// Path to the SQLite database.
        #[arg(long, default_value = DEFAULT_DATABASE)]
        database: String,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Serve { database, bind } => {
            let db = Database::new(&database)?;
            start_server(db, bind).await
        }
        Command::AddUser { name, database } => {
            let db = Database::new(&database)?;
            let token = generate_token();
            db.create_user(&name, &token)?;
            println!("Created user {name}.");
            println!("API token: {token}");
            Ok(())
        }
        Command::Seed { name, database } => {
            let db = Database::new(&database)?;
            let user = match db.find_user_by_name(&name)? {
                Some(user) => user,
                None => return fail(format!("no user named {name}.")),
            };
            let set_id = db.create_question_set(user.user_id, "Demo: capitals")?;
            for (question, answer) in [
                ("Capital of France?", "Paris"),
                ("Capital of Japan?", "Tokyo"),
                ("Capital of Peru?", "Lima"),
                ("Capital of Australia?", "Canberra"),
            ] {
                db.create_question(set_id, question, Some(answer), 3)?;
            }
            println!("Created question set {set_id} for {name}.");
            Ok(())
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
