use crate::api_client::ApiClient;
use analytics_agent_common::SessionId;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

fn new_session_id() -> String {
    SessionId::new().to_string()
}

/// Read queries until `exit`; all queries in one run share a session
pub async fn run(client: &ApiClient, user_id: Option<&str>) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut session_id = new_session_id();

    println!("Analytics Agent - Interactive Mode");
    println!("Connected to {}", client.base_url());
    println!("Commands: /new (new session), /health, exit");

    loop {
        match rl.readline("analytics> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                match line {
                    "exit" | "quit" => break,
                    "/new" => {
                        session_id = new_session_id();
                        println!("Started new session {}", session_id);
                    }
                    "/health" => match client.health().await {
                        Ok(body) => println!("Server health: {}", body),
                        Err(e) => eprintln!("Error: {:#}", e),
                    },
                    query => match client.query(query, Some(&session_id), user_id).await {
                        Ok(response) => println!("\n{}\n", response),
                        Err(e) => eprintln!("Error: {:#}", e),
                    },
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
