//! Interactive console loop
//!
//! Multiplexes operator commands with the connection's display feed. The
//! prompt runs on its own thread (readline blocks); lines are forwarded over
//! a channel into the async loop.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{ApiClient, DepositRequest, LoginRequest};
use crate::client::{ConnectionManager, DisplayMessage, MessageCategory, OutboundRequest};
use crate::config::ConsoleConfig;
use crate::console::command::{Command, HELP_TEXT};
use crate::jwt;

/// The interactive console
pub struct Console {
    config: ConsoleConfig,
    api: ApiClient,
    manager: ConnectionManager,
    events: mpsc::UnboundedReceiver<DisplayMessage>,
    token: Option<String>,
}

impl Console {
    /// Create a console for the given configuration
    ///
    /// A token supplied up front skips the login step.
    pub fn new(config: ConsoleConfig, token: Option<String>) -> Self {
        let api = ApiClient::new(config.base_api.clone(), config.login_endpoint.clone());
        let (manager, events) = ConnectionManager::new();
        Self {
            config,
            api,
            manager,
            events,
            token,
        }
    }

    /// Run the console until the operator quits
    pub async fn run(mut self) -> anyhow::Result<()> {
        println!("Server: {}", self.config.websocket_url);
        println!("API:    {}", self.config.base_api);
        println!("Type 'help' for commands.");

        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || read_lines(line_tx));

        let mut state_rx = self.manager.subscribe_state();
        tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                let state = *state_rx.borrow();
                debug!("Connection state: {}", state);
            }
        });

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(message) => render(&message),
                        None => break,
                    }
                }
                line = line_rx.recv() => {
                    match line {
                        Some(line) => {
                            if !self.handle_line(&line).await {
                                break;
                            }
                        }
                        // Prompt thread ended (Ctrl-D)
                        None => break,
                    }
                }
            }
        }

        self.manager.disconnect();
        Ok(())
    }

    /// Handle one prompt line; returns false when the operator quits
    async fn handle_line(&mut self, line: &str) -> bool {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                return true;
            }
        };
        debug!("Operator command: {:?}", command);

        match command {
            Command::Quit => return false,
            Command::Help => println!("{}", HELP_TEXT),
            Command::Status => println!("State: {}", self.manager.state()),
            Command::Login {
                username,
                password,
                remember_me,
            } => self.login(username, password, remember_me).await,
            Command::Token { token } => self.set_token(token),
            Command::Whoami => self.whoami(),
            Command::Connect { url } => self.connect(url).await,
            Command::Disconnect => self.manager.disconnect(),
            Command::Create {
                max_players,
                bet_value,
                password,
            } => {
                let mut data = json!({
                    "max_players": max_players,
                    "is_public": password.is_none(),
                    "bet_value": bet_value,
                });
                if let Some(password) = password {
                    data["password"] = json!(password);
                }
                self.request("room", "create_room_request", data).await;
            }
            Command::Join { room_id, password } => {
                let mut data = json!({ "room_id": room_id });
                if let Some(password) = password {
                    data["password"] = json!(password);
                }
                self.request("room", "join_room_request", data).await;
            }
            Command::Leave { room_id } => self.leave(room_id).await,
            Command::Rooms => {
                self.request("room", "get_room_list_request", json!({})).await;
            }
            Command::Room => match self.manager.room().await {
                Some(room) => println!("{}", pretty(&json!(room))),
                None => println!("Not in a room"),
            },
            Command::Wallet => self.wallet().await,
            Command::Deposit {
                amount,
                user_id,
                metadata,
            } => self.deposit(amount, user_id, metadata).await,
            Command::Send {
                namespace,
                event,
                data,
            } => self.request(&namespace, &event, data).await,
        }

        true
    }

    async fn login(&mut self, username: String, password: String, remember_me: bool) {
        println!("Logging in...");
        match self
            .api
            .login(&LoginRequest::new(username, password, remember_me))
            .await
        {
            Ok(outcome) => {
                println!("Access token retrieved via {}", outcome.endpoint);
                self.set_token(outcome.access_token);
            }
            Err(e) => println!("{}", e),
        }
    }

    fn set_token(&mut self, token: String) {
        if let Some(identity) = jwt::inspect(&token) {
            println!(
                "Identity: {} (user id {})",
                identity.username.as_deref().unwrap_or("N/A"),
                identity.user_id.as_deref().unwrap_or("N/A"),
            );
        }
        self.token = Some(token);
    }

    fn whoami(&self) {
        match self.token.as_deref() {
            None => println!("No token set. Use 'login' or 'token' first."),
            Some(token) => match jwt::decode_payload(token) {
                Some(payload) => println!("{}", pretty(&payload)),
                None => println!("Token payload could not be decoded"),
            },
        }
    }

    async fn connect(&self, url: Option<String>) {
        let url = url.unwrap_or_else(|| self.config.websocket_url.clone());
        let token = self.token.clone().unwrap_or_default();
        if let Err(e) = self.manager.connect(&url, &token).await {
            println!("{}", e);
        }
    }

    async fn leave(&self, room_id: Option<String>) {
        let current = self.manager.room().await.and_then(|room| room.id);
        match room_id.or(current) {
            Some(room_id) => {
                self.request("room", "leave_room_request", json!({ "room_id": room_id }))
                    .await;
            }
            None => println!("Not in a room. Pass a room id to leave explicitly."),
        }
    }

    async fn wallet(&self) {
        let token = match self.token.as_deref() {
            Some(token) => token,
            None => {
                println!("No token set. Use 'login' or 'token' first.");
                return;
            }
        };
        match self.api.create_balance(token).await {
            Ok(body) => println!("Wallet created: {}", pretty(&body)),
            Err(e) => println!("{}", e),
        }
    }

    async fn deposit(&self, amount: f64, user_id: Option<String>, metadata: Option<Value>) {
        let token = match self.token.as_deref() {
            Some(token) => token,
            None => {
                println!("No token set. Use 'login' or 'token' first.");
                return;
            }
        };

        // Fall back to the user id carried by the token itself
        let user_id = user_id
            .or_else(|| jwt::inspect(token).and_then(|identity| identity.user_id))
            .unwrap_or_else(|| "string".to_string());

        let mut deposit = DepositRequest::new(amount, user_id, "string");
        if let Some(metadata) = metadata {
            deposit = deposit.with_metadata(metadata);
        }

        match self.api.credit(token, &deposit).await {
            Ok(body) => println!("Deposit accepted: {}", pretty(&body)),
            Err(e) => println!("{}", e),
        }
    }

    async fn request(&self, namespace: &str, event: &str, data: Value) {
        let request = OutboundRequest::new(namespace, event, data);
        if let Err(e) = self.manager.send(request, true).await {
            println!("{}", e);
        }
    }
}

/// Render one feed message to the terminal
fn render(message: &DisplayMessage) {
    let tag = match message.category {
        MessageCategory::Sent => "SENT",
        MessageCategory::Received => "RECV",
        MessageCategory::Error => "ERROR",
        MessageCategory::Broadcast => "BCAST",
    };
    println!(
        "[{}] [{:5}] {}",
        message.timestamp.format("%H:%M:%S"),
        tag,
        pretty(&message.content)
    );
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Blocking prompt loop; forwards each line into the async side
fn read_lines(tx: mpsc::UnboundedSender<String>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to start the prompt: {}", e);
            return;
        }
    };

    loop {
        match editor.readline("room> ") {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Prompt error: {}", e);
                break;
            }
        }
    }
}
