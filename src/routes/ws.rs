//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::{ClientWsMessage, ErrorOut, ServerWsMessage};
use crate::state::AppState;
use crate::util::new_request_id;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "speakup_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "speakup_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => handle_client_ws(incoming, &state).await,
          Err(e) => ServerWsMessage::Error(ErrorOut {
            kind: "invalid_input".into(),
            message: format!("Invalid JSON: {}", e),
            request_id: String::new(),
          }),
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "kind": "serialization", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "speakup_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "speakup_backend", "WebSocket disconnected");
}

fn error_msg(e: ApiError) -> ServerWsMessage {
  ServerWsMessage::Error(ErrorOut {
    kind: e.kind().to_string(),
    message: e.error.to_string(),
    request_id: e.request_id,
  })
}

#[instrument(level = "info", skip_all)]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  let request_id = new_request_id();
  debug!(target: "speakup_backend", %request_id, "WS message received");
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::AnalyzeText(input) => match analyze_text(state, &request_id, input).await {
      Ok(report) => ServerWsMessage::Analysis { request_id, report },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::AnalyzeAudio(input) => match analyze_audio(state, &request_id, input).await {
      Ok(report) => ServerWsMessage::Analysis { request_id, report },
      Err(e) => error_msg(e),
    },

    ClientWsMessage::Questions(query) => match next_questions(state, &request_id, query).await {
      Ok(out) => ServerWsMessage::Questions(out),
      Err(e) => error_msg(e),
    },

    ClientWsMessage::UpdateQuestionsConfig(input) => {
      ServerWsMessage::QuestionsConfig(update_questions_config(state, input).await)
    }
  }
}
