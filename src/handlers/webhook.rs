use chrono::Utc;
use serde::{Deserialize, Serialize};
use warp::Filter;

use crate::handlers::inbound::{InboundDeps, handle_inbound_text};

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
struct ReplyBody {
    reply: String,
}

/// Serves the thin webhook surface: `POST /sms` and `POST /chat` both take
/// `{"from": "...", "body": "..."}` and answer with the assistant's reply
/// text. The SMS gateway and the web chat page do their own framing.
pub async fn run_http_server(deps: InboundDeps, port: u16) {
    let sms = route("sms", deps.clone());
    let chat = route("chat", deps);
    warp::serve(sms.or(chat)).run(([0, 0, 0, 0], port)).await;
}

fn route(
    path: &'static str,
    deps: InboundDeps,
) -> impl Filter<Extract = (warp::reply::Json,), Error = warp::Rejection> + Clone {
    warp::post()
        .and(warp::path(path))
        .and(warp::path::end())
        .and(warp::body::json())
        .then(move |message: InboundMessage| {
            let deps = deps.clone();
            async move { handle_inbound(deps, message).await }
        })
}

async fn handle_inbound(deps: InboundDeps, message: InboundMessage) -> warp::reply::Json {
    // The sender's address doubles as the reply chat id for these surfaces.
    let user_id = format!("@{}", message.from);
    let reply = handle_inbound_text(&deps, &user_id, &message.from, &message.body, Utc::now())
        .await
        .unwrap_or_else(|| "Done.".to_string());
    warp::reply::json(&ReplyBody { reply })
}
