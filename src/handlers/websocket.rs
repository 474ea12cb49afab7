use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_ws::Message;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    #[serde(default)]
    group: Option<String>,
}

/// `GET /chat/{username}`: upgrade to a WebSocket session for `username`.
pub async fn chat_handler(
    req: HttpRequest,
    body: web::Payload,
    path: web::Path<String>,
    query: web::Query<ConnectQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let username = path.into_inner();
    let group = query.into_inner().group.filter(|g| !g.is_empty());

    info!(
        "WebSocket connection request from {} (group: {:?})",
        username, group
    );

    let (response, session, mut msg_stream) = actix_ws::handle(&req, body)?;

    let registration = data.sessions.register(&username, group);
    let handle = registration.handle;
    let mut outbound = registration.receiver;

    let mut writer_session = session.clone();
    let writer_sessions = data.sessions.clone();
    let writer_username = username.clone();
    actix_web::rt::spawn(async move {
        while let Some(message) = outbound.recv().await {
            if let Err(err) = writer_session.text(message).await {
                writer_sessions.disconnect_on_error(&writer_username, &format!("{:?}", err));
                break;
            }
        }
        let _ = writer_session.close(None).await;
        debug!("Writer stopped for {}", writer_username);
    });

    let mut reader_session = session;
    let sessions = data.sessions.clone();
    let router = data.router.clone();
    actix_web::rt::spawn(async move {
        let mut failure = None;
        while let Some(frame) = msg_stream.recv().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Err(err) = router.handle_frame(&username, &text) {
                        warn!("Discarding message from {}: {}", username, err);
                    }
                }
                Ok(Message::Ping(bytes)) => {
                    let _ = reader_session.pong(&bytes).await;
                }
                Ok(Message::Close(reason)) => {
                    debug!("Close frame from {}: {:?}", username, reason);
                    break;
                }
                Ok(Message::Binary(_)) => {
                    debug!("Ignoring binary frame from {}", username);
                }
                Ok(_) => {}
                Err(err) => {
                    failure = Some(err.to_string());
                    break;
                }
            }
        }

        match failure {
            Some(cause) => {
                sessions.disconnect_on_error(&username, &cause);
            }
            None => {
                sessions.disconnect(&username, &handle);
            }
        }
        info!("WebSocket closed for {}", username);
    });

    Ok(response)
}
