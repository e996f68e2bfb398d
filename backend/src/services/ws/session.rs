use crate::notifications::{task_channel, NotificationHub, Subscription, RESULTS_CHANNEL};
use actix_web::{rt, web, HttpRequest, HttpResponse};
use actix_ws::{CloseReason, Message, MessageStream, Session};
use futures_util::StreamExt;
use log::{debug, error, warn};

pub(crate) async fn task_updates(
    req: HttpRequest,
    body: web::Payload,
    task_id: web::Path<String>,
    hub: web::Data<NotificationHub>,
) -> actix_web::Result<HttpResponse> {
    start(req, body, hub.get_ref().clone(), task_channel(&task_id))
}

pub(crate) async fn result_updates(
    req: HttpRequest,
    body: web::Payload,
    hub: web::Data<NotificationHub>,
) -> actix_web::Result<HttpResponse> {
    start(req, body, hub.get_ref().clone(), RESULTS_CHANNEL.to_string())
}

/// Completes the handshake, then subscribes and forwards events until either
/// side closes.
fn start(
    req: HttpRequest,
    body: web::Payload,
    hub: NotificationHub,
    key: String,
) -> actix_web::Result<HttpResponse> {
    let (response, session, messages) = actix_ws::handle(&req, body)?;
    let subscription = hub.subscribe(key);
    debug!(
        "WebSocket subscribed to '{}' ({} listeners)",
        subscription.key(),
        hub.subscriber_count(subscription.key())
    );
    rt::spawn(forward(hub, subscription, session, messages));
    Ok(response)
}

async fn forward(
    hub: NotificationHub,
    mut subscription: Subscription,
    mut session: Session,
    mut messages: MessageStream,
) {
    let reason: Option<CloseReason> = loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break None };
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if session.text(text).await.is_err() {
                            break None;
                        }
                    }
                    Err(e) => error!("Could not serialize event for task {}: {}", event.task_id, e),
                }
            }
            message = messages.next() => match message {
                Some(Ok(Message::Ping(bytes))) => {
                    if session.pong(&bytes).await.is_err() {
                        break None;
                    }
                }
                Some(Ok(Message::Close(reason))) => break reason,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket protocol error: {}", e);
                    break None;
                }
                None => break None,
            }
        }
    };

    debug!("WebSocket on '{}' closed", subscription.key());
    hub.unsubscribe(subscription);
    let _ = session.close(reason).await;
}

#[cfg(test)]
mod tests {
    use crate::notifications::{task_channel, NotificationHub};
    use crate::services::ws::configure_routes;
    use actix_web::{web, App};
    use awc::ws;
    use common::jobs::TaskState;
    use common::model::notification::NotificationEvent;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use std::time::Duration;

    #[actix_web::test]
    async fn task_socket_forwards_events_and_unsubscribes_on_close() {
        let hub = NotificationHub::new(8);
        let app_hub = hub.clone();
        let mut srv = actix_test::start(move || {
            App::new()
                .app_data(web::Data::new(app_hub.clone()))
                .service(configure_routes())
        });

        let channel = task_channel("t1");
        let mut socket = srv.ws_at("/ws/tasks/t1/").await.unwrap();
        assert_eq!(hub.subscriber_count(&channel), 1);

        let delivered = hub.publish(&channel, &NotificationEvent::new("t1", TaskState::Started));
        assert_eq!(delivered, 1);

        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let ws::Frame::Text(text) = frame else {
            panic!("expected a text frame, got {frame:?}");
        };
        let event: Value = serde_json::from_slice(&text).unwrap();
        assert_eq!(
            event,
            json!({ "status": "STARTED", "task_id": "t1", "result": null })
        );

        socket
            .send(ws::Message::Close(Some(ws::CloseCode::Normal.into())))
            .await
            .unwrap();
        for _ in 0..200 {
            if hub.subscriber_count(&channel) == 0 {
                break;
            }
            actix_web::rt::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(hub.subscriber_count(&channel), 0);

        srv.stop().await;
    }
}
