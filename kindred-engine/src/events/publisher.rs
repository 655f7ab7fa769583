use serde::Serialize;
use uuid::Uuid;

use kindred_shared::clients::bus::EventBus;
use kindred_shared::types::event::{payloads, routing_keys, Event};

const SOURCE: &str = "kindred-engine";

// Publishers run after the owning transaction committed. The broker
// round-trip happens on a spawned task so response latency never depends on
// it; a publish failure is logged and swallowed, never bubbled into the
// response.
fn send<T: Serialize + Send + Sync + 'static>(bus: &EventBus, routing_key: &'static str, event: Event<T>) {
    let bus = bus.clone();
    tokio::spawn(async move {
        if let Err(e) = bus.publish(routing_key, &event).await {
            tracing::error!(error = %e, routing_key, "bus publish failed");
        }
    });
}

pub fn swipe_recorded(
    bus: &EventBus,
    swipe_id: Uuid,
    swiper_id: Uuid,
    target_id: Uuid,
    action: &str,
    is_match: bool,
) {
    let key = routing_keys::SOCIAL_SWIPE_RECORDED;
    let event = Event::new(
        SOURCE,
        key,
        payloads::SwipeRecorded {
            swipe_id,
            swiper_id,
            target_id,
            action: action.to_string(),
            is_match,
        },
    )
    .actor(swiper_id);

    send(bus, key, event);
}

pub fn friendship_created(bus: &EventBus, friendship_id: Uuid, user_a_id: Uuid, user_b_id: Uuid) {
    let key = routing_keys::SOCIAL_FRIENDSHIP_CREATED;
    let event = Event::new(
        SOURCE,
        key,
        payloads::FriendshipCreated {
            friendship_id,
            user_a_id,
            user_b_id,
        },
    )
    .actor(user_a_id);

    send(bus, key, event);
}

pub fn request_created(bus: &EventBus, request_id: Uuid, event_id: Uuid, user_id: Uuid, host_id: Uuid) {
    let key = routing_keys::EVENTS_REQUEST_CREATED;
    let event = Event::new(
        SOURCE,
        key,
        payloads::JoinRequestCreated {
            request_id,
            event_id,
            user_id,
            host_id,
        },
    )
    .actor(user_id);

    send(bus, key, event);
}

pub fn request_accepted(
    bus: &EventBus,
    request_id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    participant_count: i64,
    event_full: bool,
) {
    let key = routing_keys::EVENTS_REQUEST_ACCEPTED;
    let event = Event::new(
        SOURCE,
        key,
        payloads::JoinRequestAccepted {
            request_id,
            event_id,
            user_id,
            participant_count,
            event_full,
        },
    )
    .actor(user_id);

    send(bus, key, event);
}

pub fn request_rejected(bus: &EventBus, request_id: Uuid, event_id: Uuid, user_id: Uuid) {
    let key = routing_keys::EVENTS_REQUEST_REJECTED;
    let event = Event::new(
        SOURCE,
        key,
        payloads::JoinRequestRejected {
            request_id,
            event_id,
            user_id,
        },
    )
    .actor(user_id);

    send(bus, key, event);
}

pub fn participant_left(
    bus: &EventBus,
    event_id: Uuid,
    user_id: Uuid,
    participant_count: i64,
    event_reopened: bool,
) {
    let key = routing_keys::EVENTS_PARTICIPANT_LEFT;
    let event = Event::new(
        SOURCE,
        key,
        payloads::ParticipantLeft {
            event_id,
            user_id,
            participant_count,
            event_reopened,
        },
    )
    .actor(user_id);

    send(bus, key, event);
}
