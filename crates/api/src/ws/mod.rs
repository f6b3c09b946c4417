//! Websocket layer: wire events, connection registry, session hub and
//! the axum upgrade handler.

mod connection;
mod events;
mod handler;
mod hub;
mod registry;

pub use connection::Connection;
pub use events::{
    ChatMessageData, ClientEvent, MessageEvent, ParticipantKind, PresenceData, ServerEvent,
    SessionEndedData, TransferData, TransferNotice,
};
pub use handler::ws_handler;
pub use hub::SessionHub;
pub use registry::{Binding, ConnectionRegistry};
