//! Change notifications for open viewers.
//!
//! When a vote is published or voting closes, the engine publishes a
//! content-free [`Topic`] on a [`Notifier`]. [`FanoutHub`] is the in-process
//! implementation; [`WebSocketServer`] relays its topics to browser clients
//! at `/ws`, who then re-run their own fetch.

pub mod hub;
pub mod server;
pub mod subscriptions;

pub use hub::{FanoutHub, Handler, Notifier, Subscription};
pub use server::WebSocketServer;
pub use subscriptions::{ClientMessage, Notification, ServerMessage, Topic};
