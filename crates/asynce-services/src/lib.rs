//! asynce-services: transfers, the realtime channel, and the group store
//! built on top of the backend's remote-call surface.

pub mod channel;
pub mod chat_store;
pub mod chunk_types;
pub mod coordinator;
pub mod memory;
pub mod progress;
pub mod remote;
pub mod resource;
pub mod session;
pub mod transfer;
pub mod ws;

pub use channel::{ChannelState, Connector, RealtimeChannel, Transport, TransportEvent};
pub use chat_store::ChatStore;
pub use coordinator::{GroupStore, GroupView, MeetingView, StoreUpdate, UserProfile};
pub use progress::Progress;
pub use remote::{Actor, RemoteCall};
pub use session::{Session, SessionContext};
pub use transfer::{ChunkSink, ChunkSource, TransferClient};
pub use ws::WsConnector;
