mod card;
mod context;
mod expansion;
mod gesture;
mod message;
mod reconcile;
mod service;
pub mod state;
mod tree;

pub use card::Card;
pub use card::Frame;
pub use card::Paint;
pub use card::RowRef;
pub use card::RowView;
pub use card::Zone;
pub use context::CardContext;
pub use expansion::Expansion;
pub use expansion::ExpansionCache;
pub use expansion::ExpansionRecord;
pub use gesture::Commit;
pub use gesture::DragSession;
pub use gesture::DragSessions;
pub use gesture::GestureEffect;
pub use gesture::TrackBounds;
pub use gesture::TAP_SLOP_PX;
pub use message::Notification;
pub use message::ServiceAction;
pub use message::ServiceCall;
pub use message::Target;
pub use reconcile::ControlVisual;
pub use reconcile::Gradient;
pub use reconcile::Palette;
pub use reconcile::Reconciled;
pub use reconcile::RenderSignature;
pub use reconcile::aggregate;
pub use reconcile::format_lux;
pub use reconcile::reconcile;
pub use service::ChannelService;
pub use service::ControlService;
pub use service::Outbound;
pub use service::OutboundQueue;
pub use service::OutboundReceiver;
pub use service::OutboundSender;
pub use service::ServiceError;
pub use state::EntityState;
pub use state::LightEntity;
pub use state::StateSnapshot;
pub use tree::ControlKey;
pub use tree::EntityTree;
pub use tree::GroupId;
pub use tree::GroupKind;
pub use tree::GroupNode;
pub use tree::ResolvedMember;
