//! State machines behind the transmission kiosk.
//!
//! The crate has no knowledge of terminals or HTTP. It owns:
//! - the feed reconciler and its polling task ([`feed`]),
//! - the presentation timeline that choreographs captions, scrolling and the
//!   reveal gate ([`timeline`], [`scroll`]),
//! - the age-based reveal and the mission clock ([`reveal`],
//!   [`mission_clock`]),
//! - readiness tracking for the featured image ([`readiness`]),
//! - cancellable per-frame loops shared by the animations ([`frame_loop`]).

pub mod config;
mod error;
pub mod feed;
pub mod frame_loop;
pub mod mission_clock;
pub mod readiness;
mod record;
pub mod reveal;
pub mod scroll;
pub mod timeline;
pub mod timestamp;

pub use config::KioskConfig;
pub use error::ConfigError;
pub use error::FeedError;
pub use error::LoadError;
pub use feed::FeedReconciler;
pub use feed::FeedSnapshot;
pub use feed::History;
pub use feed::ListingSource;
pub use feed::ReconcileOutcome;
pub use feed::poller::FeedPollerHandle;
pub use feed::poller::spawn_feed_poller;
pub use frame_loop::FrameLoopKind;
pub use frame_loop::FrameLoopSlot;
pub use frame_loop::FrameTick;
pub use mission_clock::MissionClock;
pub use mission_clock::MissionElapsed;
pub use readiness::ReadinessCoordinator;
pub use readiness::ReadinessReport;
pub use readiness::ReadinessStatus;
pub use readiness::ResourceLoader;
pub use record::ImageRecord;
pub use reveal::RevealClock;
pub use reveal::RevealGrid;
pub use reveal::RevealState;
pub use scroll::ScrollProfile;
pub use timeline::CaptionWindow;
pub use timeline::PresentationTimeline;
pub use timeline::TimelineFrame;
pub use timeline::TimelinePhase;
