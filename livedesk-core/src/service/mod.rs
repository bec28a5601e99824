//! Service layer: status checks, the poller, lifecycle orchestration and
//! operation dispatch

pub mod busy;
pub mod dispatch;
pub mod lifecycle;
pub mod poller;
pub mod status;

pub use busy::{BusyGuard, BusyTracker};
pub use dispatch::{Confirmer, DispatchOutcome, FollowUp, Notifier, Operation, OperationDispatch, Prompt};
pub use lifecycle::{
    playout_formats, sync_audio_tracks, ConfigureOptions, CopyOutcome, CopyToVodOptions,
    CreateStreamRequest, CreatedStream, LifecycleService, PlayoutOutcome, PlayoutSettings,
    RecordingCopies, SiteRef, StreamLocation, WatermarkChange, DEFAULT_FAN_OUT,
};
pub use poller::{PollerHandle, StatusPoller, SweepReport, SweepTrigger};
pub use status::{StatusCheck, StatusService};
