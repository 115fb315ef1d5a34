// Workflow orchestration - session state machine and the launch runner
pub mod state;
pub mod runner;

pub use state::{
    download_file_name, LaunchRefusal, LaunchTicket, Mode, ProcessedResult, ProcessingStatus,
    ResultKind, Session, SourceAsset,
};
pub use runner::{SharedSession, Workflow};
