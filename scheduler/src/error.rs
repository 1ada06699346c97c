use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("poller is already streaming")]
    AlreadyStreaming,

    #[error("pipeline is closed; no batches can be delivered")]
    PipelineClosed,

    #[error("unknown ordering policy {0:?} (expected \"overlapping\" or \"serialized\")")]
    UnknownOrderingPolicy(String),
}
