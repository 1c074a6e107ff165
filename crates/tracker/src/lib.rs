//! Asynchronous generation job tracking.
//!
//! The provider acknowledges requests but never reports completion, so
//! completion is inferred: the [`BaselineSnapshotter`] counts matching
//! ledger items before submission, the [`SubmissionGateway`] fires the
//! request, and the [`PollingScheduler`] re-lists the ledger through the
//! [`CompletionDetector`] until enough new items appear or the attempt
//! budget runs out. [`JobRegistry`] ties these together, one job per
//! context id.
//!
//! Only the snapshotter and detector know how completion is observed;
//! swapping them for a real status channel leaves the rest untouched.

pub mod detector;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod testing;

pub use detector::{CompletionDetector, Detection};
pub use error::TrackerError;
pub use gateway::{Acknowledgement, HttpGateway, SubmissionGateway};
pub use ledger::{ContentLedger, LedgerError, PgContentLedger};
pub use registry::{JobHandle, JobRegistry};
pub use scheduler::PollingScheduler;
pub use snapshot::{Baseline, BaselineSnapshotter};
