// skugen: Layers 2–4 — registry, session, transport, pipeline stages, generator
#![allow(clippy::result_large_err)]

pub mod catalog_data;
pub mod correct;
pub mod generator;
pub mod mock;
pub mod prompt;
pub mod reconcile;
pub mod session;
pub mod settings;
pub mod task;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod util;
pub mod validate;

// --- Curated re-exports from skugen-types (Layer 1) ---
pub use skugen_types::{
    // Type aliases
    BoxFuture,
    BoxStream,
    // Chat wire types
    ChatMessage,
    ChatRequest,
    ChatRole,
    // Transport trait
    ChatTransport,
    // Data model
    ColumnSet,
    // Errors
    Error,
    ErrorKind,
    // Config
    GenerationLimits,
    GenerationParams,
    GenerationRequest,
    ModelEndpoint,
    // Progress
    OnProgress,
    ProgressEvent,
    RetryPolicy,
    Row,
    RowBatch,
    Stage,
    TransportTimeout,
    ignore_progress,
};

pub use catalog_data::{DEFAULT_MODEL, ModelRegistry};
pub use generator::Generator;
pub use session::ClientSession;
pub use settings::Settings;
pub use task::{GenerationJob, GenerationTask, spawn_generation};
pub use transport::{HttpTransport, HttpTransportBuilder};

// Pipeline stages at crate root.
pub use correct::correct_row_count;
pub use reconcile::{BraceCounter, StructureTracker, extract_json_array, reconcile, reconcile_with};
pub use validate::{into_row_batch, validate_batch};

// Retry utility at crate root.
pub use util::retry::with_retry;
