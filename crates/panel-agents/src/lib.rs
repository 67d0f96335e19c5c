//! Panel agents: persona-driven generation backends, JSONL persistence
//! sinks, and the CLI wiring for the consensus engine.

pub mod backend;
pub mod config;
pub mod context;
pub mod personas;
pub mod sinks;

pub use backend::{parse_bundle, BackendError, HttpGenerationBackend};
pub use config::{Endpoint, PanelConfig};
pub use context::FileContextProvider;
pub use personas::{system_prompt, user_prompt, Persona, PROMPT_VERSION};
pub use sinks::{JsonlConsensusSink, JsonlShadowSink};
