pub mod bridge;
pub mod call_control;
pub mod codec;
pub mod realtime;
pub mod telephony;
pub mod tools;
pub mod transcript;
pub mod turn;

// Re-export commonly used types for convenience
pub use bridge::{BridgeConfig, BridgeError, CallBridge, CallSummary, EndReason};

pub use codec::{AudioFormat, CodecError, Encoding, MediaFrame};

pub use realtime::{
    BoxedConnector, RealtimeConnector, RealtimeError, RealtimeEvent, RealtimeProvider,
    RealtimeResult, RealtimeSender, SessionSetup, create_connector,
    get_supported_realtime_providers,
};

pub use telephony::{InboundEvent, OutboundEvent, TelephonyError, TelephonySink, TelephonySource};

pub use tools::{ToolDispatcher, ToolInvocation, ToolResult};

pub use transcript::{Role, TranscriptPipeline, TranscriptSink, TranscriptStore, Utterance};

pub use turn::{TurnPhase, TurnState};
