//! Shared application state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::bridge::CallBridge;
use crate::core::call_control::{CallControl, UnconfiguredCallControl, VobizCallControl};
use crate::core::realtime::create_connector;
use crate::core::tools::{CustomerInfoTool, EndCallTool, ToolDispatcher};
use crate::core::transcript::{TranscriptPipeline, TranscriptStore};
use crate::errors::app_error::AppError;

/// Application state shared by every handler.
pub struct AppState {
    pub config: ServerConfig,
    pub bridge: Arc<CallBridge>,
    active_calls: Arc<AtomicUsize>,
}

impl AppState {
    /// Build the bridge and its collaborators from configuration.
    ///
    /// Must be called inside a Tokio runtime; the transcript consumer task is
    /// spawned here.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, AppError> {
        let connector = create_connector(&config).map_err(|e| AppError::Internal(e.to_string()))?;

        let call_control: Arc<dyn CallControl> =
            match (&config.vobiz_auth_id, &config.vobiz_auth_token) {
                (Some(auth_id), Some(auth_token)) => Arc::new(
                    VobizCallControl::new(&config.vobiz_api_url, auth_id, auth_token)
                        .map_err(|e| AppError::Internal(e.to_string()))?,
                ),
                _ => {
                    warn!("Vobiz credentials not configured; call_end will report an error");
                    Arc::new(UnconfiguredCallControl)
                }
            };

        let tools = ToolDispatcher::new()
            .with_handler(Arc::new(CustomerInfoTool::new(config.customer.clone())))
            .with_handler(Arc::new(EndCallTool::new(call_control)));

        let transcripts = Arc::new(TranscriptPipeline::spawn(
            TranscriptStore::new(config.transcript_ttl()),
            config.transcript_queue_capacity,
        ));

        let bridge = Arc::new(CallBridge::new(
            connector,
            Arc::new(tools),
            transcripts,
            config.bridge_config(),
        ));

        info!(
            provider = bridge.provider_name(),
            max_concurrent_calls = ?config.max_concurrent_calls,
            "Application state initialized"
        );

        Ok(Arc::new(Self {
            config,
            bridge,
            active_calls: Arc::new(AtomicUsize::new(0)),
        }))
    }

    /// Number of calls currently bridged.
    pub fn active_calls(&self) -> usize {
        self.active_calls.load(Ordering::Acquire)
    }

    /// Reserve a slot for a new call, honoring `max_concurrent_calls`.
    ///
    /// The slot is released when the returned guard is dropped.
    pub fn try_acquire_call(&self) -> Result<CallSlot, AppError> {
        let limit = self.config.max_concurrent_calls;
        let acquired = self
            .active_calls
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match limit {
                Some(max) if current >= max => None,
                _ => Some(current + 1),
            });

        match acquired {
            Ok(_) => Ok(CallSlot {
                active_calls: self.active_calls.clone(),
            }),
            Err(current) => Err(AppError::CapacityExceeded(format!(
                "{current} calls already active"
            ))),
        }
    }
}

/// Reservation of one concurrent call.
#[derive(Debug)]
pub struct CallSlot {
    active_calls: Arc<AtomicUsize>,
}

impl Drop for CallSlot {
    fn drop(&mut self) {
        self.active_calls.fetch_sub(1, Ordering::AcqRel);
    }
}
