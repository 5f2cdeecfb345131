//! Custom action dispatch
//!
//! Minigames and other bespoke interactions live outside the engine. Playback
//! hands `RunCustom` actions to a dispatcher and waits for it to finish.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CustomActionError;
use crate::types::{EngineState, GameState};

/// Runs `RunCustom` actions during playback.
///
/// The returned value is informational: playback logs it and carries on. It
/// never changes live state or picks a branch, and a `run_custom` call ends
/// its script pass, so nothing authored after it depends on the result.
#[async_trait]
pub trait CustomActionDispatcher: Send + Sync {
    /// Run the custom action `id`. The states are read-only views of live state.
    async fn execute(
        &self,
        id: &str,
        args: &serde_json::Value,
        engine: &EngineState,
        game: &GameState,
    ) -> Result<serde_json::Value, CustomActionError>;
}

/// Dispatcher for content without custom actions
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCustomActions;

#[async_trait]
impl CustomActionDispatcher for NoCustomActions {
    async fn execute(
        &self,
        id: &str,
        _args: &serde_json::Value,
        _engine: &EngineState,
        _game: &GameState,
    ) -> Result<serde_json::Value, CustomActionError> {
        Err(CustomActionError::Unknown(id.to_string()))
    }
}

type Handler =
    Arc<dyn Fn(&serde_json::Value, &GameState) -> Result<serde_json::Value, CustomActionError> + Send + Sync>;

/// Dispatcher backed by synchronous handlers registered by id
#[derive(Default, Clone)]
pub struct CustomActionTable {
    handlers: HashMap<String, Handler>,
}

impl CustomActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&serde_json::Value, &GameState) -> Result<serde_json::Value, CustomActionError>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(id.into(), Arc::new(handler));
        self
    }
}

#[async_trait]
impl CustomActionDispatcher for CustomActionTable {
    async fn execute(
        &self,
        id: &str,
        args: &serde_json::Value,
        _engine: &EngineState,
        game: &GameState,
    ) -> Result<serde_json::Value, CustomActionError> {
        let handler = self
            .handlers
            .get(id)
            .ok_or_else(|| CustomActionError::Unknown(id.to_string()))?;
        handler(args, game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_custom_actions_rejects_everything() {
        let result = NoCustomActions
            .execute("dice", &serde_json::Value::Null, &EngineState::new(), &GameState::new())
            .await;
        assert_eq!(result, Err(CustomActionError::Unknown("dice".into())));
    }

    #[tokio::test]
    async fn table_routes_by_id() {
        let table = CustomActionTable::new().register("double", |args, _| {
            let n = args.as_i64().ok_or_else(|| CustomActionError::InvalidArgs {
                id: "double".into(),
                reason: "expected a number".into(),
            })?;
            Ok(serde_json::json!(n * 2))
        });

        let ok = table
            .execute("double", &serde_json::json!(21), &EngineState::new(), &GameState::new())
            .await;
        assert_eq!(ok, Ok(serde_json::json!(42)));

        let bad = table
            .execute("double", &serde_json::json!("x"), &EngineState::new(), &GameState::new())
            .await;
        assert!(matches!(bad, Err(CustomActionError::InvalidArgs { .. })));
    }
}
