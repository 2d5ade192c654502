//! # Protocol Lifecycle
//!
//! The state machine coordinating configuration, transport, and shutdown.
//!
//! ## States
//! ```text
//! NEW --configure()--> CONFIGURED --initialize()--> RUNNING --shutdown()--> STOPPED
//! ```
//!
//! - `configure()` loads the static key-value file, then merges the table
//!   returned by the first script pass (`rcp1.lua_config`).
//! - `initialize()` unconditionally merges a second, fixed script pass
//!   (`lua/rcp1_init.lua`) into the same logical map, then binds the
//!   listener on `rcp1.port`.
//! - `send()`/`receive()` require the `RUNNING` state and fail fast with a
//!   lifecycle error otherwise.
//! - `shutdown()` is safe to call redundantly and from any state.
//!
//! Every operation blocks its caller for its full duration; there are no
//! internal worker tasks. A `receive()` blocked on an idle listener is
//! interrupted by calling `shutdown()` from another task, which fires the
//! protocol's cancellation token and closes the listening socket.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::config::script::{LuaConfigSource, ScriptConfigSource};
use crate::config::{ConfigStore, DEFAULT_CONFIG_PATH, INIT_SCRIPT};
use crate::error::{constants, ProtocolError, Result};
use crate::transport::{send_frame, FrameListener};

/// Lifecycle states of an RCP1 protocol instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, not yet configured.
    New,
    /// Configuration loaded and merged; listener not yet bound.
    Configured,
    /// Listener bound; send/receive available.
    Running,
    /// Shut down; terminal.
    Stopped,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::New => "new",
            LifecycleState::Configured => "configured",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A point-to-point RCP1 protocol instance.
///
/// Owns the configuration snapshot, the optional listening socket (present
/// only while `RUNNING`), and the lifecycle state. All methods take `&self`;
/// share the instance behind an [`Arc`] to drive `receive()` and
/// `shutdown()` from different tasks.
///
/// The configuration is rebuilt as an immutable snapshot once per lifecycle
/// phase: the file-plus-script merge at `configure()`, and the init-script
/// merge at `initialize()`.
pub struct Rcp1Protocol {
    state: Mutex<LifecycleState>,
    config: RwLock<Arc<ConfigStore>>,
    script_source: Box<dyn ScriptConfigSource>,
    listener: Mutex<Option<Arc<FrameListener>>>,
    cancel: CancellationToken,
}

impl Default for Rcp1Protocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Rcp1Protocol {
    /// Create a protocol instance backed by the embedded Lua interpreter.
    pub fn new() -> Self {
        Self::with_script_source(Box::new(LuaConfigSource::new()))
    }

    /// Create a protocol instance with a custom script-driven override source.
    pub fn with_script_source(script_source: Box<dyn ScriptConfigSource>) -> Self {
        Self {
            state: Mutex::new(LifecycleState::New),
            config: RwLock::new(Arc::new(ConfigStore::new())),
            script_source,
            listener: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Result<Arc<ConfigStore>> {
        Ok(self
            .config
            .read()
            .map_err(|_| ProtocolError::Custom(constants::ERR_CONFIG_LOCK.to_string()))?
            .clone())
    }

    /// Address of the bound listening socket, present only while `RUNNING`.
    pub fn local_addr(&self) -> Result<Option<SocketAddr>> {
        let guard = self
            .listener
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_LISTENER_LOCK.to_string()))?;
        match guard.as_ref() {
            Some(listener) => Ok(Some(listener.local_addr()?)),
            None => Ok(None),
        }
    }

    /// Load the static config file, then merge the first script pass.
    ///
    /// `path` defaults to `/etc/zamarine/rcp1/config.ini`. The script
    /// resource is taken from the just-loaded `rcp1.lua_config` key (default
    /// `lua/rcp1_config.lua`); a script that yields a non-table result is a
    /// silent no-op. Must be called before [`initialize`](Self::initialize).
    #[instrument(skip(self, path))]
    pub fn configure(&self, path: Option<&Path>) -> Result<()> {
        self.expect_state(LifecycleState::New, "configure")?;

        let file_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut store = ConfigStore::new();
        store.load_file(&file_path)?;

        let script = store.script_path().to_owned();
        if let Some(table) = self.script_source.load(Path::new(&script))? {
            store.merge(table);
        }

        self.publish_config(store)?;
        self.transition(LifecycleState::Configured)?;
        info!(path = %file_path.display(), script = %script, "RCP1 protocol configured");
        Ok(())
    }

    /// Merge the fixed init script pass, then bind the listener.
    ///
    /// `lua/rcp1_init.lua` is loaded unconditionally, regardless of what
    /// `configure()` already loaded, and can add or override keys from the
    /// first pass. The listener binds on all interfaces at `rcp1.port`
    /// (default 8080).
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        self.expect_state(LifecycleState::Configured, "initialize")?;

        let mut store = self.config()?.as_ref().clone();
        if let Some(table) = self.script_source.load(Path::new(INIT_SCRIPT))? {
            store.merge(table);
        }

        let port = store.port()?;
        self.publish_config(store)?;

        let listener = FrameListener::bind(port).await?;
        *self
            .listener
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_LISTENER_LOCK.to_string()))? =
            Some(Arc::new(listener));

        self.transition(LifecycleState::Running)?;
        info!(port, "RCP1 protocol initialized");
        Ok(())
    }

    /// Push one framed message to `destination` on the configured port.
    ///
    /// One fresh connection, one frame, one attempt.
    pub async fn send(&self, data: &[u8], destination: &str) -> Result<()> {
        self.expect_state(LifecycleState::Running, "send")?;
        let port = self.config()?.port()?;
        send_frame(destination, port, data).await
    }

    /// Block until one inbound message arrives and return its payload.
    ///
    /// Exactly one message per call. A failed receive leaves the listener
    /// bound and the protocol `RUNNING`. A call blocked with no pending
    /// connection returns [`ProtocolError::Cancelled`] once
    /// [`shutdown`](Self::shutdown) runs from another task.
    pub async fn receive(&self) -> Result<Bytes> {
        self.expect_state(LifecycleState::Running, "receive")?;

        let listener = self
            .listener
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_LISTENER_LOCK.to_string()))?
            .clone()
            .ok_or(ProtocolError::InvalidState {
                operation: "receive",
                state: LifecycleState::Running,
            })?;

        listener.receive(&self.cancel).await
    }

    /// Stop the protocol, closing the listening socket if it is open.
    ///
    /// Fires the cancellation token first so a `receive()` blocked on an
    /// idle listener wakes promptly. Safe to call more than once and from
    /// any state; closing a never-opened socket is a no-op.
    #[instrument(skip(self))]
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_STATE_LOCK.to_string()))?;

        self.cancel.cancel();

        let listener = self
            .listener
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_LISTENER_LOCK.to_string()))?
            .take();
        drop(listener);

        if *state != LifecycleState::Stopped {
            info!("RCP1 protocol stopped");
        }
        *state = LifecycleState::Stopped;
        Ok(())
    }

    /// Replace the configuration snapshot for the current lifecycle phase.
    fn publish_config(&self, store: ConfigStore) -> Result<()> {
        *self
            .config
            .write()
            .map_err(|_| ProtocolError::Custom(constants::ERR_CONFIG_LOCK.to_string()))? =
            Arc::new(store);
        Ok(())
    }

    fn expect_state(&self, expected: LifecycleState, operation: &'static str) -> Result<()> {
        let state = self.state();
        if state != expected {
            return Err(ProtocolError::InvalidState { operation, state });
        }
        Ok(())
    }

    fn transition(&self, next: LifecycleState) -> Result<()> {
        *self
            .state
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_STATE_LOCK.to_string()))? = next;
        Ok(())
    }
}

impl std::fmt::Debug for Rcp1Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rcp1Protocol")
            .field("state", &self.state())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
