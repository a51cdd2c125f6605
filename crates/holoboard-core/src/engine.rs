//! Engine lifecycle: activation, deferred loading, persistence and teardown.
//!
//! An engine is either active, owning a [`Registry`] bound to a confirmed
//! [`Host`], or inert because the host lacked a required capability. An inert
//! engine logs one diagnostic at activation and answers every later call with
//! [`Error::EngineInactive`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::config::BoardConfig;
use crate::error::{Error, Result};
use crate::host::{HostBuilder, TaskHandle};
use crate::registry::Registry;
use crate::time::format_ticks;

pub struct Engine {
    config_path: PathBuf,
    registry: Option<Arc<Registry>>,
    config: Mutex<BoardConfig>,
    startup: Mutex<Option<TaskHandle>>,
    loaded: Arc<AtomicBool>,
    /// Why the config file failed to load; saving is refused while set
    load_error: Mutex<Option<String>>,
}

impl Engine {
    /// Activate against `host`, reading boards from `config_path`.
    ///
    /// Boards are installed after the configured `delay_after_enable`, not
    /// immediately. A config file that cannot be read is logged and treated as
    /// empty, and is never overwritten until a [`Engine::reload`] succeeds.
    pub fn enable(host: HostBuilder, config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let mut load_error = None;
        let config = BoardConfig::load(&config_path).unwrap_or_else(|e| {
            warn!("Failed to load {}: {}", config_path.display(), e);
            load_error = Some(e.to_string());
            BoardConfig::default()
        });

        let host = match host.messages(config.messages.clone()).build() {
            Ok(host) => host,
            Err(e) => {
                error!("Holoboard disabled: {}", e);
                return Self {
                    config_path,
                    registry: None,
                    config: Mutex::new(config),
                    startup: Mutex::new(None),
                    loaded: Arc::new(AtomicBool::new(false)),
                    load_error: Mutex::new(load_error),
                };
            }
        };

        let registry = Arc::new(Registry::new(host));
        let delay = config.enable_delay();
        let boards = config.boards.clone();
        let weak: Weak<Registry> = Arc::downgrade(&registry);
        let loaded = Arc::new(AtomicBool::new(false));
        let done = Arc::clone(&loaded);
        let handle = registry.host().scheduler().run_after(
            delay,
            Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    registry.load(&boards);
                    done.store(true, Ordering::SeqCst);
                }
            }),
        );
        info!(
            "Holoboard enabled, loading {} boards in {}",
            config.boards.len(),
            format_ticks(delay)
        );

        Self {
            config_path,
            registry: Some(registry),
            config: Mutex::new(config),
            startup: Mutex::new(Some(handle)),
            loaded,
            load_error: Mutex::new(load_error),
        }
    }

    pub fn is_active(&self) -> bool {
        self.registry.is_some()
    }

    pub fn registry(&self) -> Result<&Arc<Registry>> {
        self.registry.as_ref().ok_or(Error::EngineInactive)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Whether the configured boards have been installed
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Make sure an edit will persist: the config file must have been read,
    /// and the configured boards are installed now if the activation delay
    /// is still running.
    pub fn prepare_edit(&self) -> Result<()> {
        self.registry()?;
        self.check_config()?;
        if !self.is_loaded() {
            info!("Loading boards early to apply an edit");
            self.load_now()?;
        }
        Ok(())
    }

    fn check_config(&self) -> Result<()> {
        match &*self.load_error.lock() {
            Some(reason) => Err(Error::ConfigUnreadable {
                path: self.config_path.display().to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Skip the activation delay and install the configured boards now.
    pub fn load_now(&self) -> Result<usize> {
        let registry = self.registry()?;
        self.cancel_startup();
        let boards = self.config.lock().boards.clone();
        let count = registry.load(&boards);
        self.loaded.store(true, Ordering::SeqCst);
        Ok(count)
    }

    /// Re-read the config file and replace every board with its contents.
    ///
    /// Message overrides only take effect on the next activation.
    pub fn reload(&self) -> Result<usize> {
        let registry = self.registry()?;
        let config = BoardConfig::load(&self.config_path)?;
        self.cancel_startup();
        let boards = config.boards.clone();
        *self.config.lock() = config;
        *self.load_error.lock() = None;
        let count = registry.load(&boards);
        self.loaded.store(true, Ordering::SeqCst);
        Ok(count)
    }

    /// Write the current boards back to the config file. Returns how many
    /// were written.
    pub fn save(&self) -> Result<usize> {
        let registry = self.registry()?;
        self.check_config()?;
        let mut config = self.config.lock();

        // Before the deferred load has run, the file is still authoritative
        if !self.is_loaded() {
            return Ok(config.boards.len());
        }

        config.boards = registry.definitions();
        config.save(&self.config_path)?;
        Ok(config.boards.len())
    }

    /// Save, then tear down every board. Teardown happens even if saving fails.
    pub fn disable(&self) -> Result<()> {
        let saved = self.save();
        self.teardown();
        if saved.is_ok() {
            info!("Holoboard disabled");
        }
        saved.map(|_| ())
    }

    /// Tear down every board without saving.
    pub fn teardown(&self) {
        self.cancel_startup();
        if let Some(registry) = &self.registry {
            let removed = registry.remove_all();
            info!("Removed {} boards", removed);
        }
    }

    fn cancel_startup(&self) {
        if let Some(handle) = self.startup.lock().take() {
            handle.cancel();
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config_path", &self.config_path)
            .field("active", &self.is_active())
            .finish()
    }
}
