//! Single-writer PGMap service with update notification
//!
//! The monitor maintains the current map and allows:
//! - **Applying**: the ordering layer feeds incrementals in version order
//! - **Loading**: the persistence layer replaces the map from a snapshot
//! - **Subscribing**: any component can receive a summary per applied version
//! - **Waiting**: components can wait until a given version is reached
//!
//! # Example
//!
//! ```rust,ignore
//! let monitor = Arc::new(PgMapMonitor::new(PgMap::new()));
//!
//! let mut rx = monitor.subscribe().await;
//! tokio::spawn(async move {
//!     while let Some(summary) = rx.recv().await {
//!         println!("{}", summary);
//!     }
//! });
//!
//! monitor.apply_incremental(&inc).await?;
//! let summary = monitor.wait_for_version(inc.version, Duration::from_secs(1)).await?;
//! ```

use crate::error::PgMonError;
use crate::Result;
use bytes::Bytes;
use cephconfig::CephConfig;
use pgmap::{PgMap, PgMapConfig, PgMapIncremental, PgMapSummary};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify, RwLock};
use tracing::{debug, info, trace, warn};

pub struct PgMapMonitor {
    /// The map. Writers hold the lock for the whole of an apply or load.
    map: Arc<RwLock<PgMap>>,

    /// Every published summary is sent to each live subscriber
    subscribers: Arc<RwLock<Vec<mpsc::UnboundedSender<Arc<PgMapSummary>>>>>,

    /// Wakes tasks blocked in `wait_for_version`
    notify: Arc<Notify>,
}

impl PgMapMonitor {
    pub fn new(map: PgMap) -> Self {
        Self {
            map: Arc::new(RwLock::new(map)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Empty map configured from the `[mon]`/`[global]` sections of ceph.conf
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let ceph_config = CephConfig::from_file(path)?;
        let config = PgMapConfig::load(&ceph_config);
        debug!("PgMapMonitor config: {:?}", config);
        Ok(Self::new(PgMap::with_config(config)))
    }

    /// Apply the next incremental and publish the resulting summary
    ///
    /// A version mismatch leaves the map untouched and publishes nothing.
    pub async fn apply_incremental(&self, inc: &PgMapIncremental) -> Result<Arc<PgMapSummary>> {
        let mut map = self.map.write().await;
        if let Err(e) = map.apply_incremental(inc) {
            warn!("PgMapMonitor rejected incremental v{}: {}", inc.version, e);
            return Err(e.into());
        }
        let summary = Arc::new(map.summary());

        // send before releasing the map so subscribers see versions in order
        self.send_to_subscribers(&summary).await;
        drop(map);

        self.notify.notify_waiters();
        Ok(summary)
    }

    /// Replace the map from a persisted snapshot
    ///
    /// On a decode error the current map is kept.
    pub async fn load_snapshot(&self, data: &[u8]) -> Result<Arc<PgMapSummary>> {
        let mut map = self.map.write().await;
        map.load_snapshot(data)?;
        let summary = Arc::new(map.summary());
        info!("PgMapMonitor loaded {}", summary);

        self.send_to_subscribers(&summary).await;
        drop(map);

        self.notify.notify_waiters();
        Ok(summary)
    }

    pub async fn encode_snapshot(&self) -> Result<Bytes> {
        let map = self.map.read().await;
        Ok(map.encode_snapshot()?)
    }

    pub async fn summary(&self) -> PgMapSummary {
        self.map.read().await.summary()
    }

    pub async fn version(&self) -> u64 {
        self.map.read().await.version()
    }

    /// Run `f` against the current map under the read lock
    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&PgMap) -> R,
    {
        let map = self.map.read().await;
        f(&map)
    }

    /// Subscribe to summaries of every version applied after this call
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<Arc<PgMapSummary>> {
        let (tx, rx) = mpsc::unbounded_channel();

        // holding the map excludes a concurrent apply from straddling the push
        let map = self.map.read().await;
        let mut subs = self.subscribers.write().await;
        subs.push(tx);
        debug!(
            "New PGMap subscriber added at v{} (total: {})",
            map.version(),
            subs.len()
        );

        rx
    }

    /// Wait until the map reaches at least `version`
    pub async fn wait_for_version(
        &self,
        version: u64,
        timeout: Duration,
    ) -> Result<PgMapSummary> {
        tokio::time::timeout(timeout, self.wait_for_version_inner(version))
            .await
            .map_err(|_| PgMonError::Timeout(timeout, version))
    }

    async fn wait_for_version_inner(&self, version: u64) -> PgMapSummary {
        loop {
            // register before checking so a publish in between is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let map = self.map.read().await;
                if map.version() >= version {
                    return map.summary();
                }
            }

            notified.await;
        }
    }

    /// Callers hold the map write guard. Lock order is map, then subscribers.
    async fn send_to_subscribers(&self, summary: &Arc<PgMapSummary>) {
        let mut subscribers = self.subscribers.write().await;

        subscribers.retain(|tx| match tx.send(Arc::clone(summary)) {
            Ok(()) => {
                trace!("Notified subscriber of PGMap v{}", summary.version);
                true
            }
            Err(_) => {
                trace!("Removing closed PGMap subscriber");
                false
            }
        });
    }
}

impl Default for PgMapMonitor {
    fn default() -> Self {
        Self::new(PgMap::new())
    }
}
