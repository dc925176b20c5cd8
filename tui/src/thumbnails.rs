//! Lazily loaded history thumbnails.
//!
//! Thumbnails are only requested for tiles that are on screen, and at most
//! `concurrency` loads run at once so they never compete with the featured
//! image for long.

use std::collections::HashMap;
use std::sync::Arc;

use kiosk_client::LoadedImage;
use kiosk_core::LoadError;
use kiosk_core::ResourceLoader;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct ThumbnailLoaded {
    pub id: Arc<str>,
    pub result: Result<LoadedImage, LoadError>,
}

#[derive(Debug)]
pub(crate) enum Thumbnail {
    Loading(JoinHandle<()>),
    Ready(LoadedImage),
    Failed,
}

pub(crate) struct ThumbnailStore<L> {
    loader: Arc<L>,
    permits: Arc<Semaphore>,
    tx: UnboundedSender<ThumbnailLoaded>,
    entries: HashMap<Arc<str>, Thumbnail>,
}

impl<L> ThumbnailStore<L>
where
    L: ResourceLoader<Output = LoadedImage>,
{
    pub(crate) fn new(
        loader: Arc<L>,
        concurrency: usize,
        tx: UnboundedSender<ThumbnailLoaded>,
    ) -> Self {
        Self {
            loader,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            tx,
            entries: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Thumbnail> {
        self.entries.get(id)
    }

    /// Starts loading `id` unless it is loading, loaded or known broken.
    pub(crate) fn ensure(&mut self, id: &Arc<str>) {
        if self.entries.contains_key(id) {
            return;
        }
        let loader = Arc::clone(&self.loader);
        let permits = Arc::clone(&self.permits);
        let tx = self.tx.clone();
        let task_id = Arc::clone(id);
        let task = tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let result = loader.load(&task_id).await;
            let _ = tx.send(ThumbnailLoaded {
                id: task_id,
                result,
            });
        });
        self.entries.insert(Arc::clone(id), Thumbnail::Loading(task));
    }

    pub(crate) fn on_loaded(&mut self, loaded: ThumbnailLoaded) {
        let thumbnail = match loaded.result {
            Ok(image) => Thumbnail::Ready(image),
            Err(err) => {
                debug!(id = %loaded.id, "thumbnail unavailable: {err}");
                Thumbnail::Failed
            }
        };
        self.entries.insert(loaded.id, thumbnail);
    }
}

impl<L> Drop for ThumbnailStore<L> {
    fn drop(&mut self) {
        for thumbnail in self.entries.values() {
            if let Thumbnail::Loading(task) = thumbnail {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::RgbaImage;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct SlowLoader {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl ResourceLoader for SlowLoader {
        type Output = LoadedImage;

        async fn load(&self, id: &str) -> Result<LoadedImage, LoadError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if id.ends_with("missing") {
                return Err(LoadError::Status { status: 404 });
            }
            Ok(LoadedImage::new(RgbaImage::new(4, 4)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loads_are_bounded_and_deduplicated() {
        let loader = Arc::new(SlowLoader::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut store = ThumbnailStore::new(Arc::clone(&loader), 2, tx);

        let ids: Vec<Arc<str>> = ["a", "b", "c", "d", "e-missing"]
            .into_iter()
            .map(Arc::from)
            .collect();
        for id in &ids {
            store.ensure(id);
            store.ensure(id);
        }
        assert!(matches!(store.get("a"), Some(Thumbnail::Loading(_))));

        for _ in 0..ids.len() {
            let Some(loaded) = rx.recv().await else {
                panic!("thumbnail expected");
            };
            store.on_loaded(loaded);
        }
        assert_eq!(loader.max_in_flight.load(Ordering::SeqCst), 2);
        assert!(matches!(store.get("d"), Some(Thumbnail::Ready(_))));
        assert!(matches!(store.get("e-missing"), Some(Thumbnail::Failed)));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }
}
