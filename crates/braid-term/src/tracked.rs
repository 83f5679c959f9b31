//! Refcounted out-of-band objects anchored to cells.
//!
//! Sixel images and OSC 8 hyperlinks are too large to store per cell, so
//! cells carry cheap handles into side tables. A handle is an `Arc` over
//! the object: cloning a cell (or taking a snapshot) bumps the count, and
//! the object is released when the last handle drops. The tables keep
//! `Weak` entries only, so they never pin an object alive on their own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Stable identifier for a tracked object.
pub type TrackedId = u64;

/// An OSC 8 hyperlink.
#[derive(Debug, PartialEq, Eq)]
pub struct Hyperlink {
    /// Table id.
    pub id: TrackedId,
    /// Optional `id=` parameter from the OSC 8 sequence.
    pub params_id: Option<String>,
    /// Target URI.
    pub uri: String,
}

/// A decoded Sixel image payload.
#[derive(Debug, PartialEq, Eq)]
pub struct SixelImage {
    /// Table id.
    pub id: TrackedId,
    /// Raw Sixel payload bytes (between the DCS introducer and ST).
    pub data: Vec<u8>,
    /// Cell width the image was anchored at.
    pub cell_width: u16,
    /// Cell height the image was anchored at.
    pub cell_height: u16,
}

/// Cell-side handle to a hyperlink.
#[derive(Clone, Debug)]
pub struct LinkHandle(pub Arc<Hyperlink>);

/// Cell-side handle to a Sixel image.
#[derive(Clone, Debug)]
pub struct SixelHandle(pub Arc<SixelImage>);

// Handle identity is table identity: two handles are equal iff they refer
// to the same tracked object, regardless of payload equality.
impl PartialEq for LinkHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for LinkHandle {}

impl PartialEq for SixelHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for SixelHandle {}

impl LinkHandle {
    /// Target URI of the hyperlink.
    pub fn uri(&self) -> &str {
        &self.0.uri
    }
}

impl SixelHandle {
    /// Number of live handles to this image (including this one).
    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> TrackedId {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Side table of live tracked objects of one kind.
///
/// Entries are weak; `prune` drops entries whose objects were released.
#[derive(Debug, Default)]
pub struct TrackedTable<T> {
    entries: HashMap<TrackedId, Weak<T>>,
}

impl<T> TrackedTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Look up a live object by id.
    pub fn get(&self, id: TrackedId) -> Option<Arc<T>> {
        self.entries.get(&id).and_then(Weak::upgrade)
    }

    /// Number of entries whose object is still alive.
    pub fn live_count(&self) -> usize {
        self.entries
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Drop table entries for released objects.
    pub fn prune(&mut self) {
        self.entries.retain(|_, w| w.strong_count() > 0);
    }

    fn insert(&mut self, id: TrackedId, value: &Arc<T>) {
        self.entries.insert(id, Arc::downgrade(value));
    }
}

impl TrackedTable<Hyperlink> {
    /// Register a hyperlink and hand back the owning handle.
    pub fn register_link(&mut self, params_id: Option<String>, uri: String) -> LinkHandle {
        let id = next_id();
        let link = Arc::new(Hyperlink { id, params_id, uri });
        self.insert(id, &link);
        LinkHandle(link)
    }
}

impl TrackedTable<SixelImage> {
    /// Register a Sixel image and hand back the owning handle.
    pub fn register_sixel(&mut self, data: Vec<u8>, cell_width: u16, cell_height: u16) -> SixelHandle {
        let id = next_id();
        let image = Arc::new(SixelImage {
            id,
            data,
            cell_width,
            cell_height,
        });
        self.insert(id, &image);
        SixelHandle(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_released_when_last_handle_drops() {
        let mut table = TrackedTable::new();
        let handle = table.register_link(None, "https://example.com".into());
        let id = handle.0.id;
        assert_eq!(table.live_count(), 1);

        drop(handle);
        table.prune();
        assert_eq!(table.live_count(), 0);
        assert!(table.get(id).is_none());
    }

    #[test]
    fn clone_keeps_object_alive() {
        let mut table = TrackedTable::new();
        let a = table.register_link(Some("x".into()), "https://a".into());
        let b = a.clone();
        drop(a);
        table.prune();
        assert_eq!(table.live_count(), 1);
        assert_eq!(b.uri(), "https://a");
    }

    #[test]
    fn handle_identity_not_payload_equality() {
        let mut table = TrackedTable::new();
        let a = table.register_link(None, "https://same".into());
        let b = table.register_link(None, "https://same".into());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn sixel_refcount_visible() {
        let mut table = TrackedTable::new();
        let h = table.register_sixel(vec![1, 2, 3], 4, 2);
        assert_eq!(h.refcount(), 1);
        let h2 = h.clone();
        assert_eq!(h.refcount(), 2);
        drop(h2);
        assert_eq!(h.refcount(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let mut table = TrackedTable::new();
        let a = table.register_sixel(vec![], 1, 1);
        let b = table.register_sixel(vec![], 1, 1);
        assert_ne!(a.0.id, b.0.id);
    }
}
