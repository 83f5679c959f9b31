//! Keyboard chord matching.
//!
//! Bindings map a *sequence* of key events (single keys are trivial
//! sequences) to an action. Sequences share a trie; a pending buffer
//! tracks partial matches and clears on a non-matching key or after the
//! chord timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::event::KeyEvent;
use crate::time::Clock;

/// Default time allowed between chord keys.
pub const DEFAULT_CHORD_TIMEOUT: Duration = Duration::from_millis(500);

/// Action fired when a chord completes.
pub type ChordAction = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// One key-sequence binding.
#[derive(Clone)]
pub struct Binding {
    /// The key sequence, in press order.
    pub sequence: Vec<KeyEvent>,
    /// Fired when the full sequence matches.
    pub action: ChordAction,
}

impl Binding {
    /// Bind a sequence to an action.
    pub fn new(
        sequence: Vec<KeyEvent>,
        action: impl Fn() -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            sequence,
            action: Arc::new(action),
        }
    }

    /// Bind a single key to an action.
    pub fn key(key: KeyEvent, action: impl Fn() -> Result<()> + Send + Sync + 'static) -> Self {
        Self::new(vec![key], action)
    }
}

#[derive(Default)]
struct TrieNode {
    action: Option<ChordAction>,
    children: HashMap<KeyEvent, TrieNode>,
}

/// Outcome of feeding one key to the matcher.
pub enum ChordResult {
    /// No binding starts or continues with this key; dispatch it as an
    /// ordinary key. Any pending prefix was discarded.
    NoMatch,
    /// The key extends a chord; wait for the next key.
    Pending,
    /// A full sequence matched; run the returned action.
    Complete(ChordAction),
}

/// Chord trie plus the pending-prefix buffer.
pub struct ChordMatcher {
    root: TrieNode,
    pending: Vec<KeyEvent>,
    deadline: Option<Duration>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl ChordMatcher {
    /// Build a matcher from bindings. Later bindings on the exact same
    /// sequence replace earlier ones.
    pub fn new(bindings: &[Binding], clock: Arc<dyn Clock>) -> Self {
        let mut root = TrieNode::default();
        for binding in bindings {
            if binding.sequence.is_empty() {
                continue;
            }
            let mut node = &mut root;
            for key in &binding.sequence {
                node = node.children.entry(key.clone()).or_default();
            }
            node.action = Some(Arc::clone(&binding.action));
        }
        Self {
            root,
            pending: Vec::new(),
            deadline: None,
            timeout: DEFAULT_CHORD_TIMEOUT,
            clock,
        }
    }

    /// Override the chord timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of keys buffered toward a chord.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feed one key event.
    pub fn press(&mut self, key: &KeyEvent) -> ChordResult {
        self.expire();

        let Some(node) = self.descend() else {
            // Pending prefix no longer resolves (bindings changed);
            // start over with this key.
            self.clear();
            return self.press_fresh(key);
        };
        match node.children.get(key) {
            None => {
                self.clear();
                ChordResult::NoMatch
            }
            Some(child) => match (&child.action, child.children.is_empty()) {
                (Some(action), _) => {
                    // Leaf wins immediately; prefixes of longer chords
                    // are rejected at binding time by convention.
                    let action = Arc::clone(action);
                    self.clear();
                    ChordResult::Complete(action)
                }
                (None, false) => {
                    self.pending.push(key.clone());
                    self.deadline = Some(self.clock.now() + self.timeout);
                    ChordResult::Pending
                }
                (None, true) => {
                    self.clear();
                    ChordResult::NoMatch
                }
            },
        }
    }

    /// Drop an expired pending prefix. Called from `press` and once per
    /// loop tick so abandoned chords do not linger.
    pub fn expire(&mut self) {
        if let Some(deadline) = self.deadline {
            if self.clock.now() >= deadline {
                self.clear();
            }
        }
    }

    fn press_fresh(&mut self, key: &KeyEvent) -> ChordResult {
        match self.root.children.get(key) {
            None => ChordResult::NoMatch,
            Some(child) => match &child.action {
                Some(action) => ChordResult::Complete(Arc::clone(action)),
                None => {
                    self.pending.push(key.clone());
                    self.deadline = Some(self.clock.now() + self.timeout);
                    ChordResult::Pending
                }
            },
        }
    }

    fn descend(&self) -> Option<&TrieNode> {
        let mut node = &self.root;
        for key in &self.pending {
            node = node.children.get(key)?;
        }
        Some(node)
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.deadline = None;
    }
}
