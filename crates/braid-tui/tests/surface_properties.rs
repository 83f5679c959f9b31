//! Property-based tests for surface diffing and encoding.

use braid_tui::{AnsiEncoder, ColorSupport, Comparer, Style, Surface};
use proptest::prelude::*;

fn encode(prev: &Surface, curr: &Surface) -> Vec<u8> {
    let diff = Comparer::new().diff(prev, curr);
    AnsiEncoder::new(ColorSupport::TrueColor).encode(&diff)
}

// ==============================================================================
// Property 1: zero bytes iff surfaces are equal
// ==============================================================================

proptest! {
    #[test]
    fn zero_bytes_iff_equal(
        writes in proptest::collection::vec(
            (0u16..12, 0u16..4, "[a-z]{0,6}"),
            0..8,
        ),
        extra in proptest::option::of((0u16..12, 0u16..4, "[a-z]{1,3}")),
    ) {
        let mut a = Surface::new(12, 4);
        for (x, y, text) in &writes {
            a.write_text(*x, *y, text, &Style::default());
        }
        let mut b = a.clone();
        prop_assert!(encode(&a, &b).is_empty());

        if let Some((x, y, text)) = extra {
            b.write_text(x, y, &text, &Style::default());
            let changed = a != b;
            prop_assert_eq!(!encode(&a, &b).is_empty(), changed);
        }
    }
}

// ==============================================================================
// Property 2: replaying the diff onto the previous frame yields the
// current frame (two frames concatenated = rendering from scratch)
// ==============================================================================

proptest! {
    #[test]
    fn diff_replay_reconstructs_target(
        first in proptest::collection::vec((0u16..20, 0u16..5, "[a-zA-Z ]{0,8}"), 0..6),
        second in proptest::collection::vec((0u16..20, 0u16..5, "[a-zA-Z ]{0,8}"), 0..6),
    ) {
        let mut prev = Surface::new(20, 5);
        for (x, y, text) in &first {
            prev.write_text(*x, *y, text, &Style::default());
        }
        let mut curr = Surface::new(20, 5);
        for (x, y, text) in &second {
            curr.write_text(*x, *y, text, &Style::default());
        }

        // Feed the two frames through a terminal: blank -> prev -> curr.
        let mut term = match braid_term::VirtualTerminal::new(20, 5) {
            Ok(t) => t,
            Err(e) => panic!("terminal failed: {e}"),
        };
        let blank = Surface::new(20, 5);
        term.feed(&encode(&blank, &prev));
        term.feed(&encode(&prev, &curr));
        prop_assert_eq!(term.screen_text(), curr.to_text());

        // Rendering curr from scratch shows the same screen.
        let mut direct = match braid_term::VirtualTerminal::new(20, 5) {
            Ok(t) => t,
            Err(e) => panic!("terminal failed: {e}"),
        };
        direct.feed(&encode(&blank, &curr));
        prop_assert_eq!(direct.screen_text(), term.screen_text());
    }
}

// ==============================================================================
// Property 3: no orphan continuation cells after arbitrary wide writes
// ==============================================================================

proptest! {
    #[test]
    fn wide_grapheme_safety(
        writes in proptest::collection::vec(
            (0u16..10, 0u16..3, "[a\u{4f60}\u{597d}\u{1F389}]{0,4}"),
            0..10,
        ),
    ) {
        let mut surface = Surface::new(10, 3);
        for (x, y, text) in &writes {
            surface.write_text(*x, *y, text, &Style::default());
        }
        for row in surface.rows() {
            let mut prev_wide = false;
            for cell in &row.cells {
                if cell.is_continuation() {
                    prop_assert!(prev_wide, "orphan continuation");
                }
                prev_wide = cell.is_wide();
            }
        }
    }
}

// ==============================================================================
// Property 4: the encoder never moves the cursor without writing
// ==============================================================================

proptest! {
    #[test]
    fn every_cursor_move_precedes_content(
        writes in proptest::collection::vec((0u16..16, 0u16..4, "[a-z]{1,5}"), 1..6),
    ) {
        let prev = Surface::new(16, 4);
        let mut curr = prev.clone();
        for (x, y, text) in &writes {
            curr.write_text(*x, *y, text, &Style::default());
        }
        let bytes = encode(&prev, &curr);
        let text = String::from_utf8_lossy(&bytes);
        // Split on cursor moves; every segment after a move must carry
        // visible content before the next move.
        let mut parts = text.split("\x1b[").peekable();
        let _ = parts.next();
        for part in parts {
            if let Some(rest) = part.split_once('H').map(|(_, r)| r) {
                let visible = rest.split('\x1b').next().unwrap_or("");
                prop_assert!(
                    !visible.is_empty(),
                    "cursor moved without writing in {text:?}"
                );
            }
        }
    }
}
