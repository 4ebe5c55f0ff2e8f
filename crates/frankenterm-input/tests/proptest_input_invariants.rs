//! Property-based invariant tests for the input coordinator.
//!
//! Verifies:
//! 1.  JSON roundtrip: any RawInputEvent survives to_json_string → from_json_str
//! 2.  Modifier bits never exceed the 4-bit mask
//! 3.  Typed keys commit exactly once each, in order, whatever the timing
//! 4.  Debouncer: a burst of schedules yields exactly one commit, the last key
//! 5.  Composing: no keydown/keypress ever reaches the terminal
//! 6.  Composition end and blur always leave the session idle
//! 7.  Third-level shift keydown keeps the browser default untouched
//! 8.  Third-level shift keypress is never rejected for its modifiers
//! 9.  Keypress char-code precedence: a non-zero charCode always wins
//! 10. Clock: tick never moves time backwards
//! 11. Determinism: same event stream + timing → same terminal calls
//! 12. Event time: a commit deadline is the event's timestamp plus the delay

use core::time::Duration;

use frankenterm_input::handler::keypress_char_code;
use frankenterm_input::testing::{RecordingSurface, RecordingTerminal};
use frankenterm_input::{
    CommitAttempt, CommitDebouncer, CompositionEvent, CompositionPhase, Dispatch, InputConfig,
    InputHandler, KeyEvent, KeyEventKind, Modifiers, Platform, RawInputEvent,
};
use proptest::prelude::*;

type Harness = InputHandler<RecordingTerminal, RecordingSurface>;

fn harness(platform: Platform) -> Harness {
    InputHandler::new(
        RecordingTerminal::new(platform),
        RecordingSurface::new(),
        InputConfig::default().with_platform(platform),
    )
}

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_modifiers() -> impl Strategy<Value = Modifiers> {
    (0u8..=15).prop_map(Modifiers::from_bits_truncate_u8)
}

fn arb_platform() -> impl Strategy<Value = Platform> {
    prop_oneof![
        Just(Platform::default()),
        Just(Platform::mac()),
        Just(Platform::windows()),
    ]
}

fn arb_printable() -> impl Strategy<Value = char> {
    any::<char>().prop_filter("printable", |c| !c.is_control())
}

fn arb_opt_code() -> impl Strategy<Value = Option<u32>> {
    prop_oneof![Just(None), Just(Some(0)), (1u32..=0x2FFFF).prop_map(Some)]
}

fn arb_key_event() -> impl Strategy<Value = KeyEvent> {
    (
        prop_oneof![Just(KeyEventKind::Down), Just(KeyEventKind::Press)],
        arb_modifiers(),
        arb_opt_code(),
        arb_opt_code(),
        arb_opt_code(),
        proptest::option::of("[a-zA-Z]{1,6}"),
        any::<bool>(),
    )
        .prop_map(|(kind, mods, key_code, char_code, which, key, repeat)| KeyEvent {
            kind,
            mods,
            key_code,
            char_code,
            which,
            key: key.map(Into::into),
            code: None,
            repeat,
        })
}

fn arb_raw_event() -> impl Strategy<Value = RawInputEvent> {
    prop_oneof![
        arb_key_event().prop_map(RawInputEvent::Key),
        Just(RawInputEvent::composition_start()),
        "\\PC{0,8}".prop_map(|s| RawInputEvent::composition_update(&s)),
        proptest::option::of("\\PC{0,8}")
            .prop_map(|s| RawInputEvent::composition_end(s.as_deref())),
        Just(RawInputEvent::Blur),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. JSON roundtrip
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn json_roundtrip(event in arb_raw_event()) {
        let json = event.to_json_string().expect("serialize");
        let parsed = RawInputEvent::from_json_str(&json).expect("deserialize");
        prop_assert_eq!(parsed, event);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Modifier bits bounded
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn modifier_bits_bounded(raw in any::<u8>()) {
        let mods = Modifiers::from_bits_truncate_u8(raw);
        prop_assert!(mods.bits() <= 0b1111, "modifier bits {} > 15", mods.bits());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Typed keys commit exactly once, in order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn typed_keys_commit_once_in_order(
        typed in proptest::collection::vec((arb_printable(), 0u64..120), 1..40),
    ) {
        let mut h = harness(Platform::default());
        let mut now = 0u64;
        for (ch, gap) in &typed {
            now += gap;
            h.tick(Duration::from_millis(now));
            h.surface_mut().type_text(&ch.to_string());
            let outcome = h.dispatch(&KeyEvent::keypress(u32::from(*ch)));
            prop_assert_eq!(outcome, Dispatch::Scheduled { canceled: false });
        }
        h.tick(Duration::from_millis(now + 1_000));

        let expected: Vec<String> = typed.iter().map(|(ch, _)| ch.to_string()).collect();
        let commits: Vec<String> = h.terminal().commits().into_iter().map(str::to_owned).collect();
        prop_assert_eq!(commits, expected);
        prop_assert!(h.pending_commit().is_none());
        prop_assert_eq!(h.surface().text(), "");
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Debouncer: a burst collapses to its last key
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn burst_commits_only_last(keys in proptest::collection::vec("[a-z]{1,3}", 1..20)) {
        let mut debouncer = CommitDebouncer::default();
        for (i, key) in keys.iter().enumerate() {
            debouncer.schedule(key.as_str(), Duration::from_millis(i as u64));
        }
        let mut committed = Vec::new();
        while let Some(ticket) = debouncer.pop_due(Duration::from_secs(10)) {
            if let CommitAttempt::Committed(ticket) = debouncer.attempt_commit(&ticket) {
                committed.push(ticket.key().to_string());
            }
        }
        prop_assert_eq!(committed, vec![keys[keys.len() - 1].clone()]);
        prop_assert_eq!(debouncer.armed_timers(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Composing suppresses every key event
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn keys_suppressed_while_composing(
        platform in arb_platform(),
        keys in proptest::collection::vec(arb_key_event(), 1..20),
    ) {
        let mut h = harness(platform);
        h.composition_start();
        h.terminal_mut().clear_calls();
        for key in &keys {
            prop_assert_eq!(h.dispatch(key), Dispatch::Suppressed);
        }
        h.tick(Duration::from_secs(5));
        prop_assert!(h.terminal().calls().is_empty());
        prop_assert!(h.is_composing());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. End and blur leave the session idle
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn end_or_blur_deactivates(
        started in any::<bool>(),
        use_blur in any::<bool>(),
        text in "\\PC{0,6}",
    ) {
        let mut h = harness(Platform::default());
        if started {
            h.composition_start();
        }
        h.surface_mut().set_text(&text);
        if use_blur {
            h.blur();
        } else {
            h.composition_end(Some(&CompositionEvent {
                phase: CompositionPhase::End,
                data: None,
            }));
        }
        prop_assert!(!h.is_composing());
        prop_assert!(h.surface().overlay().is_none());

        h.tick(Duration::from_secs(1));
        let commits = h.terminal().commits();
        // An end always schedules, even empty text; blur only ends an active session.
        let expect_commit = started || !use_blur;
        prop_assert_eq!(commits.len(), usize::from(expect_commit));
        if expect_commit {
            prop_assert_eq!(commits[0], text.as_str());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Third-level shift keydown keeps the browser default
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn third_level_keydown_passes_through(code in 48u32..=222, windows in any::<bool>()) {
        let (platform, mods) = if windows {
            (Platform::windows(), Modifiers::ALT | Modifiers::CTRL)
        } else {
            (Platform::mac(), Modifiers::ALT)
        };
        let mut h = harness(platform);
        let outcome = h.dispatch(&KeyEvent::keydown(code).with_mods(mods));
        prop_assert_eq!(outcome, Dispatch::PassThrough);
        prop_assert!(h.terminal().calls().is_empty(), "calls: {:?}", h.terminal().calls());
        prop_assert!(h.pending_commit().is_none());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 8. Third-level shift keypress commits
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn third_level_keypress_commits(ch in arb_printable(), windows in any::<bool>()) {
        let (platform, mods) = if windows {
            (Platform::windows(), Modifiers::ALT | Modifiers::CTRL)
        } else {
            (Platform::mac(), Modifiers::ALT)
        };
        let mut h = harness(platform);
        let outcome = h.dispatch(&KeyEvent::keypress(u32::from(ch)).with_mods(mods));
        prop_assert_eq!(outcome, Dispatch::Scheduled { canceled: false });
        let expected = ch.to_string();
        prop_assert_eq!(h.pending_commit(), Some(expected.as_str()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 9. Non-zero charCode wins
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn nonzero_char_code_wins(event in arb_key_event(), code in 1u32..=0x10FFFF) {
        let event = KeyEvent { char_code: Some(code), ..event };
        prop_assert_eq!(keypress_char_code(&event), Some(code));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 10. Clock is monotonic
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clock_is_monotonic(times in proptest::collection::vec(0u64..10_000, 1..30)) {
        let mut h = harness(Platform::default());
        let mut high = Duration::ZERO;
        for t in times {
            h.tick(Duration::from_millis(t));
            high = high.max(Duration::from_millis(t));
            prop_assert_eq!(h.now(), high);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 11. Determinism
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn same_stream_same_calls(
        platform in arb_platform(),
        stream in proptest::collection::vec((arb_raw_event(), 0u64..80), 0..30),
    ) {
        let run = || {
            let mut h = harness(platform);
            let mut now = 0u64;
            let mut outcomes = Vec::new();
            for (event, gap) in &stream {
                now += gap;
                h.tick(Duration::from_millis(now));
                outcomes.push(h.handle(event));
            }
            h.tick(Duration::from_millis(now + 1_000));
            (outcomes, h.terminal().calls().to_vec())
        };
        prop_assert_eq!(run(), run());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 12. Deadlines start at the event timestamp
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn deadline_follows_event_time(
        idle in 0u64..100_000,
        ch in proptest::char::range('a', 'z'),
        gap in 0u64..50,
    ) {
        let mut h = harness(Platform::default());
        let at = Duration::from_millis(idle);
        h.handle_at(&RawInputEvent::Key(KeyEvent::keypress(u32::from(ch))), at);
        prop_assert_eq!(h.next_deadline(), Some(at + Duration::from_millis(50)));

        // A start inside the window always discards the key.
        h.handle_at(&RawInputEvent::composition_start(), at + Duration::from_millis(gap));
        h.tick(at + Duration::from_secs(1));
        prop_assert!(h.terminal().commits().is_empty());
    }
}
