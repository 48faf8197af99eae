//! Property-based tests for the reconciler
//!
//! These tests verify delivery invariants across arbitrary event sequences.

use super::*;
use crate::message::{Message, MessageFragment, Role, ToolCall};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_fragments() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-zA-Z ,.]{0,8}", 1..12)
}

fn arb_tool_call() -> impl Strategy<Value = ToolCall> {
    let name = prop_oneof![
        Just("bash"),
        Just("grep"),
        Just("ls"),
        Just("tree"),
        Just("read"),
        Just("write"),
        Just("edit"),
        Just("todo_write"),
        Just("web_fetch"),
    ];
    ("[a-z0-9]{6}", name, "[a-z/._]{1,12}").prop_map(|(id, name, arg)| {
        ToolCall::new(
            id,
            name,
            json!({"command": arg, "pattern": arg, "path": arg, "content": arg}),
        )
    })
}

fn arb_tool_calls() -> impl Strategy<Value = Vec<ToolCall>> {
    proptest::collection::vec(arb_tool_call(), 0..4).prop_map(|calls| {
        // ids are unique within a turn
        calls
            .into_iter()
            .enumerate()
            .map(|(i, mut call)| {
                call.id = format!("{}-{i}", call.id);
                call
            })
            .collect()
    })
}

fn arb_user_text() -> impl Strategy<Value = String> {
    "[a-z ]{1,20}"
}

// ============================================================================
// Helpers
// ============================================================================

fn begin(text: &str) -> (EventReconciler, Transcript) {
    let mut reconciler = EventReconciler::new();
    let mut transcript = Transcript::new();
    reconciler.begin_turn(&mut transcript, Message::user(text));
    (reconciler, transcript)
}

fn step(messages: Vec<Message>) -> Event {
    Event::StepCompletion {
        node_name: "model".to_string(),
        messages,
    }
}

fn assistant_effects(effects: &[Effect]) -> Vec<&Effect> {
    effects
        .iter()
        .filter(|e| match e {
            Effect::Add { message, .. } | Effect::Update { message, .. } => {
                message.role == Role::Assistant
            }
            _ => false,
        })
        .collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_streamed_turn_adds_once_and_finalizes(
        user in arb_user_text(),
        fragments in arb_fragments(),
        calls in arb_tool_calls(),
    ) {
        let (mut reconciler, mut transcript) = begin(&user);
        let mut effects = Vec::new();
        for fragment in &fragments {
            effects.extend(reconciler.handle(
                &mut transcript,
                Event::Delta { fragment: MessageFragment::text(fragment.clone()) },
            ));
        }
        let final_message = Message::assistant_with_tools(fragments.concat(), calls);
        effects.extend(reconciler.handle(&mut transcript, step(vec![final_message.clone()])));

        let dispatched = assistant_effects(&effects);
        let adds = dispatched.iter().filter(|e| matches!(e, Effect::Add { .. })).count();
        prop_assert_eq!(adds, 1);
        let first_is_add = matches!(dispatched[0], Effect::Add { .. });
        prop_assert!(first_is_add);

        let last = dispatched.last().unwrap();
        prop_assert_eq!(*last, &Effect::update(final_message.clone(), true));

        // Updates before the final one never re-render tool calls
        for effect in &dispatched[1..dispatched.len() - 1] {
            let is_plain_update = matches!(effect, Effect::Update { update_tools: false, .. });
            prop_assert!(is_plain_update);
        }

        prop_assert_eq!(transcript.len(), 2);
        prop_assert_eq!(&transcript.messages()[1], &final_message);
    }

    #[test]
    fn prop_redelivered_batch_adds_nothing(
        user in arb_user_text(),
        reply in "[a-z ]{0,20}",
        calls in arb_tool_calls(),
    ) {
        let (mut reconciler, mut transcript) = begin(&user);
        let mut batch = vec![Message::user(user.clone()), Message::assistant_with_tools(reply, calls.clone())];
        batch.extend(calls.iter().map(|c| Message::tool(c.id.clone(), "```\nok\n```")));

        reconciler.handle(&mut transcript, step(batch.clone()));
        let len_after_first = transcript.len();
        let pending_after_first = reconciler.correlator().pending_count();

        let again = reconciler.handle(&mut transcript, step(batch));
        let adds = again.iter().filter(|e| matches!(e, Effect::Add { .. })).count();
        prop_assert_eq!(adds, 0);
        prop_assert_eq!(transcript.len(), len_after_first);
        prop_assert_eq!(reconciler.correlator().pending_count(), pending_after_first);
    }

    #[test]
    fn prop_every_result_clears_its_pending_call(
        user in arb_user_text(),
        calls in arb_tool_calls(),
    ) {
        let (mut reconciler, mut transcript) = begin(&user);
        reconciler.handle(
            &mut transcript,
            step(vec![Message::assistant_with_tools("", calls.clone())]),
        );
        let results = calls
            .iter()
            .map(|c| Message::tool(c.id.clone(), "done"))
            .collect();
        reconciler.handle(&mut transcript, step(results));

        prop_assert_eq!(reconciler.correlator().pending_count(), 0);
    }

    #[test]
    fn prop_unknown_result_only_adds(
        user in arb_user_text(),
        id in "[a-z]{4}",
        content in "[a-z\n`]{0,30}",
    ) {
        let (mut reconciler, mut transcript) = begin(&user);
        let message = Message::tool(id, content);
        let effects = reconciler.handle(&mut transcript, step(vec![message.clone()]));
        prop_assert_eq!(effects, vec![Effect::add(message)]);
    }

    #[test]
    fn prop_transport_error_ends_stream(
        user in arb_user_text(),
        fragments in arb_fragments(),
        error in "[a-z ]{1,20}",
    ) {
        let (mut reconciler, mut transcript) = begin(&user);
        for fragment in fragments {
            reconciler.handle(&mut transcript, Event::Delta { fragment: MessageFragment::text(fragment) });
        }
        let effects = reconciler.handle(&mut transcript, Event::TransportError { message: error.clone() });

        prop_assert_eq!(effects.len(), 1);
        prop_assert!(!reconciler.is_streaming());
        prop_assert!(!transcript.is_streaming());
        let last = transcript.messages().last().unwrap();
        prop_assert_eq!(&last.content, &transport_error_content(&error));
    }
}
