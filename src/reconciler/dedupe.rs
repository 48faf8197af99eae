//! Filtering of echoed history out of step-completion batches

use crate::message::Message;

/// Drops messages of a step-completion batch that were already delivered.
///
/// A batch that contains the turn's user message (the anchor) is treated as
/// cumulative history: only what follows the last occurrence of the anchor is
/// considered, minus the prefix already delivered this turn. A batch without
/// the anchor is taken as entirely new.
#[derive(Debug, Default)]
pub struct HistoryDeduper {
    anchor: Option<Message>,
    delivered: Vec<Message>,
}

fn same_delivery(a: &Message, b: &Message) -> bool {
    a.same_identity(b) && a.tool_call_id == b.tool_call_id
}

impl HistoryDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a turn anchored on the submitted user message
    pub fn begin_turn(&mut self, anchor: Message) {
        self.anchor = Some(anchor);
        self.delivered.clear();
    }

    pub fn anchor(&self) -> Option<&Message> {
        self.anchor.as_ref()
    }

    /// Keep only new messages and remember them as delivered
    pub fn filter(&mut self, messages: Vec<Message>) -> Vec<Message> {
        let anchor_idx = self.anchor.as_ref().and_then(|anchor| {
            messages
                .iter()
                .rposition(|m| m.same_identity(anchor))
        });

        let fresh: Vec<Message> = match anchor_idx {
            Some(idx) => {
                let after: Vec<Message> = messages.into_iter().skip(idx + 1).collect();
                let already = after
                    .iter()
                    .zip(&self.delivered)
                    .take_while(|(incoming, seen)| same_delivery(incoming, seen))
                    .count();
                if already > 0 {
                    tracing::debug!(skipped = already, "dropping echoed history");
                }
                after.into_iter().skip(already).collect()
            }
            None => messages,
        };

        self.delivered.extend(fresh.iter().cloned());
        fresh
    }

    pub fn reset(&mut self) {
        self.anchor = None;
        self.delivered.clear();
    }
}
