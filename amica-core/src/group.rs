//! Group responder selection — deciding which personas answer a message
//! addressed to a room with several NPC members.
//!
//! Selection is deterministic: members invoked by name answer in roster
//! order up to the configured cap, and when nobody is named the first
//! member answers alone.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{GroupId, NpcId};

/// One NPC member of a group roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    /// Persona identifier.
    pub npc_id: NpcId,
    /// Display name used for address detection.
    pub name: String,
}

impl GroupMember {
    /// Build a roster entry.
    #[must_use]
    pub fn new(npc_id: NpcId, name: impl Into<String>) -> Self {
        Self {
            npc_id,
            name: name.into(),
        }
    }
}

/// How the responders were chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderSelection {
    /// The user named these members directly, in roster order.
    DirectInvocation(Vec<NpcId>),
    /// Nobody was named; the first roster member answers alone.
    DefaultFallback(NpcId),
    /// The roster is empty; nobody answers.
    NoMembers,
}

impl ResponderSelection {
    /// The selected responders, in reply order.
    #[must_use]
    pub fn responders(&self) -> Vec<NpcId> {
        match self {
            Self::DirectInvocation(ids) => ids.clone(),
            Self::DefaultFallback(id) => vec![*id],
            Self::NoMembers => Vec::new(),
        }
    }
}

/// Whether the message addresses a member by name.
///
/// Matches the name as a standalone token, a `name,`/`name:` prefix, a
/// trailing `, name` suffix, or an `@name` mention. Case-insensitive.
#[must_use]
pub fn addresses_member(message: &str, name: &str) -> bool {
    let lower = message.to_lowercase();
    let name = name.to_lowercase();
    if name.is_empty() {
        return false;
    }
    lower
        .split(|c: char| !c.is_alphanumeric() && c != '@')
        .filter(|t| !t.is_empty())
        .any(|token| token == name || token.strip_prefix('@') == Some(name.as_str()))
}

/// Select the responders for a group message.
///
/// Every roster member named in the message answers, in roster order, up
/// to `max_responders` (treated as at least one). When nobody is named the
/// first member answers alone, so repeated calls with the same inputs
/// always return the same selection.
#[must_use]
pub fn select_responders(
    group_id: GroupId,
    message: &str,
    members: &[GroupMember],
    max_responders: u32,
) -> ResponderSelection {
    if members.is_empty() {
        debug!(group = %group_id, "responder selection on empty roster");
        return ResponderSelection::NoMembers;
    }

    let cap = usize::try_from(max_responders.max(1)).unwrap_or(usize::MAX);
    let named: Vec<NpcId> = members
        .iter()
        .filter(|m| addresses_member(message, &m.name))
        .map(|m| m.npc_id)
        .take(cap)
        .collect();
    if !named.is_empty() {
        debug!(group = %group_id, responders = named.len(), "direct invocation");
        return ResponderSelection::DirectInvocation(named);
    }

    let first = &members[0];
    debug!(group = %group_id, npc = %first.npc_id, "default fallback responder");
    ResponderSelection::DefaultFallback(first.npc_id)
}
