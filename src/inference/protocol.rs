//! Translation between the local domain vocabulary and the wire protocol.
//!
//! The backend speaks numeric enums. Anything the backend sends that this
//! build does not recognize is kept as `Unrecognized(code)` rather than
//! failing deserialization, and every mapping below is total: an unknown
//! input always resolves to a documented default.
//!
//! | Direction                    | Unknown input →     |
//! |------------------------------|---------------------|
//! | think level → wire           | `Basic`             |
//! | wire → think level           | `Basic`             |
//! | tool group → wire            | `InformationTools`  |
//! | wire response type → message | `Text`              |

use serde::{Deserialize, Serialize};

// ─── Local Vocabulary ────────────────────────────────────────────────────────

/// How much reasoning and tool use the model should perform for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkLevel {
    Basic,
    Detailed,
    BasicWithTools,
    /// Autonomous multi-step mode. The wire has no richer level than
    /// `BasicWithTools`, so this value does not survive a round trip.
    Agent,
    /// Any value this build does not know (e.g. from a newer settings file).
    #[serde(other)]
    Unspecified,
}

/// Named bundle of capabilities granted to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolGroupSelection {
    Information,
    FileSystem,
    Shell,
    Web,
    #[serde(other)]
    Unspecified,
}

/// Kind of content carried by a response chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMessageType {
    Text,
    Thinking,
    ToolCall,
    ToolResult,
    Error,
}

// ─── Wire Vocabulary ─────────────────────────────────────────────────────────

/// Wire think level. Codes are fixed by the backend protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireThinkLevel {
    Basic,
    Detailed,
    BasicWithTools,
    Unrecognized(i32),
}

/// Wire tool group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireToolGroup {
    InformationTools,
    FileSystemTools,
    ShellTools,
    WebTools,
    Unrecognized(i32),
}

/// Wire response type attached to every streamed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireResponseType {
    Text,
    Reasoning,
    ToolCall,
    ToolResult,
    Error,
    Unrecognized(i32),
}

macro_rules! wire_codes {
    ($ty:ident { $($variant:ident = $code:expr),+ $(,)? }) => {
        impl From<i32> for $ty {
            fn from(code: i32) -> Self {
                match code {
                    $($code => $ty::$variant,)+
                    other => $ty::Unrecognized(other),
                }
            }
        }

        impl From<$ty> for i32 {
            fn from(value: $ty) -> i32 {
                match value {
                    $($ty::$variant => $code,)+
                    $ty::Unrecognized(code) => code,
                }
            }
        }

        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_i32(i32::from(*self))
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                i32::deserialize(deserializer).map($ty::from)
            }
        }
    };
}

wire_codes!(WireThinkLevel {
    Basic = 0,
    Detailed = 1,
    BasicWithTools = 2,
});

wire_codes!(WireToolGroup {
    InformationTools = 0,
    FileSystemTools = 1,
    ShellTools = 2,
    WebTools = 3,
});

wire_codes!(WireResponseType {
    Text = 0,
    Reasoning = 1,
    ToolCall = 2,
    ToolResult = 3,
    Error = 4,
});

// ─── Mappings ────────────────────────────────────────────────────────────────

/// Local think level → wire. `Agent` collapses onto `BasicWithTools`.
pub fn think_level_to_wire(level: ThinkLevel) -> WireThinkLevel {
    match level {
        ThinkLevel::Basic => WireThinkLevel::Basic,
        ThinkLevel::Detailed => WireThinkLevel::Detailed,
        ThinkLevel::BasicWithTools | ThinkLevel::Agent => WireThinkLevel::BasicWithTools,
        ThinkLevel::Unspecified => WireThinkLevel::Basic,
    }
}

/// Wire think level → local. Never yields `Agent`.
pub fn think_level_from_wire(level: WireThinkLevel) -> ThinkLevel {
    match level {
        WireThinkLevel::Basic => ThinkLevel::Basic,
        WireThinkLevel::Detailed => ThinkLevel::Detailed,
        WireThinkLevel::BasicWithTools => ThinkLevel::BasicWithTools,
        WireThinkLevel::Unrecognized(_) => ThinkLevel::Basic,
    }
}

/// Local tool group → wire.
pub fn tool_group_to_wire(group: ToolGroupSelection) -> WireToolGroup {
    match group {
        ToolGroupSelection::Information => WireToolGroup::InformationTools,
        ToolGroupSelection::FileSystem => WireToolGroup::FileSystemTools,
        ToolGroupSelection::Shell => WireToolGroup::ShellTools,
        ToolGroupSelection::Web => WireToolGroup::WebTools,
        ToolGroupSelection::Unspecified => WireToolGroup::InformationTools,
    }
}

/// Wire response type → local message type.
pub fn message_type_from_wire(response: WireResponseType) -> ChatMessageType {
    match response {
        WireResponseType::Text => ChatMessageType::Text,
        WireResponseType::Reasoning => ChatMessageType::Thinking,
        WireResponseType::ToolCall => ChatMessageType::ToolCall,
        WireResponseType::ToolResult => ChatMessageType::ToolResult,
        WireResponseType::Error => ChatMessageType::Error,
        WireResponseType::Unrecognized(_) => ChatMessageType::Text,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
