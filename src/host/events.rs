use serde::{Deserialize, Serialize};

/// Input the renderer reports, already mapped from raw key codes and
/// pointer events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    QueryChanged { text: String },
    ActivateNext,
    ActivatePrevious,
    ConfirmActive,
    /// Backspace on an empty query.
    RemoveLast,
    SelectExplicit { value: String },
    ClearExplicit { value: String },
    FocusGained,
    FocusLost,
    FormReset,
    /// Escape.
    Dismiss,
}
