// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation flow state.

use charla_core::Language;

use crate::catalog::MenuId;

/// Node of the conversational state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Top-level menu. Doubles as the language-selection stage while
    /// [`FlowState::language`] is unset.
    MainMenu,
    /// Inside a category submenu of the catalog tree.
    CategoryMenu(MenuId),
    /// A catalog item was just rendered; awaiting back-navigation.
    ContentShown,
    /// "Anything else?" after a side-effecting action.
    FollowUpPrompt,
    /// Hand-off requested; the bot stays passive while it is active.
    AwaitingAgent,
    /// Financing sub-flow.
    Financing,
}

/// Ephemeral engine state for one conversation. Lives in the
/// process-wide store, not in the conversation row.
#[derive(Debug, Clone)]
pub struct FlowState {
    pub stage: Stage,
    pub language: Option<Language>,
    /// How many times the language prompt has been rendered. It is
    /// shown on entry and re-shown once on the first invalid input;
    /// after that, invalid input gets an explicit notice.
    pub language_prompt_shown: u8,
    /// Menu to return to from [`Stage::ContentShown`].
    pub return_menu: MenuId,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            stage: Stage::MainMenu,
            language: None,
            language_prompt_shown: 0,
            return_menu: crate::catalog::MAIN_MENU,
        }
    }
}
