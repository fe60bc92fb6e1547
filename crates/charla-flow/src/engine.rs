// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The stage machine.
//!
//! `step` is pure over the catalog and one conversation's state: it
//! consumes normalized input and produces replies plus a hand-off
//! request flag. [`MenuFlow`] wraps it with the per-conversation state
//! store and actually delivers the replies through the outbound sender.
//!
//! Hand-off gating: while a hand-off is active the bot stays silent for
//! free text, but a digit that is valid for the current stage (or the
//! reset command) is an explicit override and still transitions.

use std::time::Duration;

use async_trait::async_trait;
use charla_core::{CharlaError, Language, OutboundSender};
use tracing::{debug, warn};

use crate::catalog::{Catalog, MenuAction, MenuId, MAIN_MENU};
use crate::normalize::{is_reset, normalize, parse_option};
use crate::router::{Flow, FlowContext, FlowReport};
use crate::state::{FlowState, Stage};
use crate::store::FlowStateStore;

/// One outbound message the engine wants delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Image {
        url: String,
        caption: String,
    },
    Document {
        url: String,
        filename: String,
        caption: String,
    },
    Location {
        latitude: f64,
        longitude: f64,
        name: String,
        address: String,
    },
}

/// Result of advancing the state machine one input.
#[derive(Debug, Default)]
pub struct StepOutcome {
    pub replies: Vec<Reply>,
    /// The caller must persist the agent-requested flag when set.
    pub request_agent: bool,
}

impl StepOutcome {
    fn texts(texts: Vec<String>) -> Self {
        Self {
            replies: texts.into_iter().map(Reply::Text).collect(),
            request_agent: false,
        }
    }

    fn silent() -> Self {
        Self::default()
    }
}

/// Advance one conversation's flow state with one inbound text.
pub fn step(
    catalog: &Catalog,
    state: &mut FlowState,
    raw: &str,
    handoff_active: bool,
) -> StepOutcome {
    let input = normalize(raw);

    if state.stage == Stage::AwaitingAgent {
        if handoff_active {
            return StepOutcome::silent();
        }
        // Hand-off was cleared without closing; the bot takes back over.
        state.stage = Stage::MainMenu;
        return render_entry(catalog, state);
    }

    let Some(language) = state.language else {
        return language_select(catalog, state, &input, handoff_active);
    };

    if is_reset(&input) {
        state.stage = Stage::MainMenu;
        return StepOutcome::texts(vec![catalog.render_menu(MAIN_MENU, language)]);
    }

    let max = stage_option_count(catalog, state.stage);
    let choice = parse_option(&input).filter(|n| (*n as usize) <= max);
    let Some(choice) = choice else {
        if handoff_active {
            return StepOutcome::silent();
        }
        return StepOutcome::texts(vec![
            catalog.invalid_option_notice(language, max),
            stage_prompt(catalog, state, language),
        ]);
    };

    match state.stage {
        Stage::MainMenu => menu_choice(catalog, state, MAIN_MENU, choice, language),
        Stage::CategoryMenu(id) => menu_choice(catalog, state, id, choice, language),
        Stage::ContentShown => {
            let target = if choice == 1 { state.return_menu } else { MAIN_MENU };
            state.stage = if target == MAIN_MENU {
                Stage::MainMenu
            } else {
                Stage::CategoryMenu(target)
            };
            StepOutcome::texts(vec![catalog.render_menu(target, language)])
        }
        Stage::FollowUpPrompt => {
            state.stage = Stage::MainMenu;
            if choice == 1 {
                StepOutcome::texts(vec![catalog.render_menu(MAIN_MENU, language)])
            } else {
                // Close out without prompting again.
                StepOutcome::texts(vec![catalog.texts.closing_message.get(language).to_string()])
            }
        }
        Stage::Financing => {
            if choice == 1 {
                request_agent(catalog, state, language)
            } else {
                state.stage = Stage::FollowUpPrompt;
                StepOutcome::texts(vec![catalog.texts.follow_up_prompt.get(language).to_string()])
            }
        }
        // Handled before choice parsing.
        Stage::AwaitingAgent => StepOutcome::silent(),
    }
}

fn language_select(
    catalog: &Catalog,
    state: &mut FlowState,
    input: &str,
    handoff_active: bool,
) -> StepOutcome {
    let selected = match parse_option(input) {
        Some(1) => Some(Language::Es),
        Some(2) => Some(Language::En),
        _ => None,
    };
    if let Some(language) = selected {
        state.language = Some(language);
        state.stage = Stage::MainMenu;
        return StepOutcome::texts(vec![catalog.render_menu(MAIN_MENU, language)]);
    }

    // The prompt is shown on entry and re-shown once on the first
    // invalid input; after that invalid input earns an explicit notice.
    let shown = state.language_prompt_shown;
    state.language_prompt_shown = shown.saturating_add(1);
    let prompt = catalog.texts.language_prompt.clone();
    if shown < 2 || handoff_active {
        StepOutcome::texts(vec![prompt])
    } else {
        let notice = format!(
            "{} / {}",
            catalog.invalid_option_notice(Language::Es, 2),
            catalog.invalid_option_notice(Language::En, 2),
        );
        StepOutcome::texts(vec![notice, prompt])
    }
}

fn menu_choice(
    catalog: &Catalog,
    state: &mut FlowState,
    menu_id: MenuId,
    choice: u8,
    language: Language,
) -> StepOutcome {
    let option = &catalog.menu(menu_id).options[choice as usize - 1];
    match &option.action {
        MenuAction::Submenu(child) => {
            state.stage = Stage::CategoryMenu(*child);
            StepOutcome::texts(vec![catalog.render_menu(*child, language)])
        }
        MenuAction::ShowItem(item) => {
            state.return_menu = menu_id;
            state.stage = Stage::ContentShown;
            StepOutcome {
                replies: vec![
                    Reply::Image {
                        url: item.image_url.clone(),
                        caption: item.caption.get(language).to_string(),
                    },
                    Reply::Text(catalog.texts.content_nav_prompt.get(language).to_string()),
                ],
                request_agent: false,
            }
        }
        MenuAction::SendLocation {
            latitude,
            longitude,
            name,
            address,
        } => {
            state.stage = Stage::FollowUpPrompt;
            StepOutcome {
                replies: vec![
                    Reply::Location {
                        latitude: *latitude,
                        longitude: *longitude,
                        name: name.clone(),
                        address: address.clone(),
                    },
                    Reply::Text(catalog.texts.follow_up_prompt.get(language).to_string()),
                ],
                request_agent: false,
            }
        }
        MenuAction::SendDocument {
            url,
            filename,
            caption,
        } => {
            state.stage = Stage::FollowUpPrompt;
            StepOutcome {
                replies: vec![
                    Reply::Document {
                        url: url.clone(),
                        filename: filename.clone(),
                        caption: caption.get(language).to_string(),
                    },
                    Reply::Text(catalog.texts.follow_up_prompt.get(language).to_string()),
                ],
                request_agent: false,
            }
        }
        MenuAction::Financing => {
            state.stage = Stage::Financing;
            StepOutcome::texts(vec![catalog.texts.financing_prompt.get(language).to_string()])
        }
        MenuAction::RequestAgent => request_agent(catalog, state, language),
    }
}

fn request_agent(catalog: &Catalog, state: &mut FlowState, language: Language) -> StepOutcome {
    state.stage = Stage::AwaitingAgent;
    StepOutcome {
        replies: vec![Reply::Text(
            catalog.texts.agent_confirmation.get(language).to_string(),
        )],
        request_agent: true,
    }
}

fn render_entry(catalog: &Catalog, state: &mut FlowState) -> StepOutcome {
    match state.language {
        Some(language) => StepOutcome::texts(vec![catalog.render_menu(MAIN_MENU, language)]),
        None => {
            state.language_prompt_shown = state.language_prompt_shown.saturating_add(1);
            StepOutcome::texts(vec![catalog.texts.language_prompt.clone()])
        }
    }
}

fn stage_option_count(catalog: &Catalog, stage: Stage) -> usize {
    match stage {
        Stage::MainMenu => catalog.menu(MAIN_MENU).options.len(),
        Stage::CategoryMenu(id) => catalog.menu(id).options.len(),
        Stage::ContentShown | Stage::FollowUpPrompt | Stage::Financing => 2,
        Stage::AwaitingAgent => 0,
    }
}

fn stage_prompt(catalog: &Catalog, state: &FlowState, language: Language) -> String {
    match state.stage {
        Stage::MainMenu => catalog.render_menu(MAIN_MENU, language),
        Stage::CategoryMenu(id) => catalog.render_menu(id, language),
        Stage::ContentShown => catalog.texts.content_nav_prompt.get(language).to_string(),
        Stage::FollowUpPrompt => catalog.texts.follow_up_prompt.get(language).to_string(),
        Stage::Financing => catalog.texts.financing_prompt.get(language).to_string(),
        Stage::AwaitingAgent => String::new(),
    }
}

/// The catalog-menu bot: one instance per tenant flow key.
pub struct MenuFlow {
    catalog: Catalog,
    states: FlowStateStore,
    /// Pause after rendering a catalog image, before the next send.
    content_delay: Duration,
}

impl MenuFlow {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            states: FlowStateStore::new(),
            content_delay: Duration::from_secs(2),
        }
    }

    pub fn with_content_delay(mut self, delay: Duration) -> Self {
        self.content_delay = delay;
        self
    }
}

#[async_trait]
impl Flow for MenuFlow {
    async fn handle(
        &self,
        ctx: &FlowContext<'_>,
        sender: &dyn OutboundSender,
    ) -> Result<FlowReport, CharlaError> {
        let cell = self.states.entry(ctx.conversation_id);
        // The lock is held across the sends so concurrent deliveries
        // for the same conversation serialize their read-modify-write.
        let mut state = cell.lock().await;
        let outcome = step(&self.catalog, &mut state, ctx.text, ctx.handoff_active);
        debug!(
            conversation_id = ctx.conversation_id,
            stage = ?state.stage,
            replies = outcome.replies.len(),
            "flow step"
        );

        let total = outcome.replies.len();
        let mut sent = 0;
        for (i, reply) in outcome.replies.into_iter().enumerate() {
            let is_image = matches!(reply, Reply::Image { .. });
            let result = match reply {
                Reply::Text(text) => sender.send_text(ctx.to, &text).await,
                Reply::Image { url, caption } => {
                    sender.send_image_url(ctx.to, &url, Some(&caption)).await
                }
                Reply::Document {
                    url,
                    filename,
                    caption,
                } => {
                    sender
                        .send_document_url(ctx.to, &url, Some(&caption), &filename)
                        .await
                }
                Reply::Location {
                    latitude,
                    longitude,
                    name,
                    address,
                } => {
                    sender
                        .send_location(ctx.to, latitude, longitude, &name, &address)
                        .await
                }
            };
            match result {
                Ok(_) => sent += 1,
                // Sends are not retried; a failed render is logged and
                // the remaining replies still go out.
                Err(e) => warn!(conversation_id = ctx.conversation_id, error = %e,
                                "outbound send failed"),
            }
            if is_image && i + 1 < total {
                tokio::time::sleep(self.content_delay).await;
            }
        }

        Ok(FlowReport {
            request_agent: outcome.request_agent,
            sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::motorcycle_dealership()
    }

    fn texts_of(outcome: &StepOutcome) -> Vec<&str> {
        outcome
            .replies
            .iter()
            .filter_map(|r| match r {
                Reply::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_contact_gets_the_language_prompt() {
        let catalog = catalog();
        let mut state = FlowState::default();
        let out = step(&catalog, &mut state, "hola", false);
        assert_eq!(out.replies.len(), 1);
        assert!(texts_of(&out)[0].contains("Elige tu idioma"));
        assert!(!out.request_agent);
    }

    #[test]
    fn language_prompt_reshow_then_notice() {
        let catalog = catalog();
        let mut state = FlowState::default();
        step(&catalog, &mut state, "hola", false);
        // First invalid after entry: silent re-show, no notice.
        let out = step(&catalog, &mut state, "buenas", false);
        assert_eq!(out.replies.len(), 1);
        // Second invalid: notice plus prompt.
        let out = step(&catalog, &mut state, "???", false);
        assert_eq!(out.replies.len(), 2);
        assert!(texts_of(&out)[0].contains("entre 1 y 2"));
    }

    #[test]
    fn selecting_spanish_renders_main_menu() {
        let catalog = catalog();
        let mut state = FlowState::default();
        step(&catalog, &mut state, "hola", false);
        let out = step(&catalog, &mut state, "1", false);
        assert_eq!(state.language, Some(Language::Es));
        assert_eq!(state.stage, Stage::MainMenu);
        let menu = texts_of(&out)[0];
        assert!(menu.contains("1. Ver modelos"));
        assert!(menu.contains("5. Hablar con un asesor"));
    }

    #[test]
    fn invalid_main_menu_option_is_bounded_one_to_five() {
        let catalog = catalog();
        let mut state = FlowState::default();
        step(&catalog, &mut state, "hola", false);
        step(&catalog, &mut state, "1", false);
        let out = step(&catalog, &mut state, "9", false);
        let texts = texts_of(&out);
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("entre 1 y 5"));
        assert!(texts[1].contains("1. Ver modelos"));
    }

    #[test]
    fn language_digits_stop_being_menu_options_once_chosen() {
        let catalog = catalog();
        let mut state = FlowState::default();
        step(&catalog, &mut state, "hola", false);
        step(&catalog, &mut state, "2", false);
        assert_eq!(state.language, Some(Language::En));
        // "2" now selects the store-location option, not a language.
        let out = step(&catalog, &mut state, "2", false);
        assert!(matches!(out.replies[0], Reply::Location { .. }));
        assert_eq!(state.stage, Stage::FollowUpPrompt);
    }

    fn spanish_at_main_menu() -> (Catalog, FlowState) {
        let catalog = catalog();
        let mut state = FlowState::default();
        step(&catalog, &mut state, "hola", false);
        step(&catalog, &mut state, "1", false);
        (catalog, state)
    }

    #[test]
    fn back_navigation_returns_to_the_originating_category() {
        let (catalog, mut state) = spanish_at_main_menu();
        step(&catalog, &mut state, "1", false); // models
        step(&catalog, &mut state, "1", false); // scooters
        let out = step(&catalog, &mut state, "2", false); // Urbano 150
        assert!(matches!(out.replies[0], Reply::Image { .. }));
        assert_eq!(state.stage, Stage::ContentShown);

        let out = step(&catalog, &mut state, "1", false); // back
        assert_eq!(state.stage, Stage::CategoryMenu(2));
        assert!(texts_of(&out)[0].contains("Dash 125"));
    }

    #[test]
    fn content_shown_option_two_goes_to_main_menu() {
        let (catalog, mut state) = spanish_at_main_menu();
        step(&catalog, &mut state, "1", false);
        step(&catalog, &mut state, "2", false); // street
        step(&catalog, &mut state, "1", false); // Roadster 250
        let out = step(&catalog, &mut state, "2", false);
        assert_eq!(state.stage, Stage::MainMenu);
        assert!(texts_of(&out)[0].contains("1. Ver modelos"));
    }

    #[test]
    fn price_list_sends_document_then_follow_up() {
        let (catalog, mut state) = spanish_at_main_menu();
        let out = step(&catalog, &mut state, "3", false);
        assert!(matches!(out.replies[0], Reply::Document { .. }));
        assert_eq!(state.stage, Stage::FollowUpPrompt);

        // "2": closing message, reset to main menu, no further prompt.
        let out = step(&catalog, &mut state, "2", false);
        assert_eq!(out.replies.len(), 1);
        assert!(texts_of(&out)[0].contains("Gracias"));
        assert_eq!(state.stage, Stage::MainMenu);
    }

    #[test]
    fn financing_option_one_requests_an_agent() {
        let (catalog, mut state) = spanish_at_main_menu();
        step(&catalog, &mut state, "4", false);
        assert_eq!(state.stage, Stage::Financing);
        let out = step(&catalog, &mut state, "1", false);
        assert!(out.request_agent);
        assert_eq!(state.stage, Stage::AwaitingAgent);
    }

    #[test]
    fn financing_option_two_proceeds_to_follow_up() {
        let (catalog, mut state) = spanish_at_main_menu();
        step(&catalog, &mut state, "4", false);
        let out = step(&catalog, &mut state, "2", false);
        assert_eq!(state.stage, Stage::FollowUpPrompt);
        assert!(texts_of(&out)[0].contains("algo más"));
    }

    #[test]
    fn reset_command_works_from_deep_stages_and_accents() {
        let (catalog, mut state) = spanish_at_main_menu();
        step(&catalog, &mut state, "1", false);
        step(&catalog, &mut state, "3", false); // adventure
        let out = step(&catalog, &mut state, " menú ", false);
        assert_eq!(state.stage, Stage::MainMenu);
        assert!(texts_of(&out)[0].contains("1. Ver modelos"));
    }

    #[test]
    fn handoff_silences_free_text_but_not_menu_digits() {
        let (catalog, mut state) = spanish_at_main_menu();
        let out = step(&catalog, &mut state, "gracias por todo", true);
        assert!(out.replies.is_empty());
        // An in-range digit is an explicit override.
        let out = step(&catalog, &mut state, "1", true);
        assert!(!out.replies.is_empty());
        assert_eq!(state.stage, Stage::CategoryMenu(1));
    }

    #[test]
    fn awaiting_agent_is_silent_while_handoff_is_active() {
        let (catalog, mut state) = spanish_at_main_menu();
        step(&catalog, &mut state, "5", false);
        assert_eq!(state.stage, Stage::AwaitingAgent);
        let out = step(&catalog, &mut state, "1", true);
        assert!(out.replies.is_empty());
        let out = step(&catalog, &mut state, "hola?", true);
        assert!(out.replies.is_empty());
    }

    #[test]
    fn cleared_handoff_returns_the_bot_to_main_menu() {
        let (catalog, mut state) = spanish_at_main_menu();
        step(&catalog, &mut state, "5", false);
        // Agent released without closing: hand-off no longer active.
        let out = step(&catalog, &mut state, "hola", false);
        assert_eq!(state.stage, Stage::MainMenu);
        assert!(texts_of(&out)[0].contains("1. Ver modelos"));
    }

    #[test]
    fn requesting_agent_from_main_menu_confirms_once() {
        let (catalog, mut state) = spanish_at_main_menu();
        let out = step(&catalog, &mut state, "5", false);
        assert!(out.request_agent);
        assert!(texts_of(&out)[0].contains("asesor"));
    }

    mod delivery {
        use super::*;
        use charla_test_utils::{RecordingSender, SentMessage};

        fn ctx<'a>(text: &'a str, handoff_active: bool) -> FlowContext<'a> {
            FlowContext {
                conversation_id: "conv-1",
                to: "5215550001111",
                text,
                handoff_active,
            }
        }

        #[tokio::test(start_paused = true)]
        async fn catalog_item_renders_image_then_nav_prompt() {
            let flow = MenuFlow::new(Catalog::motorcycle_dealership());
            let sender = RecordingSender::new();
            for input in ["hola", "1", "1", "1"] {
                flow.handle(&ctx(input, false), &sender).await.unwrap();
            }
            let report = flow.handle(&ctx("1", false), &sender).await.unwrap();
            assert_eq!(report.sent, 2);
            let sent = sender.sent();
            let n = sent.len();
            assert!(matches!(sent[n - 2], SentMessage::Image { .. }));
            assert!(matches!(sent[n - 1], SentMessage::Text { .. }));
        }

        #[tokio::test]
        async fn failed_send_does_not_stop_the_remaining_replies() {
            let flow = MenuFlow::new(Catalog::motorcycle_dealership());
            let sender = RecordingSender::failing_first(1);
            // First contact: single prompt, and it fails.
            let report = flow.handle(&ctx("hola", false), &sender).await.unwrap();
            assert_eq!(report.sent, 0);
            // Choosing Spanish still goes through afterwards.
            let report = flow.handle(&ctx("1", false), &sender).await.unwrap();
            assert_eq!(report.sent, 1);
            assert!(sender.texts()[0].contains("Ver modelos"));
        }

        #[tokio::test]
        async fn repeated_first_contact_does_not_reset_state() {
            let flow = MenuFlow::new(Catalog::motorcycle_dealership());
            let sender = RecordingSender::new();
            flow.handle(&ctx("hola", false), &sender).await.unwrap();
            flow.handle(&ctx("1", false), &sender).await.unwrap();
            // A duplicate greeting now hits the Spanish main menu as an
            // invalid option instead of restarting language selection.
            flow.handle(&ctx("hola", false), &sender).await.unwrap();
            let texts = sender.texts();
            assert!(texts[texts.len() - 2].contains("entre 1 y 5"));
        }
    }
}
