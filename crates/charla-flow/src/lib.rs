// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Menu-driven conversational flow engine.
//!
//! A tenant's bot is a [`Catalog`] (menu tree plus fixed prompts)
//! driven by a stage machine over per-conversation state. The engine
//! speaks through the [`charla_core::OutboundSender`] collaborator and
//! never touches persistence directly; the ingestion pipeline owns the
//! conversation record and persists the hand-off flag the engine
//! reports.

pub mod catalog;
pub mod engine;
pub mod normalize;
pub mod router;
pub mod state;
pub mod store;

pub use catalog::{Catalog, MenuAction, MenuNode, MenuOption, MAIN_MENU};
pub use engine::{step, MenuFlow, Reply, StepOutcome};
pub use router::{Flow, FlowContext, FlowReport, FlowRouter};
pub use state::{FlowState, Stage};
pub use store::FlowStateStore;
