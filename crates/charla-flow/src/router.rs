// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flow dispatch.
//!
//! Tenants carry a flow key; the router maps it to a registered flow
//! implementation. An unknown key is a configuration problem and is
//! reported, not silently dropped.

use std::sync::Arc;

use async_trait::async_trait;
use charla_core::{CharlaError, OutboundSender};
use dashmap::DashMap;

/// Everything a flow needs to process one inbound text.
#[derive(Debug)]
pub struct FlowContext<'a> {
    pub conversation_id: &'a str,
    /// Recipient phone number for outbound sends.
    pub to: &'a str,
    pub text: &'a str,
    /// Agent-requested-at is set and the conversation is still open.
    pub handoff_active: bool,
}

/// What a flow did with one input.
#[derive(Debug, Default)]
pub struct FlowReport {
    /// The caller must persist the agent-requested flag when set.
    pub request_agent: bool,
    /// Outbound sends that were delivered.
    pub sent: usize,
}

/// A conversational flow implementation.
#[async_trait]
pub trait Flow: Send + Sync {
    async fn handle(
        &self,
        ctx: &FlowContext<'_>,
        sender: &dyn OutboundSender,
    ) -> Result<FlowReport, CharlaError>;
}

impl std::fmt::Debug for dyn Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Flow")
    }
}

/// Registry of flow implementations keyed by the tenant's flow key.
#[derive(Default)]
pub struct FlowRouter {
    flows: DashMap<String, Arc<dyn Flow>>,
}

impl FlowRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, flow_key: impl Into<String>, flow: Arc<dyn Flow>) {
        self.flows.insert(flow_key.into(), flow);
    }

    pub fn get(&self, flow_key: &str) -> Result<Arc<dyn Flow>, CharlaError> {
        self.flows
            .get(flow_key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CharlaError::Config(format!("no flow registered for key {flow_key}")))
    }
}
