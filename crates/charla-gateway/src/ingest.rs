// SPDX-FileCopyrightText: 2026 Charla Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The inbound pipeline.
//!
//! One webhook delivery fans out to: tenant resolution by routing key,
//! contact upsert, ensure-open conversation, message persistence,
//! attachment materialization, auto-close re-arm, and flow dispatch.
//! Routing misses are logged and skipped; per-message failures are
//! logged and never escape to the HTTP layer (the provider always gets
//! a 200).

use std::sync::Arc;

use charla_core::{CharlaError, MediaFetcher, OutboundSender, Sender};
use charla_media::InboundMedia;
use charla_storage::database::now_rfc3339;
use charla_storage::models::{Integration, MessageRecord};
use charla_storage::queries::{contacts, conversations, messages};
use charla_storage::Database;
use charla_whatsapp::webhook::{ChangeValue, WaMessage, WebhookPayload};
use charla_flow::FlowContext;
use tracing::{debug, error, info};

use crate::server::AppState;

/// Builds per-tenant provider clients from the stored integration.
/// Injectable so tests run against recording doubles.
pub trait ClientFactory: Send + Sync {
    fn outbound(&self, integration: &Integration) -> Arc<dyn OutboundSender>;
    fn fetcher(&self, integration: &Integration) -> Arc<dyn MediaFetcher>;
}

/// Production factory: one Cloud API client per integration row.
pub struct CloudApiFactory;

impl ClientFactory for CloudApiFactory {
    fn outbound(&self, integration: &Integration) -> Arc<dyn OutboundSender> {
        Arc::new(charla_whatsapp::WhatsAppClient::new(
            integration.base_url.clone(),
            integration.api_version.clone(),
            integration.access_token.clone(),
            integration.phone_number_id.clone(),
        ))
    }

    fn fetcher(&self, integration: &Integration) -> Arc<dyn MediaFetcher> {
        Arc::new(charla_whatsapp::WhatsAppClient::new(
            integration.base_url.clone(),
            integration.api_version.clone(),
            integration.access_token.clone(),
            integration.phone_number_id.clone(),
        ))
    }
}

/// Tenant context resolved from the routing key; carried explicitly
/// through the rest of the pipeline.
pub struct TenantCtx {
    pub integration: Integration,
}

/// Process one webhook delivery. Errors here are already per-change
/// handled; this only fails on malformed top-level structure, which the
/// HTTP handler also swallows.
pub async fn process_delivery(state: &AppState, payload: WebhookPayload) {
    for entry in payload.entry {
        for change in entry.changes {
            process_change(state, change.value).await;
        }
    }
}

async fn process_change(state: &AppState, value: ChangeValue) {
    let Some(routing_key) = value
        .metadata
        .as_ref()
        .and_then(|m| m.phone_number_id.clone())
    else {
        debug!("change without routing metadata, skipped");
        return;
    };

    let integration = match resolve_tenant(&state.db, &routing_key).await {
        Ok(Some(integration)) => integration,
        Ok(None) => {
            // Routing miss: expected noise, never surfaced to the provider.
            debug!(routing_key, "no active integration for routing key");
            return;
        }
        Err(e) => {
            error!(routing_key, error = %e, "tenant resolution failed");
            return;
        }
    };

    if value.messages.is_empty() {
        // Status-only payload (delivery receipts).
        return;
    }

    let tenant = TenantCtx { integration };
    let profile_name = value
        .contacts
        .first()
        .and_then(|c| c.profile.as_ref())
        .and_then(|p| p.name.as_deref())
        .map(String::from);

    for message in value.messages {
        if let Err(e) = process_message(state, &tenant, profile_name.as_deref(), &message).await {
            error!(
                tenant_id = tenant.integration.tenant_id,
                error = %e,
                "inbound message processing failed"
            );
        }
    }
}

async fn resolve_tenant(
    db: &Database,
    routing_key: &str,
) -> Result<Option<Integration>, CharlaError> {
    charla_storage::queries::integrations::find_active_by_routing_key(db, routing_key).await
}

async fn process_message(
    state: &AppState,
    tenant: &TenantCtx,
    profile_name: Option<&str>,
    message: &WaMessage,
) -> Result<(), CharlaError> {
    let integration = &tenant.integration;
    let Some(from) = message.from.as_deref() else {
        debug!("message without sender, skipped");
        return Ok(());
    };

    let contact =
        contacts::upsert_inbound(&state.db, &integration.tenant_id, from, profile_name).await?;
    let conversation =
        conversations::ensure_open_for_incoming(&state.db, &integration.tenant_id, &contact.id)
            .await?;
    let handoff_active = conversation.handoff_active();

    let record = build_record(tenant, &contact.id, &conversation.id, message);
    match messages::insert_message(&state.db, &record).await {
        Ok(()) => {}
        // Provider re-delivery of an already-stored message id: the
        // conversation is already correct, do not advance the flow twice.
        Err(e) if is_duplicate(&e) => {
            debug!(message_id = record.id, "duplicate delivery ignored");
            return Ok(());
        }
        Err(e) => return Err(e),
    }
    conversations::touch(&state.db, &conversation.id).await?;

    if let Some(media) = message.media() {
        if let Some(media_id) = media.id.as_deref() {
            let fetcher = state.clients.fetcher(integration);
            let inbound = InboundMedia {
                media_id: media_id.to_string(),
                mime_type: media
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                filename: media.filename.clone(),
            };
            // Best-effort: materialize_inbound itself degrades to a
            // remote-reference row on fetch failure.
            if let Err(e) =
                charla_media::materialize_inbound(&state.db, fetcher.as_ref(), &record.id, &inbound)
                    .await
            {
                error!(message_id = record.id, error = %e, "attachment persist failed");
            }
        }
    }

    let sender = state.clients.outbound(integration);
    state
        .autoclose
        .arm(state.db.clone(), &conversation.id, from, sender.clone());

    let Some(text) = message.text_body() else {
        return Ok(());
    };
    let flow = state.flows.get(&integration.flow_key)?;
    let ctx = FlowContext {
        conversation_id: &conversation.id,
        to: from,
        text,
        handoff_active,
    };
    let report = flow.handle(&ctx, sender.as_ref()).await?;

    if report.request_agent {
        match conversations::mark_agent_requested(&state.db, &conversation.id).await {
            Ok(()) => info!(conversation_id = conversation.id, "hand-off requested"),
            // Already requested, or closed in between: nothing to do.
            Err(e) if e.is_conflict() => {
                debug!(conversation_id = conversation.id, "hand-off already pending")
            }
            Err(e) => return Err(e),
        }
    }
    if !contact.welcome_sent && report.sent > 0 {
        contacts::mark_welcome_sent(&state.db, &contact.id).await?;
    }
    Ok(())
}

fn build_record(
    tenant: &TenantCtx,
    contact_id: &str,
    conversation_id: &str,
    message: &WaMessage,
) -> MessageRecord {
    let location = message.location.as_ref();
    MessageRecord {
        id: message
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        tenant_id: tenant.integration.tenant_id.clone(),
        conversation_id: conversation_id.to_string(),
        contact_id: contact_id.to_string(),
        sender: Sender::Contact,
        kind: message.kind.clone().unwrap_or_else(|| "text".to_string()),
        body: message.text_body().map(String::from),
        sent_at: message
            .sent_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(now_rfc3339),
        latitude: location.map(|l| l.latitude),
        longitude: location.map(|l| l.longitude),
        location_name: location.and_then(|l| l.name.clone()),
        location_address: location.and_then(|l| l.address.clone()),
        created_at: now_rfc3339(),
    }
}

fn is_duplicate(e: &CharlaError) -> bool {
    matches!(e, CharlaError::Storage { source } if source.to_string().contains("UNIQUE constraint"))
}
